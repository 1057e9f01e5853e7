pub mod types;
pub mod rest;
pub mod auth;

pub use types::*;
pub use rest::{BinanceRestClient, Endpoints};
pub use auth::{Credentials, ParamOrder, QueryParams};
