pub mod binance;
pub mod transport;

pub use binance::{BinanceRestClient, Credentials, Endpoints};
pub use transport::{Method, ReqwestTransport, Transport, VenueRequest, VenueResponse};
