pub mod types;
pub mod feed;

pub use types::{Candle, OrderType, Side, Signal, TimeInForce};
pub use feed::MarketDataFeed;
