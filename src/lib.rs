pub mod data;
pub mod error;
pub mod exchange;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use data::{Candle, MarketDataFeed, OrderType, Side, Signal, TimeInForce};
pub use error::{BotError, BracketLeg, Result};
pub use exchange::{BinanceRestClient, Credentials, Endpoints, ReqwestTransport, Transport};
pub use strategy::{
    compute_ema, BracketReport, CrossoverDetector, ExecutionStatus, LoopSettings, OrderExecutor,
    PollingLoop,
};
pub use utils::Config;
