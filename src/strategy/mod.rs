pub mod indicators;
pub mod crossover;
pub mod execution;
pub mod polling;

pub use indicators::{compute_ema, Ema};
pub use crossover::{CrossoverDetector, DetectorState, DifferenceHistory};
pub use execution::{
    bracket_prices, BracketPrices, BracketReport, ExecutionStatus, LegOutcome, OrderExecutor,
};
pub use polling::{CycleReport, EmaPair, LoopSettings, LoopStats, PollingLoop, Sleeper, TokioSleeper};
