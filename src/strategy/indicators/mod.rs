pub mod ema;

pub use ema::{compute_ema, Ema};
