use crate::data::{MarketDataFeed, Signal};
use crate::error::Result;
use crate::strategy::crossover::CrossoverDetector;
use crate::strategy::execution::{BracketReport, ExecutionStatus, OrderExecutor};
use crate::strategy::indicators::compute_ema;
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Sleep abstraction so the cadence can be driven from tests
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// What a cycle trades and how often
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub symbol: String,
    pub interval: String,
    pub fast_period: usize,
    pub slow_period: usize,
    pub candle_limit: usize,
    pub quantity: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub poll_interval: Duration,
}

/// Fast and slow EMA from one candle read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaPair {
    pub fast: Decimal,
    pub slow: Decimal,
}

impl EmaPair {
    pub fn difference(&self) -> Decimal {
        self.fast - self.slow
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub emas: EmaPair,
    pub signal: Signal,
    /// Present only when the signal was tradeable
    pub execution: Option<Result<BracketReport>>,
}

/// Counters over the lifetime of `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub signals: u64,
    /// Brackets where one or two legs were accepted
    pub partial_executions: u64,
    /// Brackets where every leg was rejected
    pub failed_executions: u64,
}

/// Fetch → EMA → detect → maybe trade → sleep, strictly sequential.
pub struct PollingLoop<S: Sleeper = TokioSleeper> {
    feed: Arc<MarketDataFeed>,
    executor: OrderExecutor,
    detector: CrossoverDetector,
    settings: LoopSettings,
    sleeper: S,
    stats: LoopStats,
}

impl PollingLoop<TokioSleeper> {
    pub fn new(
        feed: Arc<MarketDataFeed>,
        executor: OrderExecutor,
        detector: CrossoverDetector,
        settings: LoopSettings,
    ) -> Self {
        Self::with_sleeper(feed, executor, detector, settings, TokioSleeper)
    }
}

impl<S: Sleeper> PollingLoop<S> {
    pub fn with_sleeper(
        feed: Arc<MarketDataFeed>,
        executor: OrderExecutor,
        detector: CrossoverDetector,
        settings: LoopSettings,
        sleeper: S,
    ) -> Self {
        Self {
            feed,
            executor,
            detector,
            settings,
            sleeper,
            stats: LoopStats::default(),
        }
    }

    pub fn detector(&self) -> &CrossoverDetector {
        &self.detector
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Read candles and compute both EMAs. Touches no state, so dropping
    /// this future mid-fetch leaves the detector as it was.
    pub async fn read_emas(&self) -> Result<EmaPair> {
        let closes = self
            .feed
            .fetch_closes(&self.settings.symbol, &self.settings.interval, self.settings.candle_limit)
            .await?;

        let fast = compute_ema(&closes, self.settings.fast_period)?;
        let slow = compute_ema(&closes, self.settings.slow_period)?;

        Ok(EmaPair { fast, slow })
    }

    /// Record the difference and trade on a crossover
    pub async fn apply(&mut self, emas: EmaPair) -> CycleReport {
        let signal = self.detector.observe(emas.difference());

        info!(
            symbol = %self.settings.symbol,
            fast_ema = %emas.fast,
            slow_ema = %emas.slow,
            difference = %emas.difference(),
            ?signal,
            "EMA cycle evaluated"
        );

        let execution = match signal.side() {
            Some(side) => {
                self.stats.signals += 1;
                info!(%side, "EMA crossover detected");

                let result = self
                    .executor
                    .place_entry_with_bracket(
                        &self.settings.symbol,
                        side,
                        self.settings.quantity,
                        self.settings.take_profit_pct,
                        self.settings.stop_loss_pct,
                    )
                    .await;

                match result.as_ref().map(BracketReport::status) {
                    Ok(ExecutionStatus::Complete) => {}
                    Ok(ExecutionStatus::Partial) => self.stats.partial_executions += 1,
                    Ok(ExecutionStatus::Failed) => self.stats.failed_executions += 1,
                    Err(e) => error!(error = %e, "Bracket not placed"),
                }

                Some(result)
            }
            None => None,
        };

        CycleReport {
            emas,
            signal,
            execution,
        }
    }

    /// One full cycle without the trailing sleep
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let emas = self.read_emas().await?;
        Ok(self.apply(emas).await)
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Cancellation is honoured while reading candles and while sleeping.
    /// Once a difference has been recorded the cycle, including any order
    /// placement, runs to completion.
    pub async fn run(&mut self, shutdown: CancellationToken) -> LoopStats {
        info!(
            symbol = %self.settings.symbol,
            interval = %self.settings.interval,
            fast = self.settings.fast_period,
            slow = self.settings.slow_period,
            poll_secs = self.settings.poll_interval.as_secs(),
            "Polling loop started"
        );

        while !shutdown.is_cancelled() {
            let read = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested mid-cycle; cycle abandoned");
                    break;
                }
                read = self.read_emas() => read,
            };

            self.stats.cycles += 1;

            match read {
                Ok(emas) => {
                    self.apply(emas).await;
                }
                Err(e) => {
                    self.stats.failed_cycles += 1;
                    if e.is_retryable() {
                        warn!(error = %e, "Cycle failed; retrying after sleep");
                    } else {
                        error!(error = %e, "Cycle skipped");
                    }
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.sleeper.sleep(self.settings.poll_interval) => {}
            }
        }

        info!(
            cycles = self.stats.cycles,
            failed = self.stats.failed_cycles,
            signals = self.stats.signals,
            "Polling loop stopped"
        );

        self.stats
    }
}
