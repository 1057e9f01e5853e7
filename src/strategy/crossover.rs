use crate::data::Signal;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Default number of difference samples retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Bounded FIFO of fast-minus-slow EMA differences, oldest first
#[derive(Debug, Clone)]
pub struct DifferenceHistory {
    samples: VecDeque<Decimal>,
    capacity: usize,
}

impl DifferenceHistory {
    /// A capacity of zero is raised to one so the latest sample is always kept
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Decimal) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<Decimal> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decimal> {
        self.samples.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    NoHistory,
    HasHistory(Decimal),
}

/// EMA crossover classifier.
///
/// Emits `Sell` when the difference goes from strictly positive to strictly
/// negative, `Buy` for the reverse. Zero belongs to neither side, so a move
/// onto or off zero never fires.
#[derive(Debug, Clone)]
pub struct CrossoverDetector {
    state: DetectorState,
    history: DifferenceHistory,
}

impl CrossoverDetector {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            state: DetectorState::NoHistory,
            history: DifferenceHistory::new(history_capacity),
        }
    }

    /// Classify a new difference against the previous one, then record it
    pub fn observe(&mut self, difference: Decimal) -> Signal {
        let signal = match self.state {
            DetectorState::NoHistory => Signal::None,
            DetectorState::HasHistory(last) => {
                if last > Decimal::ZERO && difference < Decimal::ZERO {
                    Signal::Sell
                } else if last < Decimal::ZERO && difference > Decimal::ZERO {
                    Signal::Buy
                } else {
                    Signal::None
                }
            }
        };

        self.state = DetectorState::HasHistory(difference);
        self.history.push(difference);

        signal
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn history(&self) -> &DifferenceHistory {
        &self.history
    }

    /// Forget all samples
    pub fn reset(&mut self) {
        self.state = DetectorState::NoHistory;
        self.history = DifferenceHistory::new(self.history.capacity());
    }
}

impl Default for CrossoverDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
