use crate::error::{BotError, Result};
use rust_decimal::Decimal;

/// Exponential Moving Average, fed one price at a time.
///
/// The first `period` prices seed the average with their arithmetic mean;
/// every later price folds in as `price * k + prev * (1 - k)` with
/// `k = 2 / (period + 1)`. No value is available until the seed is complete.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: Decimal,
    seed_sum: Decimal,
    count: usize,
    value: Option<Decimal>,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(BotError::Data("EMA period must be positive".into()));
        }

        Ok(Self {
            period,
            k: Decimal::TWO / Decimal::from(period + 1),
            seed_sum: Decimal::ZERO,
            count: 0,
            value: None,
        })
    }

    /// Feed one price, return the current EMA once seeded
    pub fn update(&mut self, price: Decimal) -> Option<Decimal> {
        match self.value {
            Some(prev) => {
                self.value = Some(price * self.k + prev * (Decimal::ONE - self.k));
            }
            None => {
                self.seed_sum += price;
                self.count += 1;
                if self.count == self.period {
                    self.value = Some(self.seed_sum / Decimal::from(self.period));
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

/// EMA of a full price window, oldest first.
///
/// Fewer than `period` prices is a data error rather than a degenerate
/// value, so a short fetch can never produce a signal.
pub fn compute_ema(prices: &[Decimal], period: usize) -> Result<Decimal> {
    if prices.len() < period {
        return Err(BotError::Data(format!(
            "EMA({}) needs at least {} prices, got {}",
            period,
            period,
            prices.len()
        )));
    }

    let mut ema = Ema::new(period)?;
    for price in prices {
        ema.update(*price);
    }

    ema.value()
        .ok_or_else(|| BotError::Data(format!("EMA({}) did not seed", period)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exactly_period_prices_returns_mean() {
        let prices = vec![dec!(100), dec!(102), dec!(104), dec!(106), dec!(108)];
        assert_eq!(compute_ema(&prices, 5).unwrap(), dec!(104));
    }

    #[test]
    fn test_fold_after_seed() {
        // k = 0.5, seed = mean(10, 11, 12) = 11, then 13 * 0.5 + 11 * 0.5
        let prices = vec![dec!(10), dec!(11), dec!(12), dec!(13)];
        assert_eq!(compute_ema(&prices, 3).unwrap(), dec!(12));
    }

    #[test]
    fn test_period_one_tracks_last_price() {
        let prices = vec![dec!(5), dec!(7), dec!(3)];
        assert_eq!(compute_ema(&prices, 1).unwrap(), dec!(3));
    }

    #[test]
    fn test_insufficient_data() {
        let prices = vec![dec!(100), dec!(102)];
        assert!(matches!(compute_ema(&prices, 5), Err(BotError::Data(_))));
        assert!(matches!(compute_ema(&[], 1), Err(BotError::Data(_))));
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(matches!(compute_ema(&[dec!(1)], 0), Err(BotError::Data(_))));
        assert!(Ema::new(0).is_err());
    }

    #[test]
    fn test_rising_prices_pull_ema_above_seed() {
        let prices = vec![dec!(100), dec!(102), dec!(104), dec!(106), dec!(108), dec!(110)];
        let ema = compute_ema(&prices, 5).unwrap();
        assert!(ema > dec!(104));
        assert!(ema < dec!(110));
    }

    #[test]
    fn test_incremental_matches_window() {
        let prices: Vec<Decimal> = (1..=30).map(|i| Decimal::from(i * 3 % 17)).collect();

        let mut ema = Ema::new(10).unwrap();
        for (i, price) in prices.iter().enumerate() {
            let streamed = ema.update(*price);
            if i + 1 < 10 {
                assert!(streamed.is_none());
            } else {
                assert_eq!(streamed.unwrap(), compute_ema(&prices[..=i], 10).unwrap());
            }
        }
    }

    fn price() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn prop_seed_window_equals_mean(prices in prop::collection::vec(price(), 1..60)) {
            let period = prices.len();
            let mean = prices.iter().copied().sum::<Decimal>() / Decimal::from(period);
            prop_assert_eq!(compute_ema(&prices, period).unwrap(), mean);
        }

        #[test]
        fn prop_deterministic(prices in prop::collection::vec(price(), 1..120), period in 1usize..60) {
            prop_assume!(prices.len() >= period);
            let first = compute_ema(&prices, period).unwrap();
            let second = compute_ema(&prices, period).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_bounded_by_window(prices in prop::collection::vec(price(), 1..120), period in 1usize..60) {
            prop_assume!(prices.len() >= period);
            let ema = compute_ema(&prices, period).unwrap();
            let lo = prices.iter().min().copied().unwrap();
            let hi = prices.iter().max().copied().unwrap();
            // Rounding in the last digit can leave the envelope by a hair
            let eps = Decimal::new(1, 20);
            prop_assert!(ema >= lo - eps && ema <= hi + eps);
        }
    }
}
