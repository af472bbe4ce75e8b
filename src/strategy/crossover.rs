use crate::error::BotError;
use crate::indicators::calculate_sma;
use crate::models::Signal;
use crate::Result;
use rust_decimal::Decimal;
use serde::Serialize;

/// Fast and slow averages for the previous and the current bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAverages {
    pub fast_prev: Decimal,
    pub slow_prev: Decimal,
    pub fast_curr: Decimal,
    pub slow_curr: Decimal,
}

impl MovingAverages {
    pub fn trend(&self) -> Trend {
        if self.fast_curr > self.fast_prev {
            Trend::Rising
        } else {
            Trend::Falling
        }
    }
}

/// Direction of the fast average between the previous and the current bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Rising,
    Falling,
}

/// Which rule produced a non-hold signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trigger {
    /// Fast above slow on the first evaluation after start-up
    FirstRun,
    GoldenCross,
    DeathCross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossover {
    pub averages: MovingAverages,
    pub signal: Signal,
    pub trigger: Option<Trigger>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Not enough closes for both previous and current slow averages
    InsufficientData { have: usize, need: usize },
    Ready(Crossover),
}

/// Moving-average crossover strategy
///
/// Buys when the fast average crosses above the slow one (golden cross) and
/// sells on the opposite move (death cross). On the first evaluation after
/// start-up there is no previous state to cross from, so fast above slow is
/// taken as a buy on its own. That rule excludes the crossover checks for
/// the same bar, so one evaluation never yields two buys.
#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    fast_period: usize,
    slow_period: usize,
}

impl CrossoverStrategy {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self> {
        if fast_period == 0 || fast_period >= slow_period {
            return Err(BotError::InvalidConfig(format!(
                "fast period ({}) must be positive and below slow period ({})",
                fast_period, slow_period
            )));
        }

        Ok(Self {
            fast_period,
            slow_period,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    /// Closes needed before the strategy can evaluate
    pub fn min_candles_required(&self) -> usize {
        self.slow_period + 1
    }

    /// Compute the previous and current averages, if history allows
    pub fn averages(&self, closes: &[Decimal]) -> Option<MovingAverages> {
        if closes.len() < self.min_candles_required() {
            return None;
        }

        let prev = &closes[..closes.len() - 1];
        Some(MovingAverages {
            fast_prev: calculate_sma(prev, self.fast_period)?,
            slow_prev: calculate_sma(prev, self.slow_period)?,
            fast_curr: calculate_sma(closes, self.fast_period)?,
            slow_curr: calculate_sma(closes, self.slow_period)?,
        })
    }

    /// Classify the latest bar
    pub fn evaluate(&self, closes: &[Decimal], first_run: bool) -> Evaluation {
        let Some(averages) = self.averages(closes) else {
            return Evaluation::InsufficientData {
                have: closes.len(),
                need: self.min_candles_required(),
            };
        };

        let (signal, trigger) = classify(&averages, first_run);
        Evaluation::Ready(Crossover {
            averages,
            signal,
            trigger,
        })
    }
}

fn classify(ma: &MovingAverages, first_run: bool) -> (Signal, Option<Trigger>) {
    if first_run && ma.fast_curr > ma.slow_curr {
        return (Signal::Buy, Some(Trigger::FirstRun));
    }

    if ma.fast_prev < ma.slow_prev && ma.fast_curr > ma.slow_curr {
        (Signal::Buy, Some(Trigger::GoldenCross))
    } else if ma.fast_prev > ma.slow_prev && ma.fast_curr < ma.slow_curr {
        (Signal::Sell, Some(Trigger::DeathCross))
    } else {
        (Signal::Hold, None)
    }
}
