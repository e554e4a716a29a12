//! EMA crossover signal — golden cross and death cross detection.
//!
//! Emits Buy when the fast EMA crosses above the slow EMA and Sell when it
//! crosses below. Equality counts on the "before" side only, so a tie
//! followed by separation is a crossover and two consecutive ties are not.

use crate::domain::Bar;
use crate::indicators::{Ema, Indicator};
use crate::params::ParamError;

use super::{CrossDirection, CrossoverEvent, Crossovers, SignalFrame};

/// Fast/slow EMA crossover signal generator.
#[derive(Debug, Clone)]
pub struct EmaCrossover {
    fast: Ema,
    slow: Ema,
}

impl EmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, ParamError> {
        if fast_period == 0 {
            return Err(ParamError::ZeroFastPeriod(fast_period));
        }
        if slow_period <= fast_period {
            return Err(ParamError::FastNotBelowSlow {
                fast: fast_period,
                slow: slow_period,
            });
        }
        Ok(Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }

    /// Bars before this index are treated as having no trend.
    pub fn warmup_bars(&self) -> usize {
        self.slow.period()
    }

    pub fn name(&self) -> String {
        format!("{}_x_{}", self.fast.name(), self.slow.name())
    }

    /// Compute both averages and the warm-up-suppressed trend flag.
    pub fn generate_signals(&self, bars: &[Bar]) -> SignalFrame {
        let fast = self.fast.compute(bars);
        let slow = self.slow.compute(bars);
        let warmup_bars = self.warmup_bars();

        let trend_up: Vec<bool> = fast
            .iter()
            .zip(&slow)
            .enumerate()
            .map(|(i, (f, s))| i >= warmup_bars && f > s)
            .collect();

        let position_change = std::iter::once(0)
            .chain(trend_up.windows(2).map(|w| w[1] as i8 - w[0] as i8))
            .take(trend_up.len())
            .collect();

        SignalFrame {
            fast_period: self.fast_period(),
            slow_period: self.slow_period(),
            fast,
            slow,
            trend_up,
            position_change,
            warmup_bars,
        }
    }
}

/// Compute fast/slow EMAs over `bars` and their trend flags.
pub fn generate_signals(
    bars: &[Bar],
    fast_period: usize,
    slow_period: usize,
) -> Result<SignalFrame, ParamError> {
    Ok(EmaCrossover::new(fast_period, slow_period)?.generate_signals(bars))
}

/// Scan every consecutive pair of bars for crossovers on the raw averages.
///
/// Not gated by warm-up suppression. Events before the boundary are kept
/// and tagged `during_warmup`.
pub fn identify_crossovers(frame: &SignalFrame) -> Crossovers {
    let n = frame.len().min(frame.slow.len());
    let mut events = Vec::new();

    for i in 1..n {
        let (fast_prev, slow_prev) = (frame.fast[i - 1], frame.slow[i - 1]);
        let (fast_cur, slow_cur) = (frame.fast[i], frame.slow[i]);

        let direction = if fast_prev <= slow_prev && fast_cur > slow_cur {
            Some(CrossDirection::Buy)
        } else if fast_prev >= slow_prev && fast_cur < slow_cur {
            Some(CrossDirection::Sell)
        } else {
            None
        };

        if let Some(direction) = direction {
            events.push(CrossoverEvent {
                index: i,
                direction,
                during_warmup: !frame.is_warm(i),
            });
        }
    }

    Crossovers::new(events, n)
}
