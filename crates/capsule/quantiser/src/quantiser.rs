use crate::error::QuantiserError;
use crate::process::QuantiserProcess;
use tracing::warn;

/// Quanta per network cost unit.
pub const DEFAULT_QUANTA_PER_UNIT: u64 = 200;

/// Quanta accumulator with an optional hard limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Quantiser {
    limit: Option<u64>,
    sum: u64,
}

impl Quantiser {
    /// `limit < 0` means unlimited.
    pub fn new(limit: i64) -> Self {
        let mut q = Self::default();
        q.reset(limit);
        q
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Clear the accumulator and install a new limit (`< 0` is unlimited).
    pub fn reset(&mut self, limit: i64) {
        self.limit = u64::try_from(limit).ok();
        self.sum = 0;
    }

    /// Charge one priced operation.
    pub fn add_work_cost(&mut self, process: QuantiserProcess) -> Result<(), QuantiserError> {
        self.charge(process.cost())
    }

    /// Fold a finished child's consumption into this accumulator.
    pub fn add_work_cost_from(&mut self, child: &Quantiser) -> Result<(), QuantiserError> {
        self.charge(child.sum)
    }

    /// A fresh accumulator limited to what this one has left.
    pub fn child(&self) -> Quantiser {
        Quantiser {
            limit: self.remaining(),
            sum: 0,
        }
    }

    pub fn quanta_sum(&self) -> u64 {
        self.sum
    }

    pub fn quanta_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Limit in the signed form accepted by [`Quantiser::reset`].
    pub fn raw_limit(&self) -> i64 {
        self.limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }

    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|l| l.saturating_sub(self.sum))
    }

    /// `floor(sum / quanta_per_unit) + 1`.
    pub fn cost_in_units(&self, quanta_per_unit: u64) -> u64 {
        self.sum / quanta_per_unit.max(1) + 1
    }

    fn charge(&mut self, cost: u64) -> Result<(), QuantiserError> {
        self.sum = self.sum.saturating_add(cost);
        match self.limit {
            Some(limit) if self.sum > limit => {
                warn!(limit, sum = self.sum, "quantiser limit exceeded");
                Err(QuantiserError::LimitExceeded {
                    limit,
                    sum: self.sum,
                })
            }
            _ => Ok(()),
        }
    }
}
