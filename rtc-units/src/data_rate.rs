use serde::{Deserialize, Serialize};

use crate::{DataSize, TimeDelta};
use crate::unit_base::{from_i128, to_f64};

/// A data rate in bits per second.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRate(i64);

unit_base!(DataRate, "bps");
relative_unit!(DataRate);

impl DataRate {
    pub const fn from_bps(bps: i64) -> Self {
        Self(bps)
    }

    pub const fn from_kbps(kbps: i64) -> Self {
        Self(kbps.saturating_mul(1_000))
    }

    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Kilobits per second, truncated. Infinities are returned unchanged.
    pub fn kbps(&self) -> i64 {
        if self.is_infinite() {
            return self.0;
        }
        self.0 / 1_000
    }

    pub fn kbps_f64(&self) -> f64 {
        to_f64(self.0) / 1_000.0
    }
}

impl std::ops::Mul<TimeDelta> for DataRate {
    type Output = DataSize;

    /// Data moved at `self` during `duration`, rounded to the nearest byte.
    fn mul(self, duration: TimeDelta) -> DataSize {
        if self.is_zero() || duration.is_zero() {
            return DataSize::zero();
        }
        if self.is_infinite() || duration.is_infinite() {
            return if (self.0 > 0) == (duration.us() > 0) {
                DataSize::plus_infinity()
            } else {
                DataSize::minus_infinity()
            };
        }
        let bits_us = self.0 as i128 * duration.us() as i128;
        let half = if bits_us >= 0 { 4_000_000 } else { -4_000_000 };
        DataSize::from_bytes(from_i128((bits_us + half) / 8_000_000))
    }
}

impl std::ops::Mul<DataRate> for TimeDelta {
    type Output = DataSize;

    fn mul(self, rate: DataRate) -> DataSize {
        rate * self
    }
}
