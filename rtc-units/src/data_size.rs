use serde::{Deserialize, Serialize};

use crate::{DataRate, TimeDelta};
use crate::unit_base::{from_i128, to_f64};

/// An amount of data in bytes.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSize(i64);

unit_base!(DataSize, "bytes");
relative_unit!(DataSize);

impl DataSize {
    pub const fn from_bytes(bytes: i64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> i64 {
        self.0
    }

    pub fn bytes_f64(&self) -> f64 {
        to_f64(self.0)
    }
}

impl std::ops::Div<TimeDelta> for DataSize {
    type Output = DataRate;

    /// Average rate needed to move `self` in `duration`. Truncates toward zero.
    fn div(self, duration: TimeDelta) -> DataRate {
        if self.is_infinite() || duration.is_zero() {
            return if (self.0 >= 0) == (duration.us() >= 0) {
                DataRate::plus_infinity()
            } else {
                DataRate::minus_infinity()
            };
        }
        if duration.is_infinite() {
            return DataRate::zero();
        }
        DataRate::from_bps(from_i128(
            self.0 as i128 * 8_000_000 / duration.us() as i128,
        ))
    }
}

impl std::ops::Div<DataRate> for DataSize {
    type Output = TimeDelta;

    /// Time needed to move `self` at `rate`.
    fn div(self, rate: DataRate) -> TimeDelta {
        if self.is_infinite() || rate.is_zero() {
            return if (self.0 >= 0) == (rate.bps() >= 0) {
                TimeDelta::plus_infinity()
            } else {
                TimeDelta::minus_infinity()
            };
        }
        if rate.is_infinite() {
            return TimeDelta::zero();
        }
        TimeDelta::from_micros(from_i128(self.0 as i128 * 8_000_000 / rate.bps() as i128))
    }
}
