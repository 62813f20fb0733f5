use serde::{Deserialize, Serialize};

use crate::TimeDelta;
use crate::unit_base::{from_f64, to_f64};

/// A point in time with microsecond resolution, relative to an arbitrary
/// epoch chosen by the clock that produced it.
///
/// [`Timestamp::minus_infinity`] is conventionally used for "never happened",
/// so that `now - last_event` is `+inf` until the event first occurs.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

unit_base!(Timestamp, "us");

impl Timestamp {
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000))
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds.saturating_mul(1_000_000))
    }

    pub const fn us(&self) -> i64 {
        self.0
    }

    pub fn ms(&self) -> i64 {
        if self.is_infinite() {
            return self.0;
        }
        from_f64(self.0 as f64 / 1_000.0)
    }

    pub fn seconds_f64(&self) -> f64 {
        to_f64(self.0) / 1_000_000.0
    }
}

impl std::ops::Add<TimeDelta> for Timestamp {
    type Output = Timestamp;

    fn add(self, delta: TimeDelta) -> Timestamp {
        Timestamp(crate::unit_base::add(self.0, delta.us()))
    }
}

impl std::ops::AddAssign<TimeDelta> for Timestamp {
    fn add_assign(&mut self, delta: TimeDelta) {
        *self = *self + delta;
    }
}

impl std::ops::Sub<TimeDelta> for Timestamp {
    type Output = Timestamp;

    fn sub(self, delta: TimeDelta) -> Timestamp {
        Timestamp(crate::unit_base::sub(self.0, delta.us()))
    }
}

impl std::ops::SubAssign<TimeDelta> for Timestamp {
    fn sub_assign(&mut self, delta: TimeDelta) {
        *self = *self - delta;
    }
}

impl std::ops::Sub for Timestamp {
    type Output = TimeDelta;

    fn sub(self, other: Timestamp) -> TimeDelta {
        TimeDelta::from_micros(crate::unit_base::sub(self.0, other.0))
    }
}
