use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::unit_base::{from_f64, to_f64};

/// A signed duration with microsecond resolution.
///
/// `TimeDelta` is the difference between two [`Timestamp`](crate::Timestamp)s
/// and the unit used for RTTs, queue delays and intervals throughout the
/// congestion controller. The infinities act as "unset" markers.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeDelta(i64);

unit_base!(TimeDelta, "us");
relative_unit!(TimeDelta);

impl TimeDelta {
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000))
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds.saturating_mul(1_000_000))
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes.saturating_mul(60))
    }

    pub fn from_seconds_f64(seconds: f64) -> Self {
        Self(from_f64(seconds * 1_000_000.0))
    }

    pub fn from_millis_f64(ms: f64) -> Self {
        Self(from_f64(ms * 1_000.0))
    }

    pub const fn us(&self) -> i64 {
        self.0
    }

    /// Milliseconds, rounded to nearest. Infinities are returned unchanged.
    pub fn ms(&self) -> i64 {
        if self.is_infinite() {
            return self.0;
        }
        from_f64(self.0 as f64 / 1_000.0)
    }

    pub fn ms_f64(&self) -> f64 {
        to_f64(self.0) / 1_000.0
    }

    pub fn seconds_f64(&self) -> f64 {
        to_f64(self.0) / 1_000_000.0
    }

    pub fn abs(&self) -> Self {
        if self.0 < 0 { -*self } else { *self }
    }
}

impl std::ops::Neg for TimeDelta {
    type Output = TimeDelta;

    fn neg(self) -> TimeDelta {
        if self.is_plus_infinity() {
            TimeDelta::minus_infinity()
        } else if self.is_minus_infinity() {
            TimeDelta::plus_infinity()
        } else {
            TimeDelta(-self.0)
        }
    }
}

impl From<Duration> for TimeDelta {
    fn from(duration: Duration) -> Self {
        let us = duration.as_micros();
        if us >= i64::MAX as u128 {
            TimeDelta::plus_infinity()
        } else {
            TimeDelta(us as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_delta_conversions() {
        assert_eq!(TimeDelta::from_millis(25).us(), 25_000);
        assert_eq!(TimeDelta::from_seconds(2).ms(), 2_000);
        assert_eq!(TimeDelta::from_minutes(1), TimeDelta::from_seconds(60));
        assert_eq!(TimeDelta::from_micros(1_499).ms(), 1);
        assert_eq!(TimeDelta::from_micros(1_500).ms(), 2);
        assert_eq!(TimeDelta::from_seconds_f64(0.25), TimeDelta::from_millis(250));
        assert_eq!(
            TimeDelta::from(Duration::from_millis(40)),
            TimeDelta::from_millis(40)
        );
    }

    #[test]
    fn test_time_delta_ratio_and_scale() {
        let rtt = TimeDelta::from_millis(50);
        let virtual_rtt = TimeDelta::from_millis(25);
        assert_eq!(rtt / virtual_rtt, 2.0);
        assert_eq!(rtt * 0.5, virtual_rtt);
        assert_eq!(0.5 * rtt, virtual_rtt);
        assert_eq!(rtt * 3, TimeDelta::from_millis(150));
        assert_eq!(rtt / 2, virtual_rtt);
    }

    #[test]
    fn test_time_delta_infinity() {
        let inf = TimeDelta::plus_infinity();
        assert!(inf.is_plus_infinity());
        assert!(!inf.is_finite());
        assert_eq!(inf + TimeDelta::from_millis(1), inf);
        assert_eq!(-inf, TimeDelta::minus_infinity());
        assert!(TimeDelta::from_millis(1) < inf);
        assert!(TimeDelta::minus_infinity() < TimeDelta::zero());
        assert_eq!(inf.ms(), i64::MAX);
    }

    #[test]
    fn test_time_delta_clamp() {
        let rtt = TimeDelta::zero();
        assert_eq!(rtt.max(TimeDelta::from_millis(1)), TimeDelta::from_millis(1));
        assert_eq!(
            TimeDelta::from_millis(-3).abs(),
            TimeDelta::from_millis(3)
        );
    }

    #[test]
    fn test_time_delta_display() {
        assert_eq!(TimeDelta::from_millis(25).to_string(), "25000 us");
        assert_eq!(TimeDelta::plus_infinity().to_string(), "+inf us");
    }
}
