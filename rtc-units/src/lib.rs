#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Strongly typed time, size and rate units used by the congestion
//! controller and the packet history.
//!
//! All units wrap an `i64` and reserve `i64::MAX`/`i64::MIN` for plus and
//! minus infinity. Arithmetic saturates at the infinities, and mixed-unit
//! operators produce the natural result type:
//!
//! ```
//! use rtc_units::{DataRate, DataSize, TimeDelta};
//!
//! let window = DataSize::from_bytes(10_000);
//! let rtt = TimeDelta::from_millis(100);
//! assert_eq!(window / rtt, DataRate::from_kbps(800));
//! assert_eq!(DataRate::from_kbps(800) * rtt, window);
//! ```

#[macro_use]
mod unit_base;

mod data_rate;
mod data_size;
mod time_delta;
mod timestamp;

pub use data_rate::DataRate;
pub use data_size::DataSize;
pub use time_delta::TimeDelta;
pub use timestamp::Timestamp;
