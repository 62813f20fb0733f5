#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! RTC Congestion Control - Sans-IO sender side congestion control.
//!
//! This crate turns transport feedback (per packet arrival times, losses
//! and ECN marks) into a target send rate and a pacer configuration.
//!
//! # Components
//!
//! | Item | Description |
//! |------|-------------|
//! | [`scream::ScreamV2`] | SCREAMv2 reference window and target rate state machine |
//! | [`scream::DelayBasedCongestionControl`] | Queue delay detector used for "virtual CE" |
//! | [`scream::ScreamNetworkController`] | [`NetworkController`] built on SCREAMv2, also a [`sansio::Protocol`] |
//! | [`FieldTrials`] | Parser for `Name/Value/` configuration strings |
//! | [`RtcEventLog`] | Sink for diagnostic [`RtcEvent`]s |
//!
//! # Time
//!
//! Nothing in this crate reads a clock. Every input carries its own
//! [`Timestamp`](units::Timestamp), so a controller is fully determined by the
//! sequence of messages it was given.
//!
//! # Quick Start
//!
//! ```
//! use rtc_congestion::scream::ScreamNetworkController;
//! use rtc_congestion::{NetworkAvailability, NetworkController, NetworkControllerConfig};
//! use units::{DataRate, Timestamp};
//!
//! let mut config = NetworkControllerConfig::default();
//! config.constraints.starting_rate = Some(DataRate::from_kbps(500));
//! let mut controller = ScreamNetworkController::new(config);
//!
//! let update = controller.on_network_availability(NetworkAvailability {
//!     at_time: Timestamp::from_seconds(1),
//!     network_available: true,
//! });
//! assert_eq!(
//!     update.target_rate.map(|t| t.target_rate),
//!     Some(DataRate::from_kbps(500))
//! );
//! ```

pub(crate) mod environment;
pub(crate) mod error;
pub(crate) mod event_log;
pub(crate) mod field_trial;
pub(crate) mod network_control;
pub(crate) mod network_types;
pub mod scream;
pub(crate) mod windowed_min_filter;

pub use environment::Environment;
pub use error::{Error, Result};
pub use event_log::{BweUpdateScream, MemoryEventLog, NullEventLog, RtcEvent, RtcEventLog};
pub use field_trial::{FieldTrialValue, FieldTrials, FieldTrialsView};
pub use network_control::{NetworkController, NetworkControllerConfig, NetworkEvent};
pub use network_types::*;
