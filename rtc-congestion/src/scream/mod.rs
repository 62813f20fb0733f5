//! SCREAMv2 congestion control.
//!
//! - [`ScreamV2`]: the reference window and target rate state machine.
//! - [`DelayBasedCongestionControl`]: queue delay detection, used when the
//!   path does not mark packets with ECN-CE.
//! - [`ScreamNetworkController`]: adapts [`ScreamV2`] to the
//!   [`NetworkController`](crate::NetworkController) interface.
//!
//! # Example
//!
//! ```
//! use rtc_congestion::scream::ScreamV2;
//! use rtc_congestion::{Environment, EcnMarking, PacketResult, SentPacket, TransportPacketsFeedback};
//! use units::{DataSize, TimeDelta, Timestamp};
//!
//! let mut scream = ScreamV2::new(Environment::default());
//! let now = Timestamp::from_seconds(10);
//! let rtt = TimeDelta::from_millis(40);
//! let feedback = TransportPacketsFeedback {
//!     feedback_time: now,
//!     smoothed_rtt: rtt,
//!     data_in_flight: DataSize::from_bytes(5_000),
//!     packet_feedbacks: vec![PacketResult {
//!         sent_packet: SentPacket {
//!             send_time: now - rtt,
//!             size: DataSize::from_bytes(1_000),
//!             ..Default::default()
//!         },
//!         receive_time: now - rtt / 2,
//!         ecn: EcnMarking::Ect1,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//! let target_rate = scream.on_transport_packets_feedback(&feedback);
//! assert!(target_rate > units::DataRate::zero());
//! ```

mod delay_based;
mod network_controller;
mod parameters;
mod scream_v2;

pub use delay_based::DelayBasedCongestionControl;
pub use network_controller::ScreamNetworkController;
pub use parameters::ScreamV2Parameters;
pub use scream_v2::ScreamV2;
