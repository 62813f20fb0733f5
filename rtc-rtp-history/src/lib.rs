#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! RTC RTP Packet History - Sans-IO store of sent RTP packets.
//!
//! A sender keeps recently sent packets so that NACKed packets can be
//! retransmitted without asking the encoder again, and so that the pacer has
//! real payload to send when it needs padding.
//!
//! # Components
//!
//! | Item | Description |
//! |------|-------------|
//! | [`RtpPacketToSend`] | Outgoing packet with sender side metadata, RTX encapsulation |
//! | [`RtpPacketHistory`] | Bounded, RTT aware packet store keyed by sequence number |
//! | [`sequence`] | Wraparound aware sequence number comparison |
//!
//! # Quick Start
//!
//! ```
//! use rtc_rtp_history::{PaddingMode, RtpPacketHistory, RtpPacketToSend, StorageMode};
//! use units::{TimeDelta, Timestamp};
//!
//! let mut history = RtpPacketHistory::new(PaddingMode::Default);
//! history.set_store_packets_status(StorageMode::StoreAndCull, 100);
//!
//! let now = Timestamp::from_seconds(10);
//! history.put_rtp_packet(
//!     RtpPacketToSend {
//!         ssrc: 1234,
//!         sequence_number: 65535,
//!         payload: vec![0u8; 1000].into(),
//!         allow_retransmission: true,
//!         ..Default::default()
//!     },
//!     now,
//! );
//!
//! // A NACK arrives, resend on the RTX stream.
//! let rtx = history
//!     .get_packet_and_mark_as_pending_with(65535, now + TimeDelta::from_millis(40), |packet| {
//!         Some(packet.to_rtx(5678, 97, 1))
//!     })
//!     .unwrap();
//! assert_eq!(rtx.original_ssrc, Some(1234));
//! history.mark_packet_as_sent(65535, now + TimeDelta::from_millis(45));
//!
//! // The receiver got it after all.
//! history.cull_acknowledged_packets(&[65535]);
//! assert!(!history.get_packet_state(65535));
//! ```

pub(crate) mod packet_history;
pub(crate) mod packet_to_send;
pub mod sequence;

pub use packet_history::{PaddingMode, RtpPacketHistory, StorageMode};
pub use packet_to_send::{RTP_HEADER_SIZE, RTX_HEADER_SIZE, RtpPacketMediaType, RtpPacketToSend};
