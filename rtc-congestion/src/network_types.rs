//! Messages exchanged between a network controller and the transport.
//!
//! Inputs describe what happened on the network (packets sent, feedback
//! received, route changes, constraint changes). Outputs are bundled in a
//! [`NetworkControlUpdate`]. Timestamps that have not been set default to
//! `plus_infinity()`, rates and sizes that are unknown default to infinity
//! or zero depending on which one is the safe choice for the consumer.

use serde::{Deserialize, Serialize};
use units::{DataRate, DataSize, TimeDelta, Timestamp};

/// ECN codepoint carried in the IP header, as reported back by the receiver.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcnMarking {
    /// Not ECN-capable transport.
    #[default]
    NotEct,
    /// ECN-capable transport, L4S codepoint.
    Ect1,
    /// ECN-capable transport, classic codepoint.
    Ect0,
    /// Congestion experienced.
    Ce,
}

/// Rate limits for the whole transport, usually set by the application.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TargetRateConstraints {
    pub at_time: Timestamp,
    pub min_data_rate: Option<DataRate>,
    pub max_data_rate: Option<DataRate>,
    /// Initial estimate used before any feedback has been received.
    pub starting_rate: Option<DataRate>,
}

impl Default for TargetRateConstraints {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            min_data_rate: None,
            max_data_rate: None,
            starting_rate: None,
        }
    }
}

/// Information about the currently configured media streams.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StreamsConfig {
    pub at_time: Timestamp,
    pub requests_alr_probing: Option<bool>,
    pub enable_repeated_initial_probing: Option<bool>,
    pub pacing_factor: Option<f64>,
    pub min_total_allocated_bitrate: Option<DataRate>,
    pub max_padding_rate: Option<DataRate>,
    pub max_total_allocated_bitrate: Option<DataRate>,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            requests_alr_probing: None,
            enable_repeated_initial_probing: None,
            pacing_factor: None,
            min_total_allocated_bitrate: None,
            max_padding_rate: None,
            max_total_allocated_bitrate: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NetworkAvailability {
    pub at_time: Timestamp,
    pub network_available: bool,
}

impl Default for NetworkAvailability {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            network_available: false,
        }
    }
}

/// The transport switched to a new network path. Constraints are carried
/// along so they can change atomically with the route.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NetworkRouteChange {
    pub at_time: Timestamp,
    pub constraints: TargetRateConstraints,
}

impl Default for NetworkRouteChange {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            constraints: TargetRateConstraints::default(),
        }
    }
}

/// Pacer metadata attached to a sent packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacedPacketInfo {
    pub send_bitrate: DataRate,
    pub probe_cluster_id: i32,
    pub probe_cluster_min_probes: i32,
    pub probe_cluster_min_bytes: i32,
    pub probe_cluster_bytes_sent: i32,
}

impl PacedPacketInfo {
    pub const NOT_A_PROBE: i32 = -1;

    pub fn new(
        probe_cluster_id: i32,
        probe_cluster_min_probes: i32,
        probe_cluster_min_bytes: i32,
    ) -> Self {
        Self {
            probe_cluster_id,
            probe_cluster_min_probes,
            probe_cluster_min_bytes,
            ..Default::default()
        }
    }

    pub fn is_probe(&self) -> bool {
        self.probe_cluster_id != Self::NOT_A_PROBE
    }
}

impl Default for PacedPacketInfo {
    fn default() -> Self {
        Self {
            send_bitrate: DataRate::zero(),
            probe_cluster_id: Self::NOT_A_PROBE,
            probe_cluster_min_probes: -1,
            probe_cluster_min_bytes: -1,
            probe_cluster_bytes_sent: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SentPacket {
    pub send_time: Timestamp,
    /// Size including overhead up to the IP layer.
    pub size: DataSize,
    /// Size of preceding packets that are not part of feedback.
    pub prior_unacked_data: DataSize,
    pub pacing_info: PacedPacketInfo,
    /// True for audio, false for video, padding, RTX etc.
    pub audio: bool,
    /// Transport-wide sequence number, unique over the whole call and
    /// increasing by one per packet.
    pub sequence_number: i64,
    /// Tracked data in flight when the packet was sent, excluding unacked data.
    pub data_in_flight: DataSize,
}

impl Default for SentPacket {
    fn default() -> Self {
        Self {
            send_time: Timestamp::plus_infinity(),
            size: DataSize::zero(),
            prior_unacked_data: DataSize::zero(),
            pacing_info: PacedPacketInfo::default(),
            audio: false,
            sequence_number: 0,
            data_in_flight: DataSize::zero(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReceivedPacket {
    pub send_time: Timestamp,
    pub receive_time: Timestamp,
    pub size: DataSize,
}

impl Default for ReceivedPacket {
    fn default() -> Self {
        Self {
            send_time: Timestamp::minus_infinity(),
            receive_time: Timestamp::plus_infinity(),
            size: DataSize::zero(),
        }
    }
}

/// Receiver estimated maximum bitrate (REMB).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RemoteBitrateReport {
    pub receive_time: Timestamp,
    pub bandwidth: DataRate,
}

impl Default for RemoteBitrateReport {
    fn default() -> Self {
        Self {
            receive_time: Timestamp::plus_infinity(),
            bandwidth: DataRate::plus_infinity(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RoundTripTimeUpdate {
    pub receive_time: Timestamp,
    pub round_trip_time: TimeDelta,
    pub smoothed: bool,
}

impl Default for RoundTripTimeUpdate {
    fn default() -> Self {
        Self {
            receive_time: Timestamp::plus_infinity(),
            round_trip_time: TimeDelta::plus_infinity(),
            smoothed: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransportLossReport {
    pub receive_time: Timestamp,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub packets_lost_delta: u64,
    pub packets_received_delta: u64,
}

impl Default for TransportLossReport {
    fn default() -> Self {
        Self {
            receive_time: Timestamp::plus_infinity(),
            start_time: Timestamp::plus_infinity(),
            end_time: Timestamp::plus_infinity(),
            packets_lost_delta: 0,
            packets_received_delta: 0,
        }
    }
}

/// RTP level identity of a packet that transport feedback refers to.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RtpPacketInfo {
    pub ssrc: u32,
    pub rtp_sequence_number: u16,
    pub is_retransmission: bool,
}

/// Feedback for a single sent packet.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PacketResult {
    pub sent_packet: SentPacket,
    /// `plus_infinity()` if the packet was reported lost.
    pub receive_time: Timestamp,
    pub ecn: EcnMarking,
    /// Only set if the feedback refers to an RTP packet.
    pub rtp_packet_info: Option<RtpPacketInfo>,
}

impl Default for PacketResult {
    fn default() -> Self {
        Self {
            sent_packet: SentPacket::default(),
            receive_time: Timestamp::plus_infinity(),
            ecn: EcnMarking::NotEct,
            rtp_packet_info: None,
        }
    }
}

impl PacketResult {
    pub fn is_received(&self) -> bool {
        !self.receive_time.is_plus_infinity()
    }

    /// Ordering by receive time, then send time, then sequence number.
    pub fn receive_time_order(lhs: &PacketResult, rhs: &PacketResult) -> std::cmp::Ordering {
        lhs.receive_time
            .cmp(&rhs.receive_time)
            .then(lhs.sent_packet.send_time.cmp(&rhs.sent_packet.send_time))
            .then(
                lhs.sent_packet
                    .sequence_number
                    .cmp(&rhs.sent_packet.sequence_number),
            )
    }
}

/// One round of transport-wide feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportPacketsFeedback {
    pub feedback_time: Timestamp,
    pub smoothed_rtt: TimeDelta,
    pub data_in_flight: DataSize,
    pub transport_supports_ecn: bool,
    pub packet_feedbacks: Vec<PacketResult>,
    /// Arrival times for packets without send time information.
    pub sendless_arrival_times: Vec<Timestamp>,
}

impl Default for TransportPacketsFeedback {
    fn default() -> Self {
        Self {
            feedback_time: Timestamp::plus_infinity(),
            smoothed_rtt: TimeDelta::zero(),
            data_in_flight: DataSize::zero(),
            transport_supports_ecn: false,
            packet_feedbacks: vec![],
            sendless_arrival_times: vec![],
        }
    }
}

impl TransportPacketsFeedback {
    pub fn received_with_send_info(&self) -> Vec<PacketResult> {
        self.packet_feedbacks
            .iter()
            .filter(|p| p.is_received())
            .copied()
            .collect()
    }

    pub fn lost_with_send_info(&self) -> Vec<PacketResult> {
        self.packet_feedbacks
            .iter()
            .filter(|p| !p.is_received())
            .copied()
            .collect()
    }

    /// Received and lost packets, i.e. every packet this report has a
    /// verdict for.
    pub fn packets_with_feedback(&self) -> &[PacketResult] {
        &self.packet_feedbacks
    }

    /// Received packets in the order they arrived at the receiver.
    pub fn sorted_by_receive_time(&self) -> Vec<PacketResult> {
        let mut packets = self.received_with_send_info();
        packets.sort_by(PacketResult::receive_time_order);
        packets
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NetworkEstimate {
    pub at_time: Timestamp,
    pub bandwidth: DataRate,
    pub round_trip_time: TimeDelta,
    pub bwe_period: TimeDelta,
    pub loss_rate_ratio: f32,
}

impl Default for NetworkEstimate {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            bandwidth: DataRate::plus_infinity(),
            round_trip_time: TimeDelta::plus_infinity(),
            bwe_period: TimeDelta::plus_infinity(),
            loss_rate_ratio: 0.0,
        }
    }
}

/// Pacer budget: send at most `data_window` and at least `pad_window` over
/// each `time_window`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PacerConfig {
    pub at_time: Timestamp,
    pub data_window: DataSize,
    pub time_window: TimeDelta,
    pub pad_window: DataSize,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            data_window: DataSize::plus_infinity(),
            time_window: TimeDelta::plus_infinity(),
            pad_window: DataSize::zero(),
        }
    }
}

impl PacerConfig {
    pub const DEFAULT_TIME_INTERVAL: TimeDelta = TimeDelta::from_seconds(1);

    pub fn create(at_time: Timestamp, data_rate: DataRate, pad_rate: DataRate) -> Self {
        Self::create_with_time_window(at_time, data_rate, pad_rate, Self::DEFAULT_TIME_INTERVAL)
    }

    /// A shorter `time_window` limits how large a burst the pacer may send.
    pub fn create_with_time_window(
        at_time: Timestamp,
        data_rate: DataRate,
        pad_rate: DataRate,
        time_window: TimeDelta,
    ) -> Self {
        Self {
            at_time,
            data_window: data_rate * time_window,
            time_window,
            pad_window: pad_rate * time_window,
        }
    }

    pub fn data_rate(&self) -> DataRate {
        self.data_window / self.time_window
    }

    pub fn pad_rate(&self) -> DataRate {
        self.pad_window / self.time_window
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProbeClusterConfig {
    pub at_time: Timestamp,
    pub target_data_rate: DataRate,
    pub target_duration: TimeDelta,
    pub min_probe_delta: TimeDelta,
    pub target_probe_count: i32,
    pub id: i32,
}

impl Default for ProbeClusterConfig {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            target_data_rate: DataRate::zero(),
            target_duration: TimeDelta::zero(),
            min_probe_delta: TimeDelta::from_millis(2),
            target_probe_count: 0,
            id: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TargetTransferRate {
    pub at_time: Timestamp,
    /// The estimate the target rate is based on.
    pub network_estimate: NetworkEstimate,
    pub target_rate: DataRate,
    pub cwnd_reduce_ratio: f64,
}

impl Default for TargetTransferRate {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            network_estimate: NetworkEstimate::default(),
            target_rate: DataRate::zero(),
            cwnd_reduce_ratio: 0.0,
        }
    }
}

/// Output of a network controller. Fields left as `None` (or empty) were not
/// changed by the call that produced the update.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct NetworkControlUpdate {
    pub congestion_window: Option<DataSize>,
    pub pacer_config: Option<PacerConfig>,
    pub probe_cluster_configs: Vec<ProbeClusterConfig>,
    pub target_rate: Option<TargetTransferRate>,
}

impl NetworkControlUpdate {
    pub fn has_updates(&self) -> bool {
        self.congestion_window.is_some()
            || self.pacer_config.is_some()
            || !self.probe_cluster_configs.is_empty()
            || self.target_rate.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProcessInterval {
    pub at_time: Timestamp,
    pub pacer_queue: Option<DataSize>,
}

impl Default for ProcessInterval {
    fn default() -> Self {
        Self {
            at_time: Timestamp::plus_infinity(),
            pacer_queue: None,
        }
    }
}

/// Link state reported by a remote estimator. Under development upstream,
/// carried here only so controllers can accept it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NetworkStateEstimate {
    pub confidence: f64,
    pub update_time: Timestamp,
    pub last_receive_time: Timestamp,
    pub last_send_time: Timestamp,
    pub link_capacity: DataRate,
    pub link_capacity_lower: DataRate,
    pub link_capacity_upper: DataRate,
    pub propagation_delay: TimeDelta,
}

impl Default for NetworkStateEstimate {
    fn default() -> Self {
        Self {
            confidence: f64::NAN,
            update_time: Timestamp::minus_infinity(),
            last_receive_time: Timestamp::minus_infinity(),
            last_send_time: Timestamp::minus_infinity(),
            link_capacity: DataRate::minus_infinity(),
            link_capacity_lower: DataRate::minus_infinity(),
            link_capacity_upper: DataRate::minus_infinity(),
            propagation_delay: TimeDelta::minus_infinity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(seq: i64, send_ms: i64, receive_ms: Option<i64>) -> PacketResult {
        PacketResult {
            sent_packet: SentPacket {
                send_time: Timestamp::from_millis(send_ms),
                size: DataSize::from_bytes(1000),
                sequence_number: seq,
                ..Default::default()
            },
            receive_time: receive_ms.map_or(Timestamp::plus_infinity(), Timestamp::from_millis),
            ..Default::default()
        }
    }

    #[test]
    fn test_packet_result_defaults_to_lost() {
        let result = PacketResult::default();
        assert!(!result.is_received());
        assert_eq!(result.ecn, EcnMarking::NotEct);
    }

    #[test]
    fn test_feedback_views() {
        let feedback = TransportPacketsFeedback {
            feedback_time: Timestamp::from_millis(100),
            packet_feedbacks: vec![
                packet(1, 10, Some(40)),
                packet(2, 11, None),
                packet(3, 12, Some(35)),
                packet(4, 13, Some(35)),
            ],
            ..Default::default()
        };

        assert_eq!(feedback.received_with_send_info().len(), 3);
        let lost = feedback.lost_with_send_info();
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].sent_packet.sequence_number, 2);
        assert_eq!(feedback.packets_with_feedback().len(), 4);

        let sorted: Vec<i64> = feedback
            .sorted_by_receive_time()
            .iter()
            .map(|p| p.sent_packet.sequence_number)
            .collect();
        assert_eq!(sorted, vec![3, 4, 1]);
    }

    #[test]
    fn test_pacer_config_create() {
        let config = PacerConfig::create(
            Timestamp::from_seconds(1),
            DataRate::from_kbps(450),
            DataRate::zero(),
        );
        assert_eq!(config.time_window, PacerConfig::DEFAULT_TIME_INTERVAL);
        assert_eq!(config.data_window, DataSize::from_bytes(56_250));
        assert_eq!(config.data_rate(), DataRate::from_kbps(450));
        assert_eq!(config.pad_rate(), DataRate::zero());
    }

    #[test]
    fn test_pacer_config_short_time_window_keeps_rates() {
        let config = PacerConfig::create_with_time_window(
            Timestamp::from_seconds(1),
            DataRate::from_kbps(450),
            DataRate::from_kbps(300),
            TimeDelta::from_millis(40),
        );
        assert_eq!(config.time_window, TimeDelta::from_millis(40));
        assert_eq!(config.data_window, DataSize::from_bytes(2_250));
        assert_eq!(config.pad_window, DataSize::from_bytes(1_500));
        assert_eq!(config.data_rate(), DataRate::from_kbps(450));
        assert_eq!(config.pad_rate(), DataRate::from_kbps(300));
    }

    #[test]
    fn test_network_control_update_has_updates() {
        let mut update = NetworkControlUpdate::default();
        assert!(!update.has_updates());
        update.congestion_window = Some(DataSize::from_bytes(3000));
        assert!(update.has_updates());
    }
}
