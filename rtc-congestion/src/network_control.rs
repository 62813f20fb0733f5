//! The interface between a congestion controller and the transport.

use units::TimeDelta;

use crate::environment::Environment;
use crate::network_types::*;

/// Configuration handed to a controller when it is created.
#[derive(Debug, Clone, Default)]
pub struct NetworkControllerConfig {
    pub env: Environment,
    /// Initial constraints. The starting rate is used until the first
    /// feedback is received.
    pub constraints: TargetRateConstraints,
    /// Initial stream configuration.
    pub stream_based_config: StreamsConfig,
}

impl NetworkControllerConfig {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            ..Default::default()
        }
    }
}

/// A network controller consumes network events and produces pacing and
/// target rate updates.
///
/// Every method returns the part of the configuration that changed. An
/// update without any fields set means "keep what you have".
pub trait NetworkController {
    fn on_network_availability(&mut self, msg: NetworkAvailability) -> NetworkControlUpdate;
    fn on_network_route_change(&mut self, msg: NetworkRouteChange) -> NetworkControlUpdate;
    /// Called periodically with the period given by
    /// [`process_interval`](NetworkController::process_interval).
    fn on_process_interval(&mut self, msg: ProcessInterval) -> NetworkControlUpdate;
    fn on_remote_bitrate_report(&mut self, msg: RemoteBitrateReport) -> NetworkControlUpdate;
    fn on_round_trip_time_update(&mut self, msg: RoundTripTimeUpdate) -> NetworkControlUpdate;
    fn on_sent_packet(&mut self, msg: SentPacket) -> NetworkControlUpdate;
    fn on_received_packet(&mut self, msg: ReceivedPacket) -> NetworkControlUpdate;
    fn on_streams_config(&mut self, msg: StreamsConfig) -> NetworkControlUpdate;
    fn on_target_rate_constraints(&mut self, msg: TargetRateConstraints) -> NetworkControlUpdate;
    fn on_transport_loss_report(&mut self, msg: TransportLossReport) -> NetworkControlUpdate;
    fn on_transport_packets_feedback(
        &mut self,
        msg: TransportPacketsFeedback,
    ) -> NetworkControlUpdate;
    fn on_network_state_estimate(&mut self, msg: NetworkStateEstimate) -> NetworkControlUpdate;

    /// Whether the controller reacts to ECN marks, i.e. whether packets
    /// should be sent as ECT(1).
    fn supports_ecn_adaptation(&self) -> bool {
        false
    }

    fn process_interval(&self) -> TimeDelta {
        TimeDelta::from_millis(25)
    }
}

/// Any message a [`NetworkController`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    NetworkAvailability(NetworkAvailability),
    NetworkRouteChange(NetworkRouteChange),
    ProcessInterval(ProcessInterval),
    RemoteBitrateReport(RemoteBitrateReport),
    RoundTripTimeUpdate(RoundTripTimeUpdate),
    SentPacket(SentPacket),
    ReceivedPacket(ReceivedPacket),
    StreamsConfig(StreamsConfig),
    TargetRateConstraints(TargetRateConstraints),
    TransportLossReport(TransportLossReport),
    TransportPacketsFeedback(TransportPacketsFeedback),
    NetworkStateEstimate(NetworkStateEstimate),
}

impl NetworkEvent {
    /// Dispatches the event to the matching `on_*` method.
    pub fn apply_to<C: NetworkController + ?Sized>(self, controller: &mut C) -> NetworkControlUpdate {
        match self {
            NetworkEvent::NetworkAvailability(msg) => controller.on_network_availability(msg),
            NetworkEvent::NetworkRouteChange(msg) => controller.on_network_route_change(msg),
            NetworkEvent::ProcessInterval(msg) => controller.on_process_interval(msg),
            NetworkEvent::RemoteBitrateReport(msg) => controller.on_remote_bitrate_report(msg),
            NetworkEvent::RoundTripTimeUpdate(msg) => controller.on_round_trip_time_update(msg),
            NetworkEvent::SentPacket(msg) => controller.on_sent_packet(msg),
            NetworkEvent::ReceivedPacket(msg) => controller.on_received_packet(msg),
            NetworkEvent::StreamsConfig(msg) => controller.on_streams_config(msg),
            NetworkEvent::TargetRateConstraints(msg) => controller.on_target_rate_constraints(msg),
            NetworkEvent::TransportLossReport(msg) => controller.on_transport_loss_report(msg),
            NetworkEvent::TransportPacketsFeedback(msg) => {
                controller.on_transport_packets_feedback(msg)
            }
            NetworkEvent::NetworkStateEstimate(msg) => controller.on_network_state_estimate(msg),
        }
    }
}

macro_rules! impl_from_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for NetworkEvent {
                fn from(msg: $variant) -> Self {
                    NetworkEvent::$variant(msg)
                }
            }
        )*
    };
}

impl_from_message!(
    NetworkAvailability,
    NetworkRouteChange,
    ProcessInterval,
    RemoteBitrateReport,
    RoundTripTimeUpdate,
    SentPacket,
    ReceivedPacket,
    StreamsConfig,
    TargetRateConstraints,
    TransportLossReport,
    TransportPacketsFeedback,
    NetworkStateEstimate,
);
