use std::collections::VecDeque;

use log::{debug, info};
use units::{DataRate, TimeDelta, Timestamp};

use super::parameters::ScreamV2Parameters;
use super::scream_v2::ScreamV2;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::event_log::RtcEvent;
use crate::network_control::{NetworkController, NetworkControllerConfig, NetworkEvent};
use crate::network_types::*;

const DEFAULT_START_RATE: DataRate = DataRate::from_kbps(300);
const PACING_RATE_FACTOR: f64 = 1.5;
const BWE_PERIOD: TimeDelta = TimeDelta::from_millis(25);

/// Rejects constraints where the max is below the min.
pub(crate) fn validate_constraints(constraints: &TargetRateConstraints) -> Result<()> {
    if let (Some(min), Some(max)) = (constraints.min_data_rate, constraints.max_data_rate)
        && max < min
    {
        return Err(Error::ErrInvalidTargetRateConstraints { min, max });
    }
    Ok(())
}

/// [`NetworkController`] driven by [`ScreamV2`].
///
/// Besides the trait, the controller implements [`sansio::Protocol`]: feed
/// [`NetworkEvent`]s to `handle_read`, collect [`NetworkControlUpdate`]s
/// from `poll_read` and [`RtcEvent`] diagnostics from `poll_event`, and call
/// `handle_timeout` whenever `poll_timeout` says so.
pub struct ScreamNetworkController {
    env: Environment,
    params: ScreamV2Parameters,
    scream: ScreamV2,
    target_rate_constraints: TargetRateConstraints,
    streams_config: StreamsConfig,

    default_pacing_window: TimeDelta,
    /// Shortened while CE marks are seen and streams are configured.
    current_pacing_window: TimeDelta,

    last_padding_interval_started: Timestamp,
    /// Target rate of the last emitted update, if any.
    current_target_rate: Option<DataRate>,
    /// Whether the last emitted pacer config carried a pad rate.
    padding_active: bool,

    process_interval: TimeDelta,
    eto: Option<Timestamp>,
    updates: VecDeque<NetworkControlUpdate>,
    events: VecDeque<RtcEvent>,
    closed: bool,
}

impl ScreamNetworkController {
    /// # Panics
    ///
    /// Panics if the configured max data rate is below the min data rate.
    pub fn new(config: NetworkControllerConfig) -> Self {
        let env = config.env;
        let params = ScreamV2Parameters::new(env.field_trials());
        let mut scream = ScreamV2::with_parameters(env.clone(), params);
        let constraints = config.constraints;
        if constraints.min_data_rate.is_some() || constraints.max_data_rate.is_some() {
            scream.set_target_bitrate_constraints(
                constraints.min_data_rate.unwrap_or(DataRate::zero()),
                constraints.max_data_rate.unwrap_or(DataRate::plus_infinity()),
            );
        }

        Self {
            env,
            params,
            scream,
            target_rate_constraints: constraints,
            streams_config: config.stream_based_config,
            default_pacing_window: PacerConfig::DEFAULT_TIME_INTERVAL,
            current_pacing_window: PacerConfig::DEFAULT_TIME_INTERVAL,
            last_padding_interval_started: Timestamp::minus_infinity(),
            current_target_rate: None,
            padding_active: false,
            process_interval: TimeDelta::from_millis(25),
            eto: None,
            updates: VecDeque::new(),
            events: VecDeque::new(),
            closed: false,
        }
    }

    /// Sets how often `handle_timeout` runs the process interval.
    pub fn with_process_interval(mut self, process_interval: TimeDelta) -> Self {
        self.process_interval = process_interval;
        self
    }

    pub fn scream(&self) -> &ScreamV2 {
        &self.scream
    }

    fn apply_constraints(&mut self) {
        self.scream.set_target_bitrate_constraints(
            self.target_rate_constraints
                .min_data_rate
                .unwrap_or(DataRate::zero()),
            self.target_rate_constraints
                .max_data_rate
                .unwrap_or(DataRate::plus_infinity()),
        );
    }

    fn starting_rate(&self) -> DataRate {
        self.target_rate_constraints
            .starting_rate
            .unwrap_or(DEFAULT_START_RATE)
    }

    /// Pad rate allowed at `now`. Padding lets the target rate grow towards
    /// the configured stream rate when the encoder alone does not fill the
    /// window. It is allowed for `periodic_padding_duration` out of every
    /// `periodic_padding_interval`, and only while the target rate is below
    /// what the streams need.
    fn padding_rate(&mut self, now: Timestamp, target_rate: DataRate) -> DataRate {
        let Some(max_allocated) = self.streams_config.max_total_allocated_bitrate else {
            return DataRate::zero();
        };
        if !now.is_finite() || target_rate >= max_allocated * PACING_RATE_FACTOR {
            return DataRate::zero();
        }
        if now - self.last_padding_interval_started >= self.params.periodic_padding_interval {
            self.last_padding_interval_started = now;
        }
        if now - self.last_padding_interval_started < self.params.periodic_padding_duration {
            target_rate
        } else {
            DataRate::zero()
        }
    }

    /// With streams configured, CE marks within the last default window
    /// shrink the pacing window to one RTT, limiting bursts into an L4S
    /// queue.
    fn update_pacing_window(&mut self, msg: &TransportPacketsFeedback) {
        let ce_congested = msg.feedback_time - self.scream.last_ce_mark_detected_time()
            < self.default_pacing_window;
        let pacing_window = if ce_congested
            && self.streams_config.max_total_allocated_bitrate.is_some()
        {
            self.params
                .virtual_rtt
                .max(msg.smoothed_rtt)
                .min(self.default_pacing_window)
        } else {
            self.default_pacing_window
        };
        if pacing_window != self.current_pacing_window {
            debug!(
                "pacing window {} ms -> {} ms",
                self.current_pacing_window.ms(),
                pacing_window.ms()
            );
            self.current_pacing_window = pacing_window;
        }
    }

    fn create_pacer_config(&mut self, now: Timestamp, target_rate: DataRate) -> PacerConfig {
        let pad_rate = self.padding_rate(now, target_rate);
        self.padding_active = !pad_rate.is_zero();
        PacerConfig::create_with_time_window(
            now,
            target_rate * PACING_RATE_FACTOR,
            pad_rate,
            self.current_pacing_window,
        )
    }

    fn create_update(
        &mut self,
        now: Timestamp,
        target_rate: DataRate,
        rtt: TimeDelta,
    ) -> NetworkControlUpdate {
        self.current_target_rate = Some(target_rate);
        let target_rate_msg = TargetTransferRate {
            at_time: now,
            network_estimate: NetworkEstimate {
                at_time: now,
                round_trip_time: rtt,
                bwe_period: BWE_PERIOD,
                ..Default::default()
            },
            target_rate,
            ..Default::default()
        };
        NetworkControlUpdate {
            target_rate: Some(target_rate_msg),
            pacer_config: Some(self.create_pacer_config(now, target_rate)),
            ..Default::default()
        }
    }
}

impl NetworkController for ScreamNetworkController {
    fn on_network_availability(&mut self, msg: NetworkAvailability) -> NetworkControlUpdate {
        info!("network_available={}", msg.network_available);
        if msg.network_available {
            // The RTT is not known yet.
            self.create_update(msg.at_time, self.starting_rate(), TimeDelta::zero())
        } else {
            NetworkControlUpdate::default()
        }
    }

    /// # Panics
    ///
    /// Panics if the new max data rate is below the new min data rate.
    fn on_network_route_change(&mut self, msg: NetworkRouteChange) -> NetworkControlUpdate {
        info!("route changed, resetting ScreamV2");
        self.target_rate_constraints = msg.constraints;
        self.scream = ScreamV2::with_parameters(self.env.clone(), self.params);
        self.apply_constraints();
        self.last_padding_interval_started = Timestamp::minus_infinity();
        self.current_pacing_window = self.default_pacing_window;
        self.create_update(msg.at_time, self.starting_rate(), TimeDelta::zero())
    }

    /// Emits a pacer config when periodic padding starts or stops.
    fn on_process_interval(&mut self, msg: ProcessInterval) -> NetworkControlUpdate {
        let Some(target_rate) = self.current_target_rate else {
            return NetworkControlUpdate::default();
        };
        let was_padding = self.padding_active;
        let pacer_config = self.create_pacer_config(msg.at_time, target_rate);
        if self.padding_active == was_padding {
            return NetworkControlUpdate::default();
        }
        NetworkControlUpdate {
            pacer_config: Some(pacer_config),
            ..Default::default()
        }
    }

    fn on_remote_bitrate_report(&mut self, _msg: RemoteBitrateReport) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    /// The smoothed RTT carried by the feedback is used instead.
    fn on_round_trip_time_update(&mut self, _msg: RoundTripTimeUpdate) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    fn on_sent_packet(&mut self, _msg: SentPacket) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    fn on_received_packet(&mut self, _msg: ReceivedPacket) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    fn on_streams_config(&mut self, msg: StreamsConfig) -> NetworkControlUpdate {
        debug!(
            "max_total_allocated_bitrate={:?}",
            msg.max_total_allocated_bitrate
        );
        self.streams_config = msg;
        NetworkControlUpdate::default()
    }

    /// The new bounds apply from the next feedback on.
    ///
    /// # Panics
    ///
    /// Panics if the max data rate is below the min data rate.
    fn on_target_rate_constraints(&mut self, msg: TargetRateConstraints) -> NetworkControlUpdate {
        self.target_rate_constraints = msg;
        self.apply_constraints();
        NetworkControlUpdate::default()
    }

    fn on_transport_loss_report(&mut self, _msg: TransportLossReport) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    fn on_transport_packets_feedback(
        &mut self,
        msg: TransportPacketsFeedback,
    ) -> NetworkControlUpdate {
        let target_rate = self.scream.on_transport_packets_feedback(&msg);
        self.update_pacing_window(&msg);
        self.create_update(msg.feedback_time, target_rate, msg.smoothed_rtt)
    }

    fn on_network_state_estimate(&mut self, _msg: NetworkStateEstimate) -> NetworkControlUpdate {
        NetworkControlUpdate::default()
    }

    fn supports_ecn_adaptation(&self) -> bool {
        true
    }

    fn process_interval(&self) -> TimeDelta {
        self.process_interval
    }
}

impl sansio::Protocol<NetworkEvent, (), ()> for ScreamNetworkController {
    type Rout = NetworkControlUpdate;
    type Wout = ();
    type Eout = RtcEvent;
    type Error = Error;
    type Time = Timestamp;

    fn handle_read(&mut self, msg: NetworkEvent) -> Result<()> {
        if self.closed {
            return Err(Error::ErrClosed);
        }

        let mut is_feedback = false;
        match &msg {
            NetworkEvent::TargetRateConstraints(constraints) => validate_constraints(constraints)?,
            NetworkEvent::NetworkRouteChange(route_change) => {
                validate_constraints(&route_change.constraints)?
            }
            NetworkEvent::NetworkAvailability(availability) => {
                self.eto = if availability.network_available {
                    Some(availability.at_time + self.process_interval)
                } else {
                    None
                };
            }
            NetworkEvent::TransportPacketsFeedback(_) => is_feedback = true,
            _ => {}
        }

        let update = msg.apply_to(self);
        if update.has_updates() {
            self.updates.push_back(update);
        }
        if is_feedback && let Some(bwe_update) = self.scream.last_bwe_update() {
            self.events.push_back(RtcEvent::BweUpdateScream(bwe_update));
        }
        Ok(())
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        self.updates.pop_front()
    }

    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        None
    }

    fn handle_event(&mut self, _evt: ()) -> Result<()> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.events.pop_front()
    }

    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if let Some(eto) = self.eto
            && eto <= now
        {
            self.eto = Some(now + self.process_interval);
            let update = self.on_process_interval(ProcessInterval {
                at_time: now,
                pacer_queue: None,
            });
            if update.has_updates() {
                self.updates.push_back(update);
            }
        }
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.eto
    }

    fn close(&mut self) -> Result<()> {
        self.updates.clear();
        self.events.clear();
        self.eto = None;
        self.closed = true;
        Ok(())
    }
}
