use log::{info, trace};
use units::{DataRate, DataSize, TimeDelta, Timestamp};

use super::delay_based::DelayBasedCongestionControl;
use super::parameters::ScreamV2Parameters;
use crate::environment::Environment;
use crate::event_log::{BweUpdateScream, RtcEvent};
use crate::network_types::{EcnMarking, TransportPacketsFeedback};

/// Size of packets with feedback, lost packets included, that were not CE
/// marked.
fn data_units_acked_and_not_marked(msg: &TransportPacketsFeedback) -> DataSize {
    msg.packets_with_feedback()
        .iter()
        .filter(|packet| packet.ecn != EcnMarking::Ce)
        .fold(DataSize::zero(), |acc, packet| acc + packet.sent_packet.size)
}

fn has_ce_marking(msg: &TransportPacketsFeedback) -> bool {
    msg.packets_with_feedback()
        .iter()
        .any(|packet| packet.ecn == EcnMarking::Ce)
}

fn has_lost_packets(msg: &TransportPacketsFeedback) -> bool {
    msg.packets_with_feedback()
        .iter()
        .any(|packet| !packet.is_received())
}

/// SCREAMv2 sender side congestion control,
/// draft-johansson-ccwg-rfc8298bis-screamv2.
///
/// The controller keeps a reference window, an upper limit on the data in
/// flight, and derives the target rate from it as `ref_window / rtt`. The
/// window shrinks on loss, on ECN-CE marks in proportion to the smoothed
/// marking fraction (`l4s_alpha`), and on queue delay growth ("virtual CE")
/// when the path does not mark. It grows with the acknowledged data,
/// slower close to the window at the last congestion event (the
/// inflection point `ref_window_i`).
pub struct ScreamV2 {
    env: Environment,
    params: ScreamV2Parameters,

    max_target_bitrate: DataRate,
    min_target_bitrate: DataRate,
    target_rate: DataRate,

    ref_window: DataSize,
    /// `ref_window` when congestion was last noticed.
    ref_window_i: DataSize,
    /// Set when `ref_window` has grown since `ref_window_i` was last set.
    allow_ref_window_i_update: bool,

    /// Average fraction of CE marked packets per RTT.
    l4s_alpha: f64,
    last_ce_mark_detected_time: Timestamp,

    last_data_in_flight_update: Timestamp,
    max_data_in_flight_this_rtt: DataSize,
    max_data_in_flight_prev_rtt: DataSize,

    /// Feedback time of the last congestion event that caused a reaction.
    last_reaction_to_congestion_time: Timestamp,

    delay_based_congestion_control: DelayBasedCongestionControl,

    last_bwe_update: Option<BweUpdateScream>,
}

impl ScreamV2 {
    pub fn new(env: Environment) -> Self {
        let params = ScreamV2Parameters::new(env.field_trials());
        Self::with_parameters(env, params)
    }

    pub fn with_parameters(env: Environment, params: ScreamV2Parameters) -> Self {
        Self {
            env,
            params,
            max_target_bitrate: DataRate::plus_infinity(),
            min_target_bitrate: DataRate::zero(),
            target_rate: DataRate::zero(),
            ref_window: params.min_ref_window,
            ref_window_i: DataSize::from_bytes(1),
            allow_ref_window_i_update: true,
            l4s_alpha: 0.0,
            last_ce_mark_detected_time: Timestamp::minus_infinity(),
            last_data_in_flight_update: Timestamp::minus_infinity(),
            max_data_in_flight_this_rtt: DataSize::zero(),
            max_data_in_flight_prev_rtt: DataSize::zero(),
            last_reaction_to_congestion_time: Timestamp::minus_infinity(),
            delay_based_congestion_control: DelayBasedCongestionControl::new(params),
            last_bwe_update: None,
        }
    }

    /// Bounds every future target rate to `[min, max]`. `min` also floors
    /// delay-driven window reductions.
    ///
    /// # Panics
    ///
    /// Panics if `max < min`.
    pub fn set_target_bitrate_constraints(&mut self, min: DataRate, max: DataRate) {
        assert!(
            max >= min,
            "max target bitrate {max} is below min target bitrate {min}"
        );
        self.min_target_bitrate = min;
        self.max_target_bitrate = max;
        self.delay_based_congestion_control.set_min_delay_based_bwe(min);
        info!(
            "min_target_bitrate={} max_target_bitrate={}",
            self.min_target_bitrate, self.max_target_bitrate
        );
    }

    /// Runs one update cycle and returns the new target rate.
    pub fn on_transport_packets_feedback(&mut self, msg: &TransportPacketsFeedback) -> DataRate {
        self.delay_based_congestion_control
            .on_transport_packets_feedback(msg);
        self.update_l4s_alpha(msg);
        self.update_ref_window_and_target_rate(msg);

        let bwe_update = self.bwe_update(msg);
        self.last_bwe_update = Some(bwe_update);
        self.env
            .event_log()
            .log(RtcEvent::BweUpdateScream(bwe_update));
        self.target_rate
    }

    /// Upper limit on the data in flight.
    pub fn ref_window(&self) -> DataSize {
        self.ref_window
    }

    /// Average fraction of CE marked packets per RTT.
    pub fn l4s_alpha(&self) -> f64 {
        self.l4s_alpha
    }

    /// Feedback time of the last report carrying a CE mark.
    pub fn last_ce_mark_detected_time(&self) -> Timestamp {
        self.last_ce_mark_detected_time
    }

    pub fn target_rate(&self) -> DataRate {
        self.target_rate
    }

    pub fn queue_delay(&self) -> TimeDelta {
        self.delay_based_congestion_control.queue_delay()
    }

    /// State after the last processed feedback, as reported to the event
    /// log.
    pub fn last_bwe_update(&self) -> Option<BweUpdateScream> {
        self.last_bwe_update
    }

    fn bwe_update(&self, msg: &TransportPacketsFeedback) -> BweUpdateScream {
        BweUpdateScream {
            at_time: msg.feedback_time,
            ref_window: self.ref_window,
            data_in_flight: msg.data_in_flight,
            target_rate: self.target_rate,
            smoothed_rtt: msg.smoothed_rtt,
            queue_delay: self.queue_delay(),
            l4s_marked_permille: (self.l4s_alpha * 1000.0) as u32,
        }
    }

    fn update_l4s_alpha(&mut self, msg: &TransportPacketsFeedback) {
        let received_packets = msg.received_with_send_info();
        if received_packets.is_empty() {
            return;
        }
        let data_units_marked = received_packets
            .iter()
            .filter(|packet| packet.ecn == EcnMarking::Ce)
            .count();
        if data_units_marked > 0 {
            self.last_ce_mark_detected_time = msg.feedback_time;
        }
        let fraction_marked = data_units_marked as f64 / received_packets.len() as f64;
        let g = self.params.l4s_avg_g;
        self.l4s_alpha = g * fraction_marked + (1.0 - g) * self.l4s_alpha;
    }

    fn update_ref_window_and_target_rate(&mut self, msg: &TransportPacketsFeedback) {
        let params = self.params;
        self.max_data_in_flight_this_rtt = self.max_data_in_flight_this_rtt.max(msg.data_in_flight);

        let non_zero_smoothed_rtt = msg.smoothed_rtt.max(TimeDelta::from_millis(1));

        let is_ce = has_ce_marking(msg);
        let is_loss = has_lost_packets(msg);
        let virtual_alpha_lim =
            ((params.max_segment_size * 2) / non_zero_smoothed_rtt) / self.target_rate;
        // L4S does not seem to be enabled and the queue has grown.
        let is_virtual_ce = self.l4s_alpha < virtual_alpha_lim
            && self
                .delay_based_congestion_control
                .should_reduce_reference_window();

        let previous_ref_window = self.ref_window;
        let rtt_ratio_over_virtual = (msg.smoothed_rtt / params.virtual_rtt).max(1.0);

        let time_since_last_reaction = msg.feedback_time - self.last_reaction_to_congestion_time;
        if (is_virtual_ce || is_ce || is_loss)
            && time_since_last_reaction >= msg.smoothed_rtt.min(params.virtual_rtt)
        {
            self.last_reaction_to_congestion_time = msg.feedback_time;
            if is_loss {
                self.ref_window = self.ref_window * (params.beta_loss / rtt_ratio_over_virtual);
            }
            if is_ce {
                let mut backoff = self.l4s_alpha / 2.0;
                // Several backoffs per RTT when the RTT is high.
                backoff /= rtt_ratio_over_virtual;
                backoff *= (1.0 - self.ref_window_mss_ratio()).max(0.5);

                if !self.delay_based_congestion_control.is_queue_delay_detected() {
                    backoff *= self
                        .ref_window_scale_factor_close_to_ref_window_i()
                        .max(0.25);
                }

                // Requires an earlier reaction.
                if time_since_last_reaction.is_finite()
                    && time_since_last_reaction
                        > params.virtual_rtt.max(msg.smoothed_rtt)
                        * i64::from(
                            params.number_of_rtts_between_reset_ref_window_i_on_congestion,
                        )
                {
                    // Long since the last congestion, the window may have
                    // grown far above the data in flight.
                    self.ref_window = self
                        .max_data_in_flight_prev_rtt
                        .clamp(params.min_ref_window, self.ref_window.max(params.min_ref_window));
                    backoff = backoff.max(0.25);
                    self.l4s_alpha = 0.25;
                }
                self.ref_window = self.ref_window * (1.0 - backoff);
            }
            if is_virtual_ce {
                self.ref_window = self.delay_based_congestion_control.update_reference_window(
                    self.ref_window,
                    self.ref_window_mss_ratio(),
                    virtual_alpha_lim,
                );
            }

            if self.allow_ref_window_i_update {
                self.ref_window_i = self.ref_window;
                self.allow_ref_window_i_update = false;
            }
        }

        let max_of_virtual_and_smoothed_rtt = params.virtual_rtt.max(msg.smoothed_rtt);

        // Growth is allowed without congestion events, and in the round that
        // just backed off. At rates close to capacity a CE mark in every
        // feedback is likely and does not mean we send too much.
        if (!is_ce && !is_loss && !is_virtual_ce)
            || self.last_reaction_to_congestion_time == msg.feedback_time
        {
            let mut increase =
                data_units_acked_and_not_marked(msg) * self.ref_window_mss_ratio();

            if msg.smoothed_rtt < params.virtual_rtt {
                let rtt_ratio = msg.smoothed_rtt / params.virtual_rtt;
                increase = increase * (rtt_ratio * rtt_ratio);
            }
            if self.l4s_alpha < virtual_alpha_lim {
                increase = increase * self.delay_based_congestion_control.scale_increase();
            }
            increase = increase
                * self
                    .ref_window_scale_factor_close_to_ref_window_i()
                    .max(0.25);
            increase = increase * (1.0 - self.ref_window_mss_ratio()).max(0.5);

            let post_congestion_scale = ((msg.feedback_time
                - self.last_reaction_to_congestion_time)
                / (max_of_virtual_and_smoothed_rtt * i64::from(params.post_congestion_delay_rtts)))
            .clamp(0.0, 1.0);
            let multiplicative_scale = 1.0
                + (self.ref_window_multiplicative_scale_factor() - 1.0)
                    * post_congestion_scale
                    * self.ref_window_scale_factor_close_to_ref_window_i();
            increase = increase * multiplicative_scale;

            // Inhibit growth once the window is well above what is actually
            // in flight, so it does not run away while the source is
            // application limited.
            let max_allowed_ref_window = (params.max_segment_size
                + self
                    .max_data_in_flight_this_rtt
                    .max(self.max_data_in_flight_prev_rtt)
                    * params.bytes_in_flight_head_room)
                .max(params.min_ref_window);

            if self.ref_window < max_allowed_ref_window {
                self.ref_window = (self.ref_window + increase)
                    .clamp(params.min_ref_window, max_allowed_ref_window);
            }
        }

        let mut scale_target_rate = 1.0;
        if self.delay_based_congestion_control.is_queue_delay_detected() {
            // Limit the rate when data in flight is close to or above the
            // reference window.
            let data_in_flight_ratio = msg.data_in_flight / self.ref_window;
            if data_in_flight_ratio > params.data_in_flight_limit {
                scale_target_rate /= params
                    .max_data_in_flight_limit_compensation
                    .min(data_in_flight_ratio / params.data_in_flight_limit);
            }
        }
        // Slightly lower rate when the window is only a few segments.
        scale_target_rate *= 1.0 - (self.ref_window_mss_ratio() - 0.1).clamp(0.0, 0.2);
        self.target_rate = ((self.ref_window / non_zero_smoothed_rtt) * scale_target_rate)
            .clamp(self.min_target_bitrate, self.max_target_bitrate);

        if previous_ref_window != self.ref_window {
            trace!(
                "ref_window={} ref_window_i={} change={} bytes l4s_alpha={} \
                 scale_target_rate={} is_ce={} is_virtual_ce={} is_loss={} \
                 smoothed_rtt={} ms queue_delay={} ms target_rate={} kbps",
                self.ref_window,
                self.ref_window_i,
                self.ref_window.bytes() - previous_ref_window.bytes(),
                self.l4s_alpha,
                scale_target_rate,
                is_ce,
                is_virtual_ce,
                is_loss,
                msg.smoothed_rtt.ms(),
                self.queue_delay().ms(),
                self.target_rate.kbps(),
            );
        }

        if previous_ref_window < self.ref_window {
            self.allow_ref_window_i_update = true;
        }
        if msg.feedback_time - self.last_data_in_flight_update >= max_of_virtual_and_smoothed_rtt {
            self.last_data_in_flight_update = msg.feedback_time;
            self.max_data_in_flight_prev_rtt = self.max_data_in_flight_this_rtt;
            self.max_data_in_flight_this_rtt = DataSize::zero();
        }
    }

    fn ref_window_mss_ratio(&self) -> f64 {
        self.params.max_segment_size / self.ref_window
    }

    /// Scale factor for window changes close to the last inflection point,
    /// in `[0.1, 1.0]`.
    fn ref_window_scale_factor_close_to_ref_window_i(&self) -> f64 {
        let distance = if self.ref_window > self.ref_window_i {
            self.ref_window - self.ref_window_i
        } else {
            self.ref_window_i - self.ref_window
        };
        let scl =
            self.params.backoff_scale_factor_close_to_ref_window_i * (distance / self.ref_window_i);
        (scl * scl).clamp(0.1, 1.0)
    }

    /// Per-RTT multiplicative growth factor, always above 1.0.
    fn ref_window_multiplicative_scale_factor(&self) -> f64 {
        1.0 + self.params.multiplicative_increase_factor * (self.ref_window / self.params.max_segment_size)
    }
}
