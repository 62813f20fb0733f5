use units::{DataRate, DataSize, TimeDelta, Timestamp};

use super::parameters::ScreamV2Parameters;
use crate::network_types::TransportPacketsFeedback;
use crate::windowed_min_filter::WindowedMinFilter;

/// Queue delay detector that backs the reference window off when the
/// one-way delay grows, for paths where ECN marking is not available.
///
/// The one-way delay of every received packet is compared against a base
/// delay, the minimum one-way delay over the last
/// `base_delay_window_length` epochs (RFC 6817, LEDBAT). Taking the minimum
/// over a sliding window compensates for clock drift between sender and
/// receiver. The difference is the queue delay, smoothed with a fast-decay,
/// slow-attack EWMA.
#[derive(Debug, Clone)]
pub struct DelayBasedCongestionControl {
    params: ScreamV2Parameters,

    min_delay_based_bwe: DataRate,

    last_base_delay_update: Timestamp,
    next_base_delay: TimeDelta,
    base_delay_history: WindowedMinFilter<TimeDelta>,

    last_smoothed_rtt: TimeDelta,
    last_update_queue_delay_avg_time: Timestamp,
    queue_delay_avg: TimeDelta,
}

impl DelayBasedCongestionControl {
    pub fn new(params: ScreamV2Parameters) -> Self {
        let mut base_delay_history =
            WindowedMinFilter::new(params.base_delay_window_length.max(1) as usize);
        base_delay_history.insert(TimeDelta::plus_infinity());
        Self {
            params,
            min_delay_based_bwe: DataRate::zero(),
            last_base_delay_update: Timestamp::minus_infinity(),
            next_base_delay: TimeDelta::plus_infinity(),
            base_delay_history,
            last_smoothed_rtt: TimeDelta::zero(),
            last_update_queue_delay_avg_time: Timestamp::minus_infinity(),
            queue_delay_avg: TimeDelta::plus_infinity(),
        }
    }

    pub fn on_transport_packets_feedback(&mut self, msg: &TransportPacketsFeedback) {
        if msg.packets_with_feedback().is_empty() {
            return;
        }
        self.last_smoothed_rtt = msg.smoothed_rtt;

        let use_all_packets = self.params.use_all_packets_when_calculating_queue_delay;
        let mut one_way_delay = TimeDelta::plus_infinity();
        for packet in msg.sorted_by_receive_time() {
            one_way_delay = packet.receive_time - packet.sent_packet.send_time;
            self.next_base_delay = self.next_base_delay.min(one_way_delay);
            if use_all_packets {
                self.update_queue_delay_average(one_way_delay);
            }
        }

        if !use_all_packets
            && msg.feedback_time - self.last_update_queue_delay_avg_time
                >= self.params.virtual_rtt.min(msg.smoothed_rtt)
        {
            self.last_update_queue_delay_avg_time = msg.feedback_time;
            self.update_queue_delay_average(one_way_delay);
        }

        if msg.feedback_time - self.last_base_delay_update
            >= self.params.base_delay_history_update_interval
        {
            self.base_delay_history.insert(self.next_base_delay);
            self.last_base_delay_update = msg.feedback_time;
            self.next_base_delay = TimeDelta::plus_infinity();
        }
    }

    /// Floors delay-driven reductions so that the window never implies a
    /// rate below `min_delay_based_bwe`.
    pub fn set_min_delay_based_bwe(&mut self, min_delay_based_bwe: DataRate) {
        self.min_delay_based_bwe = min_delay_based_bwe;
    }

    /// True once the average queue delay exceeds
    /// `queue_delay_target * queue_delay_increased_threshold`. Low queue
    /// delay does not by itself mean the window has to shrink.
    pub fn is_queue_delay_detected(&self) -> bool {
        self.queue_delay_avg.is_finite()
            && self.queue_delay_avg
                > self.params.queue_delay_target * self.params.queue_delay_increased_threshold
    }

    /// True once the average queue delay exceeds
    /// `queue_delay_target * queue_delay_threshold`.
    pub fn should_reduce_reference_window(&self) -> bool {
        self.queue_delay_avg.is_finite() && self.queue_delay_avg > self.reduce_threshold()
    }

    /// Reduces `ref_window` in proportion to how far the queue delay is
    /// above the reduction threshold.
    pub fn update_reference_window(
        &self,
        ref_window: DataSize,
        ref_window_mss_ratio: f64,
        virtual_alpha_lim: f64,
    ) -> DataSize {
        let min_allowed_ref_window = self.min_delay_based_bwe * self.last_smoothed_rtt;
        if ref_window < min_allowed_ref_window {
            return min_allowed_ref_window;
        }

        let threshold = self.reduce_threshold();
        let l4s_alpha_v = (2.0 * virtual_alpha_lim * ((self.queue_delay_avg - threshold) / threshold))
            .clamp(0.0, 1.0);
        let mut backoff = l4s_alpha_v * self.params.queue_delay_threshold;
        backoff /= (self.last_smoothed_rtt / self.params.virtual_rtt).max(1.0);
        backoff *= (1.0 - ref_window_mss_ratio).max(0.5);

        min_allowed_ref_window.max(ref_window * (1.0 - backoff))
    }

    /// Damping factor in `[0.1, 1.0]` applied to window growth while the
    /// queue delay approaches the reduction threshold.
    pub fn scale_increase(&self) -> f64 {
        if !self.queue_delay_avg.is_finite() {
            return 1.0;
        }
        (1.0 - self.queue_delay_avg / self.reduce_threshold()).clamp(0.1, 1.0)
    }

    /// Average queue delay, `plus_infinity()` before the first feedback.
    pub fn queue_delay(&self) -> TimeDelta {
        self.queue_delay_avg
    }

    fn reduce_threshold(&self) -> TimeDelta {
        self.params.queue_delay_target * self.params.queue_delay_threshold
    }

    fn update_queue_delay_average(&mut self, one_way_delay: TimeDelta) {
        let base_delay = match self.base_delay_history.min() {
            Some(history_min) => self.next_base_delay.min(history_min),
            None => self.next_base_delay,
        };
        let current_queue_delay = one_way_delay - base_delay;
        if current_queue_delay < self.queue_delay_avg {
            self.queue_delay_avg = current_queue_delay;
        } else {
            let g = self.params.queue_delay_avg_g;
            self.queue_delay_avg = current_queue_delay * g + self.queue_delay_avg * (1.0 - g);
        }
    }
}
