use log::warn;
use serde::{Deserialize, Serialize};
use units::{DataSize, TimeDelta};

use crate::error::{Error, Result};
use crate::field_trial::{FieldTrialsView, parse_parameter, split_parameters};

/// Tunables for [`ScreamV2`](super::ScreamV2) and its delay-based detector.
///
/// Defaults follow draft-johansson-ccwg-rfc8298bis-screamv2 except where
/// noted. Every field can be overridden through the `WebRTC-Bwe-ScreamV2`
/// field trial, e.g. `"WebRTC-Bwe-ScreamV2/MinRefWindow:6000,VirtualRtt:20ms/"`,
/// or deserialized from JSON (missing fields keep their defaults).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreamV2Parameters {
    /// Lower bound on the reference window.
    pub min_ref_window: DataSize,

    /// EWMA gain for `l4s_alpha`.
    pub l4s_avg_g: f64,

    /// Largest packet the sender may transmit, including IP overhead.
    pub max_segment_size: DataSize,

    /// Head room over the observed data in flight that the reference window
    /// may grow to.
    pub bytes_in_flight_head_room: f64,

    /// Reference window scale factor applied on loss.
    pub beta_loss: f64,

    /// Number of RTTs after a congestion event during which window growth is
    /// cautious.
    pub post_congestion_delay_rtts: i32,

    /// Fraction of the reference window it may grow by per RTT.
    pub multiplicative_increase_factor: f64,

    /// Flows with an RTT below this get roughly equal share over an L4S
    /// path, mimicking Prague's RTT fairness.
    pub virtual_rtt: TimeDelta,

    /// Increase and decrease close to the last inflection point are scaled
    /// by `(factor * |ref_window - ref_window_i| / ref_window_i)^2`. Lower
    /// than the draft's 8.0, so movement around the inflection point is
    /// slower.
    pub backoff_scale_factor_close_to_ref_window_i: f64,

    /// RTTs without congestion after which a CE event resets the window
    /// towards the observed data in flight.
    pub number_of_rtts_between_reset_ref_window_i_on_congestion: i32,

    /// Excessive data in flight correction.
    pub data_in_flight_limit: f64,
    pub max_data_in_flight_limit_compensation: f64,

    /// EWMA gain for the queue delay average.
    pub queue_delay_avg_g: f64,

    /// Number of base delay epochs kept for the one-way delay minimum.
    pub base_delay_window_length: i32,
    /// Length of one base delay epoch.
    pub base_delay_history_update_interval: TimeDelta,

    pub queue_delay_target: TimeDelta,

    /// Queue delay is detected above `queue_delay_target` times this.
    pub queue_delay_increased_threshold: f64,

    /// The reference window is reduced above `queue_delay_target` times this.
    pub queue_delay_threshold: f64,

    /// Feed every packet into the queue delay average instead of only the
    /// last packet once per `min(virtual_rtt, smoothed_rtt)`.
    pub use_all_packets_when_calculating_queue_delay: bool,

    /// How often periodic padding starts.
    pub periodic_padding_interval: TimeDelta,

    /// How long periodic padding lasts.
    pub periodic_padding_duration: TimeDelta,
}

impl Default for ScreamV2Parameters {
    fn default() -> Self {
        Self {
            min_ref_window: DataSize::from_bytes(3000),
            l4s_avg_g: 1.0 / 16.0,
            max_segment_size: DataSize::from_bytes(1000),
            bytes_in_flight_head_room: 1.1,
            beta_loss: 0.7,
            post_congestion_delay_rtts: 100,
            multiplicative_increase_factor: 0.02,
            virtual_rtt: TimeDelta::from_millis(25),
            backoff_scale_factor_close_to_ref_window_i: 2.0,
            number_of_rtts_between_reset_ref_window_i_on_congestion: 100,
            data_in_flight_limit: 0.9,
            max_data_in_flight_limit_compensation: 1.5,
            queue_delay_avg_g: 1.0 / 4.0,
            base_delay_window_length: 10,
            base_delay_history_update_interval: TimeDelta::from_minutes(1),
            queue_delay_target: TimeDelta::from_millis(100),
            queue_delay_increased_threshold: 0.25,
            queue_delay_threshold: 0.5,
            use_all_packets_when_calculating_queue_delay: true,
            periodic_padding_interval: TimeDelta::from_seconds(10),
            periodic_padding_duration: TimeDelta::from_seconds(1),
        }
    }
}

impl ScreamV2Parameters {
    pub const FIELD_TRIAL_NAME: &'static str = "WebRTC-Bwe-ScreamV2";

    /// Defaults overridden by the `WebRTC-Bwe-ScreamV2` field trial.
    /// Malformed or unknown parameters are logged and ignored.
    pub fn new(trials: &dyn FieldTrialsView) -> Self {
        let mut params = Self::default();
        let group = trials.lookup(Self::FIELD_TRIAL_NAME);
        for parameter in split_parameters(&group) {
            if let Err(err) = parameter.and_then(|(key, value)| params.set(key, value)) {
                warn!("{}: {}", Self::FIELD_TRIAL_NAME, err);
            }
        }
        params
    }

    /// Overrides a single parameter by its field trial key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "MinRefWindow" => self.min_ref_window = parse_parameter(key, value)?,
            "L4sAvgG" => self.l4s_avg_g = parse_parameter(key, value)?,
            "MaxSegmentSize" => self.max_segment_size = parse_parameter(key, value)?,
            "BytesInFlightHeadRoom" => {
                self.bytes_in_flight_head_room = parse_parameter(key, value)?
            }
            "BetaLoss" => self.beta_loss = parse_parameter(key, value)?,
            "PostCongestionDelayRtts" => {
                self.post_congestion_delay_rtts = parse_parameter(key, value)?
            }
            "MultiplicativeIncreaseFactor" => {
                self.multiplicative_increase_factor = parse_parameter(key, value)?
            }
            "VirtualRtt" => self.virtual_rtt = parse_parameter(key, value)?,
            "BackoffScaleFactorCloseToRefWindowI" => {
                self.backoff_scale_factor_close_to_ref_window_i = parse_parameter(key, value)?
            }
            "NumberOfRttsBetweenResetRefWindowIOnCongestion" => {
                self.number_of_rtts_between_reset_ref_window_i_on_congestion =
                    parse_parameter(key, value)?
            }
            "DataInFlightLimit" => self.data_in_flight_limit = parse_parameter(key, value)?,
            "MaxDataInFlightLimitCompensation" => {
                self.max_data_in_flight_limit_compensation = parse_parameter(key, value)?
            }
            "QDelayAvgG" => self.queue_delay_avg_g = parse_parameter(key, value)?,
            "BaseDelayWindowLength" => {
                self.base_delay_window_length = parse_parameter(key, value)?
            }
            "BaseDelayHistoryUpdateInterval" => {
                self.base_delay_history_update_interval = parse_parameter(key, value)?
            }
            "QDelayTarget" => self.queue_delay_target = parse_parameter(key, value)?,
            "QDelayIncreasedThreshold" => {
                self.queue_delay_increased_threshold = parse_parameter(key, value)?
            }
            "QDelayThreshold" => self.queue_delay_threshold = parse_parameter(key, value)?,
            "UseAllPacketsWhenCalculatingQDelay" => {
                self.use_all_packets_when_calculating_queue_delay = parse_parameter(key, value)?
            }
            "PeriodicPadding" => self.periodic_padding_interval = parse_parameter(key, value)?,
            "PaddingDuration" => self.periodic_padding_duration = parse_parameter(key, value)?,
            _ => return Err(Error::ErrFieldTrialUnknownKey(key.to_owned())),
        }
        Ok(())
    }
}
