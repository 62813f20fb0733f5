//! Integration tests for the SCREAMv2 controller over a simulated bottleneck.
//!
//! These tests verify that the controller:
//! - Ramps up to the configured max target rate on an unconstrained link
//! - Does not shrink its window when the source becomes application limited
//! - Converges close to the link capacity when congestion is signalled by
//!   ECN-CE marks, by drop-tail loss, or only by queue delay

mod common;

use common::{CcFeedbackGenerator, Config, NetworkConfig};
use rtc_congestion::scream::ScreamV2;
use rtc_congestion::{Environment, FieldTrials, MemoryEventLog, RtcEvent};
use std::sync::Arc;
use units::{DataRate, TimeDelta};

// =============================================================================
// Helper Functions
// =============================================================================

struct AdaptationResult {
    rate_after_adaptation: DataRate,
    min_rate_after_adaptation: DataRate,
    max_rate_after_adaptation: DataRate,
    max_smoothed_rtt_after_adaptation: TimeDelta,
}

/// Lets the controller drive the send rate for `adaptation_time`, then
/// records the range of target rates and RTTs over the next five seconds.
fn run_adaptation(config: Config, adaptation_time: TimeDelta) -> AdaptationResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut scream = ScreamV2::new(Environment::default());
    let mut generator = CcFeedbackGenerator::new(config);
    let start_time = generator.now();

    let mut send_rate = DataRate::from_kbps(100);
    while generator.now() < start_time + adaptation_time {
        let feedback = generator.process_until_next_feedback(send_rate);
        send_rate = scream.on_transport_packets_feedback(&feedback);
    }

    let mut result = AdaptationResult {
        rate_after_adaptation: send_rate,
        min_rate_after_adaptation: DataRate::plus_infinity(),
        max_rate_after_adaptation: DataRate::zero(),
        max_smoothed_rtt_after_adaptation: TimeDelta::zero(),
    };
    while generator.now() < start_time + adaptation_time + TimeDelta::from_seconds(5) {
        let feedback = generator.process_until_next_feedback(send_rate);
        send_rate = scream.on_transport_packets_feedback(&feedback);
        result.min_rate_after_adaptation = result.min_rate_after_adaptation.min(send_rate);
        result.max_rate_after_adaptation = result.max_rate_after_adaptation.max(send_rate);
        result.max_smoothed_rtt_after_adaptation = result
            .max_smoothed_rtt_after_adaptation
            .max(feedback.smoothed_rtt);
    }
    result
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_ramps_up_to_max_target_rate() {
    let mut scream = ScreamV2::new(Environment::default());
    let max_rate = DataRate::from_kbps(2000);
    scream.set_target_bitrate_constraints(DataRate::zero(), max_rate);

    let mut generator = CcFeedbackGenerator::new(Config {
        network_config: NetworkConfig {
            queue_delay_ms: 25,
            ..Default::default()
        },
        ..Default::default()
    });

    let mut target_rate = DataRate::from_kbps(100);
    for _ in 0..200 {
        let feedback = generator.process_until_next_feedback(target_rate);
        target_rate = scream.on_transport_packets_feedback(&feedback);
        assert!(target_rate <= max_rate);
    }
    assert_eq!(target_rate, max_rate);
}

#[test]
fn test_reference_window_kept_when_application_limited() {
    let mut scream = ScreamV2::new(Environment::default());
    let mut generator = CcFeedbackGenerator::new(Config {
        network_config: NetworkConfig {
            queue_delay_ms: 25,
            ..Default::default()
        },
        ..Default::default()
    });
    let start_time = generator.now();

    let mut send_rate = DataRate::from_kbps(100);
    while generator.now() < start_time + TimeDelta::from_seconds(2) {
        let feedback = generator.process_until_next_feedback(send_rate);
        send_rate = scream.on_transport_packets_feedback(&feedback);
    }

    // The encoder produces less than allowed. Without congestion the window
    // must not shrink, only stop growing.
    let limited_rate = send_rate / 2.0;
    let mut ref_window = scream.ref_window();
    for _ in 0..40 {
        let feedback = generator.process_until_next_feedback(limited_rate);
        scream.on_transport_packets_feedback(&feedback);
        assert!(scream.ref_window() >= ref_window);
        ref_window = scream.ref_window();
    }
}

#[test]
fn test_adapts_to_ecn_link_capacity_1mbps() {
    let result = run_adaptation(
        Config {
            network_config: NetworkConfig {
                queue_delay_ms: 25,
                link_capacity: DataRate::from_kbps(1000),
                ..Default::default()
            },
            send_as_ect1: true,
            ..Default::default()
        },
        TimeDelta::from_seconds(3),
    );

    assert!(result.rate_after_adaptation < DataRate::from_kbps(1200));
    assert!(result.rate_after_adaptation > DataRate::from_kbps(650));
    assert!(result.max_rate_after_adaptation < DataRate::from_kbps(1200));
    assert!(result.min_rate_after_adaptation > DataRate::from_kbps(600));
    assert!(result.max_smoothed_rtt_after_adaptation < TimeDelta::from_millis(25 * 2 + 50));
}

#[test]
fn test_adapts_to_loss_link_capacity_5mbps() {
    // Not ECN capable, the controller adapts only to drop-tail loss.
    let result = run_adaptation(
        Config {
            network_config: NetworkConfig {
                queue_delay_ms: 10,
                link_capacity: DataRate::from_kbps(5000),
                queue_length_packets: 3,
            },
            send_as_ect1: false,
            ..Default::default()
        },
        TimeDelta::from_seconds(10),
    );

    assert!(result.rate_after_adaptation < DataRate::from_kbps(5500));
    assert!(result.rate_after_adaptation > DataRate::from_kbps(2500));
    assert!(result.max_rate_after_adaptation < DataRate::from_kbps(5500));
    assert!(result.min_rate_after_adaptation > DataRate::from_kbps(2500));
    assert!(result.max_smoothed_rtt_after_adaptation < TimeDelta::from_millis(10 * 2 + 40));
}

#[test]
fn test_adapts_to_delay_link_capacity_2mbps() {
    // Unlimited queue and no ECN, the controller adapts only to delay.
    let result = run_adaptation(
        Config {
            network_config: NetworkConfig {
                queue_delay_ms: 10,
                link_capacity: DataRate::from_kbps(2000),
                ..Default::default()
            },
            send_as_ect1: false,
            ..Default::default()
        },
        TimeDelta::from_seconds(3),
    );

    assert!(result.rate_after_adaptation < DataRate::from_kbps(2400));
    assert!(result.rate_after_adaptation > DataRate::from_kbps(1500));
    assert!(result.max_rate_after_adaptation < DataRate::from_kbps(2400));
    assert!(result.min_rate_after_adaptation > DataRate::from_kbps(1500));
    assert!(result.max_smoothed_rtt_after_adaptation < TimeDelta::from_millis(10 * 2 + 80));
}

#[test]
fn test_field_trial_changes_min_ref_window() {
    let trials = FieldTrials::parse("WebRTC-Bwe-ScreamV2/MinRefWindow:6000/").unwrap();
    let scream = ScreamV2::new(Environment::default().with_field_trials(Arc::new(trials)));
    assert_eq!(scream.ref_window(), units::DataSize::from_bytes(6000));
}

#[test]
fn test_every_feedback_is_logged() {
    let event_log = Arc::new(MemoryEventLog::new());
    let mut scream = ScreamV2::new(Environment::default().with_event_log(event_log.clone()));
    let mut generator = CcFeedbackGenerator::new(Config {
        network_config: NetworkConfig {
            queue_delay_ms: 10,
            link_capacity: DataRate::from_kbps(1000),
            ..Default::default()
        },
        send_as_ect1: true,
        ..Default::default()
    });

    let mut send_rate = DataRate::from_kbps(300);
    let mut feedback_times = vec![];
    for _ in 0..20 {
        let feedback = generator.process_until_next_feedback(send_rate);
        feedback_times.push(feedback.feedback_time);
        send_rate = scream.on_transport_packets_feedback(&feedback);
    }

    let events = event_log.take();
    assert_eq!(events.len(), 20);
    for (event, feedback_time) in events.iter().zip(feedback_times) {
        if let RtcEvent::BweUpdateScream(update) = event {
            assert_eq!(update.at_time, feedback_time);
            assert!(update.l4s_marked_permille <= 1000);
        } else {
            panic!("unexpected event {event:?}");
        }
    }
    assert!(event_log.is_empty());
}
