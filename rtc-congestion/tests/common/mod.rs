//! Deterministic bottleneck link and transport feedback generator shared by
//! the integration tests.
//!
//! Packets are paced out at the requested send rate, serialized over a
//! single FIFO bottleneck and delayed by a fixed one-way propagation delay.
//! A drop-tail queue limit produces losses, and ECT(1) packets that wait in
//! the queue longer than [`CE_MARKING_THRESHOLD`] are CE marked, like an L4S
//! step marker would do. Feedback is produced every `feedback_interval` and
//! covers every packet whose arrival could have been reported back by then.

#![allow(dead_code)]

use std::collections::VecDeque;

use rtc_congestion::{EcnMarking, PacketResult, SentPacket, TransportPacketsFeedback};
use units::{DataRate, DataSize, TimeDelta, Timestamp};

pub const START_TIME: Timestamp = Timestamp::from_seconds(1_234);
pub const CE_MARKING_THRESHOLD: TimeDelta = TimeDelta::from_millis(2);
const MIN_SEND_RATE: DataRate = DataRate::from_kbps(10);

#[derive(Debug, Copy, Clone)]
pub struct NetworkConfig {
    /// One-way propagation delay, in both directions.
    pub queue_delay_ms: i64,
    pub link_capacity: DataRate,
    /// Drop-tail limit in packets, 0 for an unlimited queue.
    pub queue_length_packets: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            queue_delay_ms: 0,
            link_capacity: DataRate::plus_infinity(),
            queue_length_packets: 0,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Config {
    pub network_config: NetworkConfig,
    pub send_as_ect1: bool,
    pub packet_size: DataSize,
    pub feedback_interval: TimeDelta,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_config: NetworkConfig::default(),
            send_as_ect1: false,
            packet_size: DataSize::from_bytes(1000),
            feedback_interval: TimeDelta::from_millis(25),
        }
    }
}

struct InFlightPacket {
    result: PacketResult,
    /// When the sender can learn about the packet's fate.
    reported_at: Timestamp,
}

pub struct CcFeedbackGenerator {
    config: Config,
    now: Timestamp,
    next_sequence_number: i64,
    last_send_time: Timestamp,
    link_free_at: Timestamp,
    /// Departure times of packets still queued or being serialized.
    queue: VecDeque<Timestamp>,
    in_flight: VecDeque<InFlightPacket>,
    smoothed_rtt: Option<TimeDelta>,
}

impl CcFeedbackGenerator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            now: START_TIME,
            next_sequence_number: 0,
            last_send_time: Timestamp::minus_infinity(),
            link_free_at: Timestamp::minus_infinity(),
            queue: VecDeque::new(),
            in_flight: VecDeque::new(),
            smoothed_rtt: None,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    fn propagation_delay(&self) -> TimeDelta {
        TimeDelta::from_millis(self.config.network_config.queue_delay_ms)
    }

    /// Sends at `send_rate` for one feedback interval at a time until a
    /// feedback report with at least one packet can be produced.
    pub fn process_until_next_feedback(&mut self, send_rate: DataRate) -> TransportPacketsFeedback {
        loop {
            let interval_start = self.now;
            self.now += self.config.feedback_interval;
            self.send_packets(interval_start, send_rate.max(MIN_SEND_RATE));
            if let Some(feedback) = self.create_feedback() {
                return feedback;
            }
        }
    }

    fn send_packets(&mut self, interval_start: Timestamp, send_rate: DataRate) {
        let packet_interval = self.config.packet_size / send_rate;
        let mut send_time = (self.last_send_time + packet_interval).max(interval_start);
        while send_time < self.now {
            self.send_packet(send_time);
            self.last_send_time = send_time;
            send_time += packet_interval;
        }
    }

    fn send_packet(&mut self, send_time: Timestamp) {
        let network = self.config.network_config;
        let size = self.config.packet_size;
        let sent_packet = SentPacket {
            send_time,
            size,
            sequence_number: self.next_sequence_number,
            ..Default::default()
        };
        self.next_sequence_number += 1;

        while self.queue.front().is_some_and(|&departure| departure <= send_time) {
            self.queue.pop_front();
        }
        let ecn = if self.config.send_as_ect1 {
            EcnMarking::Ect1
        } else {
            EcnMarking::NotEct
        };

        if network.queue_length_packets > 0 && self.queue.len() >= network.queue_length_packets {
            // The receiver notices the gap when the next packet arrives.
            self.in_flight.push_back(InFlightPacket {
                result: PacketResult {
                    sent_packet,
                    receive_time: Timestamp::plus_infinity(),
                    ecn,
                    ..Default::default()
                },
                reported_at: send_time + self.propagation_delay() * 2,
            });
            return;
        }

        let start = send_time.max(self.link_free_at);
        let departure = start + size / network.link_capacity;
        self.link_free_at = departure;
        self.queue.push_back(departure);

        let receive_time = departure + self.propagation_delay();
        let ecn = if ecn == EcnMarking::Ect1 && start - send_time > CE_MARKING_THRESHOLD {
            EcnMarking::Ce
        } else {
            ecn
        };
        self.in_flight.push_back(InFlightPacket {
            result: PacketResult {
                sent_packet,
                receive_time,
                ecn,
                ..Default::default()
            },
            reported_at: receive_time + self.propagation_delay(),
        });
    }

    fn create_feedback(&mut self) -> Option<TransportPacketsFeedback> {
        let now = self.now;
        let (reported, in_flight): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|packet| packet.reported_at <= now);
        self.in_flight = in_flight.into();
        if reported.is_empty() {
            return None;
        }

        for packet in reported.iter().filter(|packet| packet.result.is_received()) {
            let rtt = packet.reported_at - packet.result.sent_packet.send_time;
            self.smoothed_rtt = Some(match self.smoothed_rtt {
                Some(smoothed_rtt) => smoothed_rtt * (7.0 / 8.0) + rtt * (1.0 / 8.0),
                None => rtt,
            });
        }

        let data_in_flight = self
            .in_flight
            .iter()
            .fold(DataSize::zero(), |acc, packet| acc + packet.result.sent_packet.size);

        Some(TransportPacketsFeedback {
            feedback_time: now,
            smoothed_rtt: self
                .smoothed_rtt
                .unwrap_or(self.propagation_delay() * 2),
            data_in_flight,
            transport_supports_ecn: self.config.send_as_ect1,
            packet_feedbacks: reported.into_iter().map(|packet| packet.result).collect(),
            ..Default::default()
        })
    }
}
