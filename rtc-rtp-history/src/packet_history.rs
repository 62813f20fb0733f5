//! Sent packet store for NACK retransmission and payload padding.

use std::collections::VecDeque;

use log::{debug, warn};
use units::{TimeDelta, Timestamp};

use crate::packet_to_send::RtpPacketToSend;
use crate::sequence::{is_newer_sequence_number, sequence_number_diff};

/// How the history retains packets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    /// Nothing is stored.
    #[default]
    Disabled,
    /// Kept for compatibility, behaves like [`StorageMode::StoreAndCull`].
    Store,
    /// Store packets and cull them once they are old enough.
    StoreAndCull,
}

/// How [`RtpPacketHistory::get_payload_padding_packet`] picks a packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PaddingMode {
    /// The most recently stored packet, unless it is pending retransmission.
    #[default]
    Default,
    /// A recent packet with a payload close to the largest seen. The same
    /// packet may be handed out any number of times.
    RecentLargePacket,
}

#[derive(Debug)]
struct StoredPacket {
    packet: RtpPacketToSend,
    /// When the packet was first put on the wire. Retention is measured
    /// from here.
    send_time: Timestamp,
    /// Last time the packet was sent as a retransmission or as padding.
    last_transmission: Timestamp,
    /// Handed out by `get_packet_and_mark_as_pending` and not yet sent.
    pending_transmission: bool,
    times_retransmitted: usize,
}

/// Bounded store of sent RTP packets keyed by sequence number.
///
/// Packets are kept in a deque where slot `i` holds the packet with sequence
/// number `first + i`, `first` being the sequence number at the front. Acked
/// packets leave an empty slot behind, and both ends of the deque are
/// always occupied.
///
/// The history never reads a clock. Every operation whose outcome depends on
/// time takes the current time as an argument, `put_rtp_packet` uses the send
/// time it is given.
#[derive(Debug)]
pub struct RtpPacketHistory {
    padding_mode: PaddingMode,
    mode: StorageMode,
    number_to_store: usize,
    rtt: Option<TimeDelta>,
    packet_history: VecDeque<Option<StoredPacket>>,
    large_payload_packet: Option<RtpPacketToSend>,
    /// Largest payload seen since the last sequence number gap. Candidates
    /// are measured against it, not against the previous candidate.
    largest_recent_payload_size: usize,
}

impl Default for RtpPacketHistory {
    fn default() -> Self {
        Self::new(PaddingMode::Default)
    }
}

impl RtpPacketHistory {
    /// Absolute upper bound on the number of slots, whatever was configured.
    pub const MAX_CAPACITY: usize = 9600;
    /// Shortest time a packet is kept.
    pub const MIN_PACKET_DURATION: TimeDelta = TimeDelta::from_seconds(1);
    /// Packets are kept at least this many RTTs.
    pub const MIN_PACKET_DURATION_RTT: i64 = 3;
    /// Packets older than this many retention durations are culled even when
    /// the history is not full.
    pub const PACKET_CULLING_DELAY_FACTOR: i64 = 3;
    /// A new packet replaces the padding candidate when its payload is at
    /// least this share of the largest recent payload.
    pub const PADDING_SIZE_TOLERANCE: f64 = 0.95;
    /// A new packet this far ahead of the padding candidate replaces it
    /// whatever its size.
    pub const LARGE_PACKET_SEQUENCE_GAP: u16 = 1000;

    pub fn new(padding_mode: PaddingMode) -> Self {
        Self {
            padding_mode,
            mode: StorageMode::Disabled,
            number_to_store: 0,
            rtt: None,
            packet_history: VecDeque::new(),
            large_payload_packet: None,
            largest_recent_payload_size: 0,
        }
    }

    /// Sets the storage mode and the number of packets to keep. Any stored
    /// packets are dropped, even if the mode does not change.
    pub fn set_store_packets_status(&mut self, mode: StorageMode, number_to_store: usize) {
        if mode != StorageMode::Disabled && self.mode != StorageMode::Disabled {
            debug!("purging packet history to re-set storage mode {mode:?}");
        } else {
            debug!("packet history storage mode {:?} -> {mode:?}", self.mode);
        }
        self.clear();
        self.mode = mode;
        self.number_to_store = number_to_store.min(Self::MAX_CAPACITY);
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    pub fn padding_mode(&self) -> PaddingMode {
        self.padding_mode
    }

    /// Sets the RTT used for resend gating and retention. Packets that become
    /// old enough under the new retention are culled.
    pub fn set_rtt(&mut self, rtt: TimeDelta, now: Timestamp) {
        debug_assert!(rtt >= TimeDelta::zero());
        self.rtt = Some(rtt);
        if self.mode != StorageMode::Disabled {
            self.cull_old_packets(now);
        }
    }

    /// Stores a packet that was sent at `send_time`.
    ///
    /// The packet is dropped when storage is disabled or the packet does not
    /// allow retransmission. A sequence number must not be put again while
    /// it is still stored. If that happens the old packet is replaced.
    pub fn put_rtp_packet(&mut self, packet: RtpPacketToSend, send_time: Timestamp) {
        if self.mode == StorageMode::Disabled || !packet.allow_retransmission {
            return;
        }

        self.cull_old_packets(send_time);

        let sequence_number = packet.sequence_number;
        let mut index = self.packet_index(sequence_number);
        if self.stored_packet(sequence_number).is_some() {
            warn!("duplicate packet inserted: {sequence_number}");
            self.remove_packet(index as usize);
            index = self.packet_index(sequence_number);
        }

        // Grow towards the new sequence number at either end.
        while index < 0 {
            self.packet_history.push_front(None);
            index += 1;
        }
        let index = index as usize;
        while self.packet_history.len() <= index {
            self.packet_history.push_back(None);
        }

        if self.padding_mode == PaddingMode::RecentLargePacket {
            self.update_large_payload_packet(&packet);
        }

        self.packet_history[index] = Some(StoredPacket {
            packet,
            send_time,
            last_transmission: send_time,
            pending_transmission: false,
            times_retransmitted: 0,
        });
    }

    /// Whether a packet with this sequence number is stored.
    pub fn get_packet_state(&self, sequence_number: u16) -> bool {
        self.mode != StorageMode::Disabled && self.stored_packet(sequence_number).is_some()
    }

    /// Returns a copy of the stored packet for retransmission and marks it as
    /// pending until [`mark_packet_as_sent`](Self::mark_packet_as_sent) is
    /// called.
    ///
    /// Returns `None` when the packet is not stored, already pending, or was
    /// retransmitted less than one RTT ago.
    pub fn get_packet_and_mark_as_pending(
        &mut self,
        sequence_number: u16,
        now: Timestamp,
    ) -> Option<RtpPacketToSend> {
        self.get_packet_and_mark_as_pending_with(sequence_number, now, |packet| {
            Some(packet.clone())
        })
    }

    /// Like [`get_packet_and_mark_as_pending`](Self::get_packet_and_mark_as_pending),
    /// but the returned packet is built by `encapsulate`, for example an RTX
    /// packet. If `encapsulate` returns `None` the packet is not marked as
    /// pending.
    pub fn get_packet_and_mark_as_pending_with<F>(
        &mut self,
        sequence_number: u16,
        now: Timestamp,
        encapsulate: F,
    ) -> Option<RtpPacketToSend>
    where
        F: FnOnce(&RtpPacketToSend) -> Option<RtpPacketToSend>,
    {
        if self.mode == StorageMode::Disabled {
            return None;
        }
        let rtt = self.rtt;
        let stored = self.stored_packet_mut(sequence_number)?;
        if stored.pending_transmission || !verify_rtt(stored, rtt, now) {
            return None;
        }

        let packet = encapsulate(&stored.packet)?;
        stored.pending_transmission = true;
        Some(packet)
    }

    /// Records that a pending retransmission of the packet left the pacer.
    pub fn mark_packet_as_sent(&mut self, sequence_number: u16, now: Timestamp) {
        if self.mode == StorageMode::Disabled {
            return;
        }
        if let Some(stored) = self.stored_packet_mut(sequence_number) {
            stored.last_transmission = now;
            stored.pending_transmission = false;
            stored.times_retransmitted += 1;
        }
    }

    /// Removes packets the receiver has acknowledged. Pending packets stay
    /// until they are sent.
    pub fn cull_acknowledged_packets(&mut self, sequence_numbers: &[u16]) {
        for &sequence_number in sequence_numbers {
            if self
                .stored_packet(sequence_number)
                .is_some_and(|stored| !stored.pending_transmission)
            {
                let index = self.packet_index(sequence_number);
                self.remove_packet(index as usize);
            }
        }
    }

    /// Picks a stored packet to resend as payload padding.
    pub fn get_payload_padding_packet(&mut self, now: Timestamp) -> Option<RtpPacketToSend> {
        self.get_payload_padding_packet_with(now, |packet| Some(packet.clone()))
    }

    /// Like [`get_payload_padding_packet`](Self::get_payload_padding_packet),
    /// but the returned packet is built by `encapsulate`. If `encapsulate`
    /// returns `None` nothing is recorded.
    pub fn get_payload_padding_packet_with<F>(
        &mut self,
        now: Timestamp,
        encapsulate: F,
    ) -> Option<RtpPacketToSend>
    where
        F: FnOnce(&RtpPacketToSend) -> Option<RtpPacketToSend>,
    {
        if self.mode == StorageMode::Disabled {
            return None;
        }

        if self.padding_mode == PaddingMode::RecentLargePacket
            && let Some(large_payload_packet) = &self.large_payload_packet
        {
            return encapsulate(large_payload_packet);
        }

        let best = self.packet_history.back_mut()?.as_mut()?;
        if best.pending_transmission {
            // Already queued for retransmission, it goes out on that path.
            return None;
        }

        let packet = encapsulate(&best.packet)?;
        best.last_transmission = now;
        best.times_retransmitted += 1;
        Some(packet)
    }

    /// Drops every stored packet. The storage mode and RTT are kept.
    pub fn clear(&mut self) {
        self.packet_history.clear();
        self.large_payload_packet = None;
        self.largest_recent_payload_size = 0;
    }

    /// Number of stored packets.
    pub fn len(&self) -> usize {
        self.packet_history.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.packet_history.iter().all(Option::is_none)
    }

    fn packet_duration(&self) -> TimeDelta {
        match self.rtt {
            Some(rtt) => (rtt * Self::MIN_PACKET_DURATION_RTT).max(Self::MIN_PACKET_DURATION),
            None => Self::MIN_PACKET_DURATION,
        }
    }

    fn cull_old_packets(&mut self, now: Timestamp) {
        let packet_duration = self.packet_duration();
        while let Some(front) = self.packet_history.front() {
            if self.packet_history.len() >= Self::MAX_CAPACITY {
                // Hard limit, the oldest slot goes even if it is pending.
                self.remove_packet(0);
                continue;
            }

            let Some(stored) = front else {
                self.packet_history.pop_front();
                continue;
            };
            if stored.pending_transmission {
                return;
            }
            if stored.send_time + packet_duration > now {
                return;
            }

            if self.packet_history.len() >= self.number_to_store
                || stored.send_time + packet_duration * Self::PACKET_CULLING_DELAY_FACTOR <= now
            {
                self.remove_packet(0);
            } else {
                return;
            }
        }
    }

    fn update_large_payload_packet(&mut self, packet: &RtpPacketToSend) {
        let payload_size = packet.payload_size();
        let after_gap = self.large_payload_packet.as_ref().is_none_or(|large| {
            is_newer_sequence_number(
                packet.sequence_number,
                large
                    .sequence_number
                    .wrapping_add(Self::LARGE_PACKET_SEQUENCE_GAP),
            )
        });
        if after_gap {
            self.largest_recent_payload_size = payload_size;
        } else {
            self.largest_recent_payload_size = self.largest_recent_payload_size.max(payload_size);
        }

        if after_gap
            || payload_size as f64
                >= self.largest_recent_payload_size as f64 * Self::PADDING_SIZE_TOLERANCE
        {
            self.large_payload_packet = Some(packet.clone());
        }
    }

    /// Position of `sequence_number` relative to the front slot. May be
    /// negative or past the end.
    fn packet_index(&self, sequence_number: u16) -> i32 {
        match self.packet_history.front() {
            Some(Some(first)) => sequence_number_diff(sequence_number, first.packet.sequence_number),
            _ => 0,
        }
    }

    fn stored_packet(&self, sequence_number: u16) -> Option<&StoredPacket> {
        let index = usize::try_from(self.packet_index(sequence_number)).ok()?;
        self.packet_history.get(index)?.as_ref()
    }

    fn stored_packet_mut(&mut self, sequence_number: u16) -> Option<&mut StoredPacket> {
        let index = usize::try_from(self.packet_index(sequence_number)).ok()?;
        self.packet_history.get_mut(index)?.as_mut()
    }

    fn remove_packet(&mut self, index: usize) -> Option<RtpPacketToSend> {
        let removed = self.packet_history.get_mut(index)?.take();
        while matches!(self.packet_history.front(), Some(None)) {
            self.packet_history.pop_front();
        }
        while matches!(self.packet_history.back(), Some(None)) {
            self.packet_history.pop_back();
        }
        removed.map(|stored| stored.packet)
    }
}

/// A packet that was already retransmitted is not sent again within one RTT
/// of its last transmission.
fn verify_rtt(stored: &StoredPacket, rtt: Option<TimeDelta>, now: Timestamp) -> bool {
    match rtt {
        Some(rtt) if stored.times_retransmitted > 0 => now - stored.last_transmission >= rtt,
        _ => true,
    }
}
