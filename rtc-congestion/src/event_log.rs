//! Diagnostic event log.
//!
//! Controllers report their internal state after every update. The log is
//! write-only from the controller's point of view; what happens to the
//! events (dropped, buffered, encoded to disk) is up to the sink.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use units::{DataRate, DataSize, TimeDelta, Timestamp};

/// State of the SCREAMv2 controller after processing one feedback report.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BweUpdateScream {
    pub at_time: Timestamp,
    pub ref_window: DataSize,
    pub data_in_flight: DataSize,
    pub target_rate: DataRate,
    pub smoothed_rtt: TimeDelta,
    pub queue_delay: TimeDelta,
    pub l4s_marked_permille: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum RtcEvent {
    BweUpdateScream(BweUpdateScream),
}

/// Sink for [`RtcEvent`]s.
pub trait RtcEventLog: Send + Sync {
    fn log(&self, event: RtcEvent);
}

/// Discards every event.
#[derive(Default, Debug, Copy, Clone)]
pub struct NullEventLog;

impl RtcEventLog for NullEventLog {
    fn log(&self, _event: RtcEvent) {}
}

/// Keeps every event in memory, in the order it was logged.
#[derive(Default, Debug)]
pub struct MemoryEventLog {
    events: Mutex<Vec<RtcEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events logged so far.
    pub fn events(&self) -> Vec<RtcEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Removes and returns the events logged so far.
    pub fn take(&self) -> Vec<RtcEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RtcEventLog for MemoryEventLog {
    fn log(&self, event: RtcEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
