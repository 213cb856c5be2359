use crate::event::Event;
use dmxpro_protocol::Label;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Why a message was dropped before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Declared payload length exceeded the protocol limit
    LengthTooLarge,
    /// Byte after the payload was not the end delimiter
    BadEndDelimiter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FrameOutcome {
    Accepted(Event),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub label: Label,
    pub label_byte: u8,
    pub length: u16,
    pub outcome: FrameOutcome,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<FrameRecord>,
    next_sequence: u64,
}

/// Bounded record of messages seen by a processor.
///
/// Shared between the processor and whoever reports on it; the oldest
/// record is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct FrameLog {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl FrameLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(capacity.clamp(1, 4096)),
                next_sequence: 0,
            }),
        }
    }

    pub fn append(&self, label_byte: u8, length: u16, outcome: FrameOutcome) -> u64 {
        let mut guard = self.inner.lock();
        let sequence = guard.next_sequence;
        guard.next_sequence += 1;
        if guard.records.len() == self.capacity {
            guard.records.pop_front();
        }
        guard.records.push_back(FrameRecord {
            sequence,
            timestamp_ms: now_millis(),
            label: Label::from_byte(label_byte),
            label_byte,
            length,
            outcome,
        });
        sequence
    }

    pub fn records(&self) -> Vec<FrameRecord> {
        self.inner.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total records ever appended, including evicted ones
    pub fn total(&self) -> u64 {
        self.inner.lock().next_sequence
    }

    pub fn clear(&self) {
        self.inner.lock().records.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records())
    }
}

impl Default for FrameLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
