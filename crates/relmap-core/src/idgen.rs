//! Client-side key generation.
//!
//! Snowflake ids pack a millisecond timestamp (41 bits, relative to
//! [`SNOWFLAKE_EPOCH_MS`]), a node id (10 bits) and a per-millisecond
//! sequence (12 bits) into a positive `i64`.

use chrono::Utc;
use parking_lot::Mutex;
use relmap_proto::{Value, ValueGeneration};

use crate::datetime;

/// 2020-01-01T00:00:00Z in milliseconds.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_577_836_800_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const NODE_MASK: i64 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: i64,
    sequence: i64,
}

/// Generates values for fields with a client-side generation policy.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: i64,
    state: Mutex<SnowflakeState>,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: i64::from(node_id) & NODE_MASK,
            state: Mutex::new(SnowflakeState::default()),
        }
    }

    /// Value for `policy`, or `None` when the store or caller supplies it.
    pub fn generate(&self, policy: ValueGeneration) -> Option<Value> {
        match policy {
            ValueGeneration::Uuid => Some(Value::String(Self::uuid())),
            ValueGeneration::Snowflake => Some(Value::Int64(self.next_snowflake())),
            ValueGeneration::DateTime => Some(Value::DateTime(datetime::now())),
            ValueGeneration::Customer | ValueGeneration::AutoIncrement => None,
        }
    }

    /// Random UUID v4 in hyphenated text form.
    pub fn uuid() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Next snowflake id, strictly increasing per generator.
    pub fn next_snowflake(&self) -> i64 {
        let mut state = self.state.lock();
        let mut now = Utc::now().timestamp_millis() - SNOWFLAKE_EPOCH_MS;
        if now < state.last_ms {
            // Clock went backwards; keep issuing from the last timestamp.
            now = state.last_ms;
        }

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                now = state.last_ms + 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        (now << (NODE_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | state.sequence
    }

    /// Node id bits of a snowflake id.
    pub fn node_of(id: i64) -> u16 {
        ((id >> SEQUENCE_BITS) & NODE_MASK) as u16
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_NODE_ID)
    }
}
