use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Custom epoch: 2024-01-01T00:00:00Z
const EPOCH_MS: i64 = 1_704_067_200_000;

const NODE_BITS: u8 = 10;
const SEQ_BITS: u8 = 12;
const NODE_MAX: i64 = (1 << NODE_BITS) - 1;
const SEQ_MASK: i64 = (1 << SEQ_BITS) - 1;
const TIME_SHIFT: u8 = NODE_BITS + SEQ_BITS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnowflakeError {
    #[error("node id must be between 0 and {NODE_MAX}, got {0}")]
    NodeOutOfRange(i64),
}

#[derive(Debug)]
struct State {
    last_ms: i64,
    sequence: i64,
}

/// Per-process generator of 64-bit time-ordered IDs.
/// Format: 41 bits timestamp | 10 bits node | 12 bits sequence.
///
/// Constructed once at startup with the instance's node id and handed to
/// the hub; `generate` never fails.
#[derive(Debug)]
pub struct Snowflake {
    node: i64,
    state: Mutex<State>,
}

impl Snowflake {
    pub fn new(node: i64) -> Result<Snowflake, SnowflakeError> {
        if !(0..=NODE_MAX).contains(&node) {
            return Err(SnowflakeError::NodeOutOfRange(node));
        }
        Ok(Snowflake {
            node,
            state: Mutex::new(State {
                last_ms: 0,
                sequence: 0,
            }),
        })
    }

    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock().unwrap();

        let mut now = current_millis();
        // Clock went backwards: keep issuing against the last observed
        // millisecond so IDs never decrease.
        if now < state.last_ms {
            now = state.last_ms;
        }

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQ_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond; spin until the
                // wall clock moves past it.
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = current_millis();
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now;
        ((now - EPOCH_MS) << TIME_SHIFT) | (self.node << SEQ_BITS) | state.sequence
    }
}

/// Extract the Unix timestamp (ms) from a generated id.
pub fn timestamp_millis(id: i64) -> i64 {
    (id >> TIME_SHIFT) + EPOCH_MS
}

fn current_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn rejects_out_of_range_nodes() {
        assert_eq!(
            Snowflake::new(-1).unwrap_err(),
            SnowflakeError::NodeOutOfRange(-1)
        );
        assert_eq!(
            Snowflake::new(1024).unwrap_err(),
            SnowflakeError::NodeOutOfRange(1024)
        );
        assert!(Snowflake::new(0).is_ok());
        assert!(Snowflake::new(1023).is_ok());
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let node = Snowflake::new(1).expect("node");
        let mut last = node.generate();
        for _ in 0..5_000 {
            let id = node.generate();
            assert!(id > last, "id {id} did not exceed {last}");
            last = id;
        }
    }

    #[test]
    fn same_millisecond_ids_differ_only_in_sequence() {
        let node = Snowflake::new(3).expect("node");
        // Generate a burst; at least two will land in the same millisecond.
        let ids: Vec<i64> = (0..64).map(|_| node.generate()).collect();
        let mut checked = false;
        for pair in ids.windows(2) {
            if pair[0] >> TIME_SHIFT == pair[1] >> TIME_SHIFT {
                assert_eq!((pair[1] & SEQ_MASK) - (pair[0] & SEQ_MASK), 1);
                checked = true;
            }
        }
        assert!(checked, "burst never shared a millisecond");
    }

    #[test]
    fn node_bits_carry_the_node_id() {
        let node = Snowflake::new(777).expect("node");
        let id = node.generate();
        assert_eq!((id >> SEQ_BITS) & NODE_MAX, 777);
    }

    #[test]
    fn timestamp_extraction_is_plausible() {
        let node = Snowflake::new(1).expect("node");
        let before = current_millis();
        let id = node.generate();
        let after = current_millis();
        let extracted = timestamp_millis(id);
        assert!(extracted >= before && extracted <= after);
    }

    #[test]
    fn concurrent_generation_yields_unique_ids() {
        let node = Arc::new(Snowflake::new(9).expect("node"));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let node = node.clone();
            handles.push(std::thread::spawn(move || {
                (0..2_000).map(|_| node.generate()).collect::<Vec<i64>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread") {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
    }
}
