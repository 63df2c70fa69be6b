use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

/// Transaction ids accepted by the gateway: six digits, `000000`..=`899999`.
const TRANS_ID_RANGE: u64 = 900_000;

/// Per-process generator of `vads_trans_id` values.
///
/// A random seed plus a monotonic counter: ids from one process never repeat
/// within `TRANS_ID_RANGE` calls, and two processes start far apart.
#[derive(Debug)]
pub struct TransIdGenerator {
    seed: u32,
    counter: AtomicU32,
}

impl TransIdGenerator {
    pub fn new() -> Self {
        let seed = rand::thread_rng().gen_range(0..TRANS_ID_RANGE as u32);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            counter: AtomicU32::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let value = (u64::from(self.seed) + u64::from(n)) % TRANS_ID_RANGE;
        format!("{:06}", value)
    }
}

impl Default for TransIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
