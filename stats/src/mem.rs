use serde::{Deserialize, Serialize};

/// Backing store traffic.
///
/// Counts the requests issued by the cache controller, not the ticks
/// during which a request was held asserted.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub reads: u64,
    pub writes: u64,
}

impl Memory {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.reads + self.writes
    }
}

impl std::ops::AddAssign for Memory {
    fn add_assign(&mut self, other: Self) {
        self.reads += other.reads;
        self.writes += other.writes;
    }
}
