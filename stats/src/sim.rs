use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sim {
    /// Number of simulated clock ticks.
    pub cycles: u64,
    /// Number of requests that completed (pulsed ready).
    pub completed: u64,
    /// Number of requests abandoned by a reset.
    pub abandoned: u64,
    /// Number of resets.
    pub resets: u64,
}

impl std::ops::AddAssign for Sim {
    fn add_assign(&mut self, other: Self) {
        self.cycles += other.cycles;
        self.completed += other.completed;
        self.abandoned += other.abandoned;
        self.resets += other.resets;
    }
}
