use serde::{Deserialize, Serialize};

/// Per-round countdown in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Countdown {
    limit: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.limit - self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Takes one second off; returns what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub fn reset(&mut self, limit: u32) {
        *self = Self::new(limit);
    }
}
