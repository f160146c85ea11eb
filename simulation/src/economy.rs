//! Default gold and lives bookkeeping.

use lane_defence_core::EconomySink;

/// Match economy owned by the simulation unless another sink is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Treasury {
    gold: u32,
    lives: u32,
}

impl Treasury {
    /// Creates a treasury with the stage's starting gold and lives.
    #[must_use]
    pub fn new(gold: u32, lives: u32) -> Self {
        Self { gold, lives }
    }
}

impl EconomySink for Treasury {
    fn gold(&self) -> u32 {
        self.gold
    }

    fn lives(&self) -> u32 {
        self.lives
    }

    fn try_spend_gold(&mut self, amount: u32) -> bool {
        match self.gold.checked_sub(amount) {
            Some(remaining) => {
                self.gold = remaining;
                true
            }
            None => false,
        }
    }

    fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    fn damage_lives(&mut self, amount: u32) {
        self.lives = self.lives.saturating_sub(amount);
    }
}
