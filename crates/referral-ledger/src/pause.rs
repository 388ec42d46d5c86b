use serde::{Deserialize, Serialize};

use crate::error::RewardError;

/// Global switch blocking every mutating call. Stored referral state is untouched.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CircuitBreaker {
    paused: bool,
}

impl CircuitBreaker {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn ensure_active(&self) -> Result<(), RewardError> {
        if self.paused {
            return Err(RewardError::Paused);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engaged_breaker_rejects() {
        let mut breaker = CircuitBreaker::default();
        breaker.ensure_active().unwrap();
        breaker.set(true);
        assert_eq!(breaker.ensure_active(), Err(RewardError::Paused));
        breaker.set(false);
        assert!(!breaker.is_paused());
        breaker.ensure_active().unwrap();
    }
}
