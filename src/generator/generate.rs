//! ID generation logic
//!
//! `next_id` never waits: a full millisecond is reported to the caller.
//! `generate` waits for the clock instead.

use std::sync::atomic::Ordering;

use super::state::State;
use super::wait::next_backoff;
use super::SnowflakeGenerator;
use crate::error::SnowflakeError;

impl SnowflakeGenerator {
    /// Produce the next id.
    ///
    /// Ids from one generator never repeat and never decrease. If the clock
    /// reads earlier than the last issued millisecond, generation continues
    /// in that millisecond.
    #[inline]
    pub fn next_id(&self) -> Result<i64, SnowflakeError> {
        self.try_next()
            .map_err(|full| SnowflakeError::SequenceExhausted {
                timestamp: full.timestamp(),
            })
    }

    /// Produce the next id, waiting for the next millisecond when the
    /// current one is full
    pub fn generate(&self) -> i64 {
        let mut backoff_ms = 1u64;
        loop {
            match self.try_next() {
                Ok(id) => return id,
                Err(full) => {
                    self.wait_next_millis(full.timestamp(), backoff_ms);
                    backoff_ms = next_backoff(backoff_ms);
                }
            }
        }
    }

    /// Claim a slot, or return the state whose millisecond is full
    fn try_next(&self) -> Result<i64, State> {
        let now = self.now_ms();
        loop {
            let current = self.load_state();

            if now > current.timestamp() {
                if let Some(id) = self.try_claim_millisecond(current, now) {
                    return Ok(id);
                }
                continue;
            }

            if current.sequence() >= self.max_seq {
                return Err(current);
            }
            if let Some(id) = self.try_increment_sequence(current) {
                return Ok(id);
            }
        }
    }

    #[inline(always)]
    fn load_state(&self) -> State {
        State::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Try to claim new millisecond with sequence 0
    #[inline]
    pub(crate) fn try_claim_millisecond(&self, current: State, new_ts: u64) -> Option<i64> {
        self.cas_state(current, State::new(new_ts, 0))
            .then(|| self.assemble_id(new_ts, 0))
    }

    /// Try to take the next sequence slot within the current millisecond
    #[inline]
    pub(crate) fn try_increment_sequence(&self, current: State) -> Option<i64> {
        let next = current.bump();
        self.cas_state(current, next)
            .then(|| self.assemble_id(next.timestamp(), next.sequence()))
    }

    #[inline(always)]
    pub(crate) fn cas_state(&self, expected: State, new: State) -> bool {
        self.state
            .compare_exchange_weak(expected.raw(), new.raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
