//! Last issued (timestamp, sequence) pair packed into one word
//!
//! The timestamp needs at most 41 bits and the sequence at most 16, so both
//! fit in a u64 and advance together under a single compare-and-swap.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct State(u64);

impl State {
    pub const SEQ_BITS: u32 = 16;
    pub const SEQ_MASK: u64 = (1 << Self::SEQ_BITS) - 1;

    /// Nothing issued yet
    pub const EMPTY: State = State(0);

    #[inline(always)]
    pub const fn new(timestamp: u64, sequence: u16) -> Self {
        Self((timestamp << Self::SEQ_BITS) | (sequence as u64))
    }

    #[inline(always)]
    pub const fn timestamp(self) -> u64 {
        self.0 >> Self::SEQ_BITS
    }

    #[inline(always)]
    pub const fn sequence(self) -> u16 {
        (self.0 & Self::SEQ_MASK) as u16
    }

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Same millisecond, next sequence slot
    #[inline(always)]
    pub const fn bump(self) -> Self {
        Self::new(self.timestamp(), self.sequence() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_width_timestamp() {
        let ts = (1u64 << 41) - 1;
        let state = State::new(ts, 4095);
        assert_eq!(state.timestamp(), ts);
        assert_eq!(state.sequence(), 4095);
        assert_eq!(State::from_raw(state.raw()), state);
    }

    #[test]
    fn test_bump_keeps_timestamp() {
        let state = State::new(77, 3).bump();
        assert_eq!(state.timestamp(), 77);
        assert_eq!(state.sequence(), 4);
    }

    #[test]
    fn test_empty() {
        assert_eq!(State::EMPTY.raw(), 0);
        assert_eq!(State::EMPTY.timestamp(), 0);
        assert_eq!(State::EMPTY.sequence(), 0);
    }
}
