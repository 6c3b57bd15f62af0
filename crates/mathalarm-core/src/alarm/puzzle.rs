//! Arithmetic dismissal gate.
//!
//! A ringing alarm can only be dismissed by answering a streak of
//! multiplication problems in a row. A wrong answer wipes the streak and the
//! caller has to draw a fresh challenge. There is no cancel outcome: the only
//! way out of a session is [`Outcome::Solved`].
//!
//! Challenge generation is a pure function of the random source; the streak
//! lives in an explicit [`PuzzleSession`] value owned by the caller.

use serde::{Deserialize, Serialize};

use crate::ports::ChallengeSource;

pub const DEFAULT_REQUIRED_STREAK: u32 = 3;
pub const DEFAULT_OPERAND_MIN: u32 = 1;
pub const DEFAULT_OPERAND_MAX: u32 = 20;

/// One `a * b` problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub a: u32,
    pub b: u32,
    pub expected: u64,
}

impl Challenge {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            a,
            b,
            expected: a as u64 * b as u64,
        }
    }

    pub fn is_correct(&self, answer: i64) -> bool {
        answer >= 0 && answer as u64 == self.expected
    }
}

impl std::fmt::Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} * {}", self.a, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    /// Terminal. The alarm may be dismissed.
    Solved,
}

/// Rules shared by every session: operand range and streak target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleGate {
    pub operand_min: u32,
    pub operand_max: u32,
    pub required_streak: u32,
}

impl Default for PuzzleGate {
    fn default() -> Self {
        Self {
            operand_min: DEFAULT_OPERAND_MIN,
            operand_max: DEFAULT_OPERAND_MAX,
            required_streak: DEFAULT_REQUIRED_STREAK,
        }
    }
}

impl PuzzleGate {
    /// Draw both operands independently. Repeats are allowed.
    pub fn new_challenge<R: ChallengeSource + ?Sized>(&self, source: &mut R) -> Challenge {
        let a = source.draw(self.operand_min, self.operand_max);
        let b = source.draw(self.operand_min, self.operand_max);
        Challenge::new(a, b)
    }

    /// Open a session with a freshly drawn first challenge.
    pub fn open<R: ChallengeSource + ?Sized>(&self, source: &mut R) -> PuzzleSession {
        PuzzleSession::new(self.new_challenge(source), self.required_streak)
    }
}

/// State of one dismissal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSession {
    challenge: Challenge,
    correct_streak: u32,
    required_streak: u32,
    solved: bool,
}

impl PuzzleSession {
    pub fn new(challenge: Challenge, required_streak: u32) -> Self {
        Self {
            challenge,
            correct_streak: 0,
            required_streak: required_streak.max(1),
            solved: false,
        }
    }

    pub fn challenge(&self) -> Challenge {
        self.challenge
    }

    pub fn correct_streak(&self) -> u32 {
        self.correct_streak
    }

    pub fn required_streak(&self) -> u32 {
        self.required_streak
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Check an answer against the current challenge.
    ///
    /// After `Correct` or `Incorrect` the caller installs the next challenge
    /// with [`next_challenge`](Self::next_challenge). Once solved, further
    /// submissions keep returning `Solved`.
    pub fn submit(&mut self, answer: i64) -> Outcome {
        if self.solved {
            return Outcome::Solved;
        }
        if !self.challenge.is_correct(answer) {
            self.correct_streak = 0;
            return Outcome::Incorrect;
        }
        self.correct_streak += 1;
        if self.correct_streak >= self.required_streak {
            self.solved = true;
            Outcome::Solved
        } else {
            Outcome::Correct
        }
    }

    /// Replace the current challenge. Ignored once the session is solved.
    pub fn next_challenge(&mut self, challenge: Challenge) {
        if !self.solved {
            self.challenge = challenge;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ScriptedSource;
    use proptest::prelude::*;

    fn session(a: u32, b: u32) -> PuzzleSession {
        PuzzleSession::new(Challenge::new(a, b), DEFAULT_REQUIRED_STREAK)
    }

    /// Answer the current challenge correctly and install `next`.
    fn answer_right(s: &mut PuzzleSession, next: Challenge) -> Outcome {
        let out = s.submit(s.challenge().expected as i64);
        s.next_challenge(next);
        out
    }

    #[test]
    fn challenge_expected_is_product() {
        let c = Challenge::new(7, 13);
        assert_eq!(c.expected, 91);
        assert!(c.is_correct(91));
        assert!(!c.is_correct(90));
        assert!(!c.is_correct(-91));
        assert_eq!(c.to_string(), "7 * 13");
    }

    #[test]
    fn gate_draws_operands_from_source() {
        let gate = PuzzleGate::default();
        let mut src = ScriptedSource::new([4, 5]);
        let c = gate.new_challenge(&mut src);
        assert_eq!((c.a, c.b, c.expected), (4, 5, 20));
    }

    #[test]
    fn three_in_a_row_solves() {
        let mut s = session(2, 3);
        assert_eq!(answer_right(&mut s, Challenge::new(4, 4)), Outcome::Correct);
        assert_eq!(answer_right(&mut s, Challenge::new(5, 5)), Outcome::Correct);
        assert_eq!(s.submit(25), Outcome::Solved);
        assert!(s.is_solved());
    }

    #[test]
    fn two_right_one_wrong_then_three_right() {
        let mut s = session(2, 3);
        assert_eq!(answer_right(&mut s, Challenge::new(3, 3)), Outcome::Correct);
        assert_eq!(answer_right(&mut s, Challenge::new(4, 4)), Outcome::Correct);
        assert_eq!(s.submit(0), Outcome::Incorrect);
        s.next_challenge(Challenge::new(6, 7));

        // Progress from the first run is gone.
        assert_eq!(answer_right(&mut s, Challenge::new(2, 2)), Outcome::Correct);
        assert_eq!(answer_right(&mut s, Challenge::new(8, 3)), Outcome::Correct);
        assert!(!s.is_solved());
        assert_eq!(s.submit(24), Outcome::Solved);
    }

    #[test]
    fn solved_session_stays_solved() {
        let mut s = PuzzleSession::new(Challenge::new(1, 1), 1);
        assert_eq!(s.submit(1), Outcome::Solved);
        s.next_challenge(Challenge::new(9, 9));
        assert_eq!(s.challenge(), Challenge::new(1, 1));
        assert_eq!(s.submit(12345), Outcome::Solved);
    }

    #[test]
    fn zero_streak_target_is_clamped() {
        let s = PuzzleSession::new(Challenge::new(1, 1), 0);
        assert_eq!(s.required_streak(), 1);
    }

    proptest! {
        #[test]
        fn wrong_answer_resets_any_prior_streak(prior in 0u32..3, wrong in 1i64..1000) {
            let mut s = session(2, 3);
            for _ in 0..prior {
                prop_assert_eq!(answer_right(&mut s, Challenge::new(2, 3)), Outcome::Correct);
            }
            prop_assert_eq!(s.correct_streak(), prior);
            prop_assert_eq!(s.submit(6 + wrong), Outcome::Incorrect);
            prop_assert_eq!(s.correct_streak(), 0);
        }

        #[test]
        fn operands_stay_in_range(seed in any::<u64>()) {
            let gate = PuzzleGate::default();
            let mut src = crate::ports::RngChallengeSource::seeded(seed);
            for _ in 0..50 {
                let c = gate.new_challenge(&mut src);
                prop_assert!((1..=20).contains(&c.a));
                prop_assert!((1..=20).contains(&c.b));
                prop_assert_eq!(c.expected, c.a as u64 * c.b as u64);
            }
        }
    }
}
