//! Button Sequence
//!
//! The growing list of buttons both players must reproduce.
//!
//! The sequence is append-only. A cursor walks it during a replay; when the
//! cursor sits one past the last value it points at the open slot, and the
//! next press there extends the sequence instead of being compared.

use crate::game::action::Button;

/// Result of judging one press against the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Judgement {
    /// The press filled the open slot. A new round begins and roles swap.
    NewRound,
    /// The press matched the value under the cursor.
    Correct,
    /// The press did not match. The match is over.
    Mismatch {
        /// Value that was expected.
        expected: Button,
        /// Replay position that was being checked.
        position: usize,
    },
}

impl Judgement {
    /// Whether the press was accepted (and the deadline should be reset).
    #[inline]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Judgement::Mismatch { .. })
    }
}

/// Append-only button sequence with a replay cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    values: Vec<Button>,
    cursor: usize,
}

impl Sequence {
    /// Empty sequence with the cursor on the open slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of confirmed values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True before the first press of the match.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current replay position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value the cursor expects next, or `None` at the open slot.
    pub fn expected(&self) -> Option<Button> {
        self.values.get(self.cursor).copied()
    }

    /// Confirmed values in order.
    pub fn values(&self) -> &[Button] {
        &self.values
    }

    /// Judge a press and advance the cursor.
    ///
    /// A mismatch leaves the sequence untouched; it is never truncated.
    pub fn press(&mut self, button: Button) -> Judgement {
        match self.expected() {
            None => {
                self.values.push(button);
                self.cursor = 0;
                Judgement::NewRound
            }
            Some(expected) if expected == button => {
                self.cursor += 1;
                Judgement::Correct
            }
            Some(expected) => Judgement::Mismatch {
                expected,
                position: self.cursor,
            },
        }
    }
}
