//! Player Actions
//!
//! The fixed press alphabet and the actions a connection delivers to its match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three game buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    /// Button 0.
    Zero = 0,
    /// Button 1.
    One = 1,
    /// Button 2.
    Two = 2,
}

impl Button {
    /// All buttons in index order.
    pub const ALL: [Button; 3] = [Button::Zero, Button::One, Button::Two];

    /// Button for a wire index, if it is in range.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Button::Zero),
            1 => Some(Button::One),
            2 => Some(Button::Two),
            _ => None,
        }
    }

    /// Wire index of this button.
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Something a connection tells its match engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The player pressed a button.
    Press(Button),
    /// The player's connection is gone.
    Disconnect,
}
