//! # Contact sensor (bumper) data

use serde::{Deserialize, Serialize};

/// Which bumper segment reported the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bumper {
    Left,
    Centre,
    Right,
}

/// A contact event from the bumper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// The segment which changed state
    pub bumper: Bumper,

    /// True if the segment is pressed (the robot is touching something)
    pub state: bool,
}

impl ContactEvent {
    /// An event describing no contact.
    pub fn released() -> Self {
        Self {
            bumper: Bumper::Centre,
            state: false,
        }
    }

    /// An event describing contact on the given segment.
    pub fn pressed(bumper: Bumper) -> Self {
        Self {
            bumper,
            state: true,
        }
    }
}
