//! # Stamped data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A piece of data with the UTC time it was acquired and the reference frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// UTC timestamp at which the data was acquired
    #[serde(with = "ts_milliseconds")]
    pub stamp: DateTime<Utc>,

    /// Name of the frame the data is expressed in, for example `"map"`
    pub frame_id: String,

    /// The data itself
    pub data: T,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Stamped<T> {
    /// Stamp the data with the current time.
    pub fn now<S: Into<String>>(frame_id: S, data: T) -> Self {
        Self {
            stamp: Utc::now(),
            frame_id: frame_id.into(),
            data,
        }
    }

    /// Replace the data, keeping the stamp and frame.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Stamped<U> {
        Stamped {
            stamp: self.stamp,
            frame_id: self.frame_id,
            data: f(self.data),
        }
    }
}
