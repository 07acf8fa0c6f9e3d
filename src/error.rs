//! Error types shared across the kiosk.
//!
//! No variant allocates; everything is `Copy` and, with the `defmt`
//! feature, implements `defmt::Format` for on-target logging.

/// Roster storage and codec failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The requested file does not exist.
    NotFound,
    /// The stored bytes are not a valid roster.
    Format,
    /// Flash read/write failed, or the data does not fit.
    Io,
}

impl StoreError {
    /// Short message for the 128-px wide screen.
    pub fn message(self) -> &'static str {
        match self {
            StoreError::NotFound => "Class not found",
            StoreError::Format => "Bad class file",
            StoreError::Io => "Storage error",
        }
    }
}

/// Radio notify failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The radio refused the payload (queue full or too large).
    Rejected,
}

/// File server failures that end the transfer action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerError<E> {
    /// The access point or listener could not be brought up.
    Start(E),
}
