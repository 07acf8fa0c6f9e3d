//! Library interface for the attendance kiosk.
//!
//! Every piece of kiosk logic lives here, written against traits for the
//! hardware it touches (key matrix pins, screen, file storage, radio link,
//! network transport) so it can be tested on the host.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary (main.rs, `--features embedded`) supplies the
//! ESP32 implementations of those traits and runs [`menu::MenuController`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod attendance;
pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod keypad;
pub mod link;
pub mod menu;
pub mod roster;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

pub use attendance::{AttendanceSession, SessionOutcome};
pub use console::Console;
pub use error::{LinkError, ServerError, StoreError};
pub use http::{FileServer, HttpTransport};
pub use keypad::{Command, Key, KeyScan, Keypad};
pub use link::{LinkEvent, LinkEvents, LinkNotifier, LinkRadio};
pub use menu::MenuController;
pub use roster::{Attendance, Roster, Student};
pub use storage::{FileStore, RosterStore};
pub use ui::{Presenter, Screen};

// ═══════════════════════════════════════════════════════════════════════════
// Cross-module tests
// ═══════════════════════════════════════════════════════════════════════════
