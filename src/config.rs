//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Key matrix

/// Rows of the key matrix (energized one at a time).
pub const KEYPAD_ROWS: usize = 4;

/// Columns of the key matrix (sampled with pull-downs).
pub const KEYPAD_COLS: usize = 4;

/// Settle time after a column is first seen active (ms).
pub const KEY_DEBOUNCE_MS: u32 = 200;

/// Interval between samples while waiting for a key release (ms).
pub const KEY_RELEASE_POLL_MS: u32 = 10;

/// Idle polling cadence of the main loop (ms).
pub const IDLE_TICK_MS: u32 = 100;

// GPIO pin assignments (ESP32 DevKit)
//
// Logical names only; the concrete `esp_hal::peripherals::GPIOx` are
// picked in `main.rs`.
//
//   Keypad rows    → GPIO13, GPIO12, GPIO14, GPIO27 (outputs, idle low)
//   Keypad columns → GPIO26, GPIO25, GPIO33, GPIO32 (inputs, pull-down)
//   I²C SCL        → GPIO21
//   I²C SDA        → GPIO22

// Screen hold times

/// Hold after each student's status confirmation (ms).
pub const MARK_CONFIRM_HOLD_MS: u32 = 1000;

/// Hold after "Attendance saved!" and "No classes found!" (ms).
pub const RESULT_HOLD_MS: u32 = 2000;

/// Hold on the "Starting ..." banner before a menu action runs (ms).
pub const DISPATCH_BANNER_MS: u32 = 1000;

// Roster storage

/// Suffix identifying roster files in storage.
pub const ROSTER_FILE_SUFFIX: &str = ".json";

/// Maximum number of roster files discovered in one listing.
pub const MAX_CLASSES: usize = 8;

/// Maximum length of a file name / class identifier.
pub const FILE_NAME_CAPACITY: usize = 32;

/// Maximum students per roster.
pub const MAX_STUDENTS: usize = 40;

/// Maximum length of a student name (bytes, full name).
pub const STUDENT_NAME_CAPACITY: usize = 40;

/// Largest roster file accepted on load or produced on save (bytes).
///
/// Must fit a single `sequential-storage` item on a 4 KB flash page.
pub const ROSTER_FILE_CAPACITY: usize = 3072;

// Radio link

/// Name advertised while no peer is connected.
pub const BLE_DEVICE_NAME: &str = "ESP32-Attendance";

/// Advertising interval (ms).
pub const BLE_ADV_INTERVAL_MS: u64 = 100;

/// Size of the append-mode inbound write buffer (bytes).
pub const BLE_RX_BUFFER_SIZE: usize = 100;

/// Largest single notify payload (bytes).
pub const BLE_NOTIFY_MAX: usize = 20;

/// Depth of the radio → main loop inbound write queue.
pub const LINK_EVENT_QUEUE_DEPTH: usize = 8;

/// How long a link status message stays up before the prompt returns (ms).
pub const LINK_STATUS_HOLD_MS: u32 = 1000;

// Wi-Fi access point + file server

/// Access point SSID, fixed at build time.
pub const AP_SSID: &str = match option_env!("KIOSK_AP_SSID") {
    Some(ssid) => ssid,
    None => "AttendanceDevice",
};

/// Access point passphrase (WPA2), fixed at build time.
pub const AP_PASSWORD: &str = match option_env!("KIOSK_AP_PASSWORD") {
    Some(password) => password,
    None => "12345678",
};

/// Address the kiosk takes on its own access point.
pub const AP_ADDRESS: [u8; 4] = [192, 168, 4, 1];

/// Prefix length of the access point subnet.
pub const AP_PREFIX_LEN: u8 = 24;

/// TCP port of the file server.
pub const HTTP_PORT: u16 = 80;

/// Largest request read from a client (bytes).
pub const HTTP_REQUEST_CAPACITY: usize = 1024;

/// The only route the file server answers.
pub const ATTENDANCE_PATH: &str = "/attendance.json";

/// Storage file served on [`ATTENDANCE_PATH`].
pub const ATTENDANCE_FILE: &str = "attendance.json";
