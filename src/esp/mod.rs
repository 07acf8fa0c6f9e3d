//! ESP32 implementations of the kiosk's hardware traits.
//!
//! ## Components
//!
//! - **display**: SSD1306 over I²C as a [`attendance_kiosk::Screen`].
//! - **flash**: `sequential-storage` map as a [`attendance_kiosk::FileStore`].
//! - **ble**: trouble-host GATT peripheral behind [`attendance_kiosk::LinkRadio`].
//! - **wifi**: access point + TCP listener as an [`attendance_kiosk::HttpTransport`].

pub mod ble;
pub mod display;
pub mod flash;
pub mod wifi;
