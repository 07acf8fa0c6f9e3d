//! Build script - passes the ESP32 linker scripts to the embedded binary
//! and rebuilds when the access point settings change.

use std::env;

fn main() {
    // Host builds (library + tests) link normally.
    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");
    }

    // AP credentials are baked in through option_env!.
    println!("cargo:rerun-if-env-changed=KIOSK_AP_SSID");
    println!("cargo:rerun-if-env-changed=KIOSK_AP_PASSWORD");
    println!("cargo:rerun-if-changed=build.rs");
}
