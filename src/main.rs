//! Attendance kiosk firmware for the ESP32.
//!
//! Hardware wiring only: every piece of behaviour lives in the
//! `attendance_kiosk` library, this binary plugs ESP32 peripherals into its
//! traits and hands control to the menu.
//!
//! ## Tasks
//!
//! - **main**: key scanning, display and the menu (cooperative, never returns).
//! - **ble**: GATT peripheral, feeds [`LINK_EVENTS`] and drains [`OUTBOUND`].
//! - **net**: embassy-net stack runner for the access point.

#![no_std]
#![no_main]

extern crate alloc;

mod esp;

use {esp_backtrace as _, esp_println as _};

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Timer};
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::ble::controller::BleConnector;
use static_cell::StaticCell;

use attendance_kiosk::{
    Console, FileServer, Keypad, LinkEvents, LinkNotifier, MenuController, Presenter, RosterStore,
};

use esp::ble::{ble_task, AdvertiseRequest, EspLink, Outbound};
use esp::flash::FlashFiles;

esp_bootloader_esp_idf::esp_app_desc!();

// ═══════════════════════════════════════════════════════════════════════════
// Inter-task plumbing
// ═══════════════════════════════════════════════════════════════════════════

/// Radio task → main loop: connect, disconnect and inbound writes.
static LINK_EVENTS: LinkEvents = LinkEvents::new();

/// Main loop → radio task: (re)start advertising.
static ADVERTISE: AdvertiseRequest = Signal::new();

/// Main loop → radio task: notify payloads.
static OUTBOUND: Outbound = Channel::new();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    let peripherals = esp_hal::init(esp_hal::Config::default());

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("attendance kiosk v{} starting", env!("CARGO_PKG_VERSION"));

    // ── Display: SSD1306 on I2C0, SDA=GPIO22 / SCL=GPIO21 ──────────────
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .expect("i2c0 init")
    .with_sda(peripherals.GPIO22)
    .with_scl(peripherals.GPIO21);
    let mut presenter = Presenter::new(esp::display::init(i2c));

    // ── Key matrix: rows driven, columns pulled down ───────────────────
    let rows = [
        Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO14, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default()),
    ];
    let cols = [
        Input::new(peripherals.GPIO26, InputConfig::default().with_pull(Pull::Down)),
        Input::new(peripherals.GPIO25, InputConfig::default().with_pull(Pull::Down)),
        Input::new(peripherals.GPIO33, InputConfig::default().with_pull(Pull::Down)),
        Input::new(peripherals.GPIO32, InputConfig::default().with_pull(Pull::Down)),
    ];
    let keypad = Keypad::new(rows, cols, Delay);

    // ── Roster files ───────────────────────────────────────────────────
    let files = match FlashFiles::mount(peripherals.FLASH) {
        Ok(files) => files,
        Err(e) => {
            error!("roster storage unavailable: {:?}", e);
            presenter.show(e.message(), 0, 0, true);
            return halt().await;
        }
    };

    // ── Radio: one controller shared by BLE and Wi-Fi ──────────────────
    let radio: &'static esp_radio::Controller<'static> =
        RADIO.init(esp_radio::init().expect("radio init"));

    match BleConnector::new(radio, peripherals.BT, Default::default()) {
        Ok(connector) => {
            if spawner
                .spawn(ble_task(connector, &LINK_EVENTS, &ADVERTISE, &OUTBOUND))
                .is_err()
            {
                warn!("BLE task could not be spawned");
            }
        }
        Err(e) => warn!("BLE controller unavailable: {:?}", defmt::Debug2Format(&e)),
    }

    let ap = match esp::wifi::init(&spawner, radio, peripherals.WIFI) {
        Ok(ap) => ap,
        Err(e) => {
            error!("Wi-Fi init failed: {:?}", defmt::Debug2Format(&e));
            presenter.show("Wi-Fi failed!", 0, 0, true);
            return halt().await;
        }
    };

    // ── Hand over to the menu ──────────────────────────────────────────
    let link = LinkNotifier::new(&LINK_EVENTS, EspLink::new(&ADVERTISE, &OUTBOUND));
    let mut console = Console::new(keypad, presenter, link, Delay);
    console.start();

    let mut store = RosterStore::new(files);
    let mut server = FileServer::new(ap);
    info!("ready");
    MenuController::new()
        .run(&mut console, &mut store, &mut server)
        .await;
}

/// Park the main task after a fatal bring-up error; the message stays on
/// screen until reset.
async fn halt() {
    loop {
        Timer::after_secs(3600).await;
    }
}
