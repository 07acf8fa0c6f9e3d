//! BLE peripheral: UART-style GATT service for the companion app.
//!
//! The radio side runs as its own task. It advertises only when the main
//! loop asks ([`EspLink::advertise`]), serves one connection at a time and
//! reports connect, write and disconnect through the shared
//! [`LinkEvents`] queue. Notifications requested by the main loop travel the
//! other way through a small channel and are sent while a peer is connected.

use defmt::{info, warn};
use embassy_futures::join::join;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use esp_radio::ble::controller::BleConnector;
use heapless::Vec;
use trouble_host::prelude::*;

use attendance_kiosk::config::{
    BLE_ADV_INTERVAL_MS, BLE_DEVICE_NAME, BLE_NOTIFY_MAX, BLE_RX_BUFFER_SIZE,
};
use attendance_kiosk::link::advertising::advertising_payload;
use attendance_kiosk::link::{enqueue, LinkEvent, LinkEvents, LinkRadio};
use attendance_kiosk::LinkError;

/// Max number of connections.
const CONNECTIONS_MAX: usize = 1;

/// Max number of L2CAP channels (signal + ATT).
const L2CAP_CHANNELS_MAX: usize = 2;

/// Notifications waiting for the radio task.
const OUTBOUND_DEPTH: usize = 4;

pub type Notification = Vec<u8, BLE_NOTIFY_MAX>;
pub type Outbound = Channel<CriticalSectionRawMutex, Notification, OUTBOUND_DEPTH>;
pub type AdvertiseRequest = Signal<CriticalSectionRawMutex, ()>;

#[gatt_server]
struct Server {
    uart: UartService,
}

#[gatt_service(uuid = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E")]
struct UartService {
    /// Peer writes land here (write-only).
    #[characteristic(uuid = "6E400002-B5A3-F393-E0A9-E50E24DCCA9E", write, write_without_response)]
    rx: Vec<u8, BLE_RX_BUFFER_SIZE>,
    /// Device → peer notifications.
    #[characteristic(uuid = "6E400003-B5A3-F393-E0A9-E50E24DCCA9E", notify)]
    tx: Vec<u8, BLE_NOTIFY_MAX>,
}

/// Main-loop handle on the radio task.
pub struct EspLink {
    advertise: &'static AdvertiseRequest,
    outbound: &'static Outbound,
}

impl EspLink {
    pub fn new(advertise: &'static AdvertiseRequest, outbound: &'static Outbound) -> Self {
        Self {
            advertise,
            outbound,
        }
    }
}

impl LinkRadio for EspLink {
    fn advertise(&mut self) {
        self.advertise.signal(());
    }

    fn notify(&mut self, data: &[u8]) -> Result<(), LinkError> {
        let payload = Notification::from_slice(data).map_err(|_| LinkError::Rejected)?;
        self.outbound
            .try_send(payload)
            .map_err(|_| LinkError::Rejected)
    }
}

#[embassy_executor::task]
pub async fn ble_task(
    connector: BleConnector<'static>,
    events: &'static LinkEvents,
    advertise: &'static AdvertiseRequest,
    outbound: &'static Outbound,
) {
    let controller: ExternalController<_, 20> = ExternalController::new(connector);
    let address = Address::random([0xff, 0x8f, 0x1a, 0x05, 0xe4, 0xff]);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(address);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let server = match Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: BLE_DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    })) {
        Ok(server) => server,
        Err(e) => {
            warn!("GATT server setup failed: {:?}", e);
            return;
        }
    };

    let _ = join(
        async {
            loop {
                if let Err(e) = runner.run().await {
                    warn!("BLE host stopped: {:?}", defmt::Debug2Format(&e));
                }
            }
        },
        async {
            loop {
                advertise.wait().await;
                let conn = match advertise_once(&mut peripheral, &server).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("advertising failed: {:?}", defmt::Debug2Format(&e));
                        continue;
                    }
                };

                outbound.clear();
                enqueue(events, LinkEvent::Connected);
                // Only `serve` ends, when the peer goes away.
                select(serve(&server, &conn, events), notify_loop(&server, &conn, outbound)).await;
                enqueue(events, LinkEvent::Disconnected);
            }
        },
    )
    .await;
}

async fn advertise_once<'values, 'server, C: Controller>(
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server Server<'values>,
) -> Result<GattConnection<'values, 'server, DefaultPacketPool>, BleHostError<C::Error>> {
    let adv_data = advertising_payload(BLE_DEVICE_NAME);
    let interval = Duration::from_millis(BLE_ADV_INTERVAL_MS);
    let params = AdvertisementParameters {
        interval_min: interval,
        interval_max: interval,
        ..Default::default()
    };
    let advertiser = peripheral
        .advertise(
            &params,
            Advertisement::ConnectableScannableUndirected {
                adv_data: &adv_data,
                scan_data: &[],
            },
        )
        .await?;
    info!("advertising as {}", BLE_DEVICE_NAME);
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    info!("peer connected");
    Ok(conn)
}

/// Forward peer writes until the connection drops.
async fn serve<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    events: &LinkEvents,
) {
    let rx = server.uart.rx.handle;
    loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => {
                info!("peer disconnected: {:?}", defmt::Debug2Format(&reason));
                return;
            }
            GattConnectionEvent::Gatt { event } => {
                if let GattEvent::Write(write) = &event {
                    if write.handle() == rx {
                        let data = write.data();
                        let take = data.len().min(BLE_RX_BUFFER_SIZE);
                        let mut bytes = Vec::new();
                        let _ = bytes.extend_from_slice(&data[..take]);
                        enqueue(events, LinkEvent::Received(bytes));
                    }
                }
                match event.accept() {
                    Ok(reply) => reply.send().await,
                    Err(e) => warn!("GATT reply failed: {:?}", defmt::Debug2Format(&e)),
                }
            }
            _ => {}
        }
    }
}

/// Send queued notifications for as long as the connection lasts.
async fn notify_loop<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    outbound: &Outbound,
) {
    loop {
        let payload = outbound.receive().await;
        if let Err(e) = server.uart.tx.notify(conn, &payload).await {
            warn!("notify dropped: {:?}", defmt::Debug2Format(&e));
        }
    }
}
