//! Wi-Fi access point and the file server's TCP listener.
//!
//! The access point stays down until the transfer action starts it. The
//! kiosk takes a static address on its own network; clients configure
//! theirs by hand (no DHCP server runs on the AP).

use alloc::string::String;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_net::tcp::{self, AcceptError, TcpSocket};
use embassy_net::{Config as NetConfig, Ipv4Address, Ipv4Cidr, Stack, StackResources, StaticConfigV4};
use embassy_time::Duration;
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{
    self, AccessPointConfig, AuthMethod, ModeConfig, WifiController, WifiDevice, WifiError,
};
use esp_radio::Controller as RadioController;
use heapless::Vec;
use static_cell::StaticCell;

use attendance_kiosk::config::{AP_ADDRESS, AP_PASSWORD, AP_PREFIX_LEN, AP_SSID, HTTP_PORT};
use attendance_kiosk::HttpTransport;

/// Socket receive buffer; one request.
const RX_BUFFER_SIZE: usize = 1536;

/// Socket transmit buffer; holds a full roster file.
const TX_BUFFER_SIZE: usize = 4096;

/// A client that stops talking is dropped after this long.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

static NET_RESOURCES: StaticCell<StackResources<2>> = StaticCell::new();
static RX_BUFFER: StaticCell<[u8; RX_BUFFER_SIZE]> = StaticCell::new();
static TX_BUFFER: StaticCell<[u8; TX_BUFFER_SIZE]> = StaticCell::new();

#[derive(Debug, defmt::Format)]
pub enum NetError {
    Wifi(WifiError),
    Accept(AcceptError),
    Tcp(tcp::Error),
}

pub struct WifiAp {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    socket: TcpSocket<'static>,
}

/// Create the AP interface and its network stack, and spawn the stack runner.
pub fn init(
    spawner: &Spawner,
    radio: &'static RadioController<'static>,
    wifi_peripheral: WIFI<'static>,
) -> Result<WifiAp, WifiError> {
    let (controller, interfaces) = wifi::new(radio, wifi_peripheral, Default::default())?;

    let [a, b, c, d] = AP_ADDRESS;
    let net_cfg = NetConfig::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), AP_PREFIX_LEN),
        gateway: None,
        dns_servers: Vec::new(),
    });

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let resources = NET_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(interfaces.ap, net_cfg, resources, seed);
    if spawner.spawn(net_task(runner)).is_err() {
        warn!("network runner could not be spawned");
    }

    let mut socket = TcpSocket::new(
        stack,
        RX_BUFFER.init([0; RX_BUFFER_SIZE]),
        TX_BUFFER.init([0; TX_BUFFER_SIZE]),
    );
    socket.set_timeout(Some(SOCKET_TIMEOUT));

    Ok(WifiAp {
        controller,
        stack,
        socket,
    })
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

impl HttpTransport for WifiAp {
    type Error = NetError;

    async fn start(&mut self) -> Result<(), NetError> {
        let config = ModeConfig::AccessPoint(
            AccessPointConfig::default()
                .with_ssid(String::from(AP_SSID))
                .with_password(String::from(AP_PASSWORD))
                .with_auth_method(AuthMethod::Wpa2Personal),
        );
        self.controller.set_config(&config).map_err(NetError::Wifi)?;
        if !matches!(self.controller.is_started(), Ok(true)) {
            self.controller.start_async().await.map_err(NetError::Wifi)?;
        }
        self.stack.wait_config_up().await;
        info!("access point \"{}\" up, listening on port {}", AP_SSID, HTTP_PORT);
        Ok(())
    }

    async fn accept(&mut self) -> Result<(), NetError> {
        // A dropped accept leaves the socket listening; listen again from CLOSED.
        if self.socket.state() == tcp::State::Listen {
            self.socket.abort();
        }
        self.socket.accept(HTTP_PORT).await.map_err(NetError::Accept)?;
        info!("client {:?}", self.socket.remote_endpoint());
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        self.socket.read(buf).await.map_err(NetError::Tcp)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), NetError> {
        let mut rest = data;
        while !rest.is_empty() {
            let n = self.socket.write(rest).await.map_err(NetError::Tcp)?;
            if n == 0 {
                return Err(NetError::Tcp(tcp::Error::ConnectionReset));
            }
            rest = &rest[n..];
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.socket.close();
        if self.socket.flush().await.is_err() {
            warn!("client went away before the response was sent");
        }
        // Back to CLOSED so the next accept can listen again.
        self.socket.abort();
    }
}
