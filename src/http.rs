//! Single-route HTTP file server for the transfer action.
//!
//! Clients are served one at a time: accept, read one request, answer,
//! close. Only `GET /attendance.json` is known; it streams the stored
//! attendance file back verbatim. A missing or unreadable file is a 500
//! for that request only, and every other request is a 404.

use core::fmt::Write;

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::config::{
    AP_ADDRESS, AP_PASSWORD, AP_SSID, ATTENDANCE_FILE, ATTENDANCE_PATH, HTTP_REQUEST_CAPACITY,
    RESULT_HOLD_MS, ROSTER_FILE_CAPACITY,
};
use crate::console::Console;
use crate::error::ServerError;
use crate::keypad::KeyScan;
use crate::link::LinkRadio;
use crate::storage::FileStore;
use crate::ui::{line, Screen};

/// Network side of the server: an access point with one listening socket.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    type Error;

    /// Bring up the access point and the listener.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Wait for the next client.
    ///
    /// Must be cancel-safe: the server drops a pending accept to apply
    /// link events and then calls it again.
    async fn accept(&mut self) -> Result<(), Self::Error>;

    /// Read request bytes from the current client.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    async fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush and close the current client connection.
    async fn close(&mut self);
}

/// Response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Attendance,
    Unknown,
}

/// Match the request line against the one known route.
///
/// Any query string is ignored; the path must match exactly.
fn route(request: &[u8]) -> Route {
    let end = request
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(request.len());
    let Ok(request_line) = core::str::from_utf8(&request[..end]) else {
        return Route::Unknown;
    };
    let mut parts = request_line.split(' ');
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Route::Unknown;
    };
    let path = target.split('?').next().unwrap_or(target);
    if path == ATTENDANCE_PATH {
        Route::Attendance
    } else {
        Route::Unknown
    }
}

fn response_head(status: Status, content_type: Option<&str>, len: usize) -> String<160> {
    let mut head = String::new();
    let _ = write!(head, "HTTP/1.1 {} {}\r\n", status.code(), status.reason());
    if let Some(content_type) = content_type {
        let _ = write!(head, "Content-Type: {}\r\n", content_type);
    }
    let _ = write!(head, "Content-Length: {}\r\nConnection: close\r\n\r\n", len);
    head
}

pub struct FileServer<T> {
    transport: T,
}

impl<T: HttpTransport> FileServer<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Bring the access point up and serve clients until reset.
    ///
    /// Link events are applied as they arrive while waiting for a client,
    /// and between requests. Returns only if the access point or listener
    /// cannot be started.
    pub async fn run<F, K, S, R, D>(
        &mut self,
        console: &mut Console<'_, K, S, R, D>,
        files: &mut F,
    ) -> ServerError<T::Error>
    where
        F: FileStore,
        K: KeyScan,
        S: Screen,
        R: LinkRadio,
        D: DelayNs,
    {
        if let Err(e) = self.transport.start().await {
            warn!("access point failed to start");
            console.show("Wi-Fi failed!", 0, 0, true);
            console.pause(RESULT_HOLD_MS).await;
            return ServerError::Start(e);
        }
        info!("file server up on {}", AP_SSID);

        let [a, b, c, d] = AP_ADDRESS;
        console.show(&line(format_args!("SSID: {}", AP_SSID)), 0, 0, true);
        console.show(&line(format_args!("Pass: {}", AP_PASSWORD)), 0, 16, false);
        console.show(&line(format_args!("{}.{}.{}.{}", a, b, c, d)), 0, 32, false);

        loop {
            console.pump_link().await;
            match select(self.transport.accept(), console.link_activity()).await {
                Either::First(Ok(())) => {
                    if self.answer(files).await.is_err() {
                        warn!("client connection failed");
                    }
                }
                Either::First(Err(_)) => warn!("accept failed"),
                Either::Second(()) => {}
            }
        }
    }

    /// Accept one client, answer its request and close the connection.
    pub async fn serve_next<F: FileStore>(&mut self, files: &mut F) -> Result<Status, T::Error> {
        self.transport.accept().await?;
        self.answer(files).await
    }

    /// Answer the accepted client and close its connection.
    async fn answer<F: FileStore>(&mut self, files: &mut F) -> Result<Status, T::Error> {
        let result = self.respond(files).await;
        self.transport.close().await;
        result
    }

    async fn respond<F: FileStore>(&mut self, files: &mut F) -> Result<Status, T::Error> {
        let mut request = [0u8; HTTP_REQUEST_CAPACITY];
        let n = self.transport.read(&mut request).await?;

        let status = match route(&request[..n]) {
            Route::Attendance => {
                let mut body = [0u8; ROSTER_FILE_CAPACITY];
                match files.read(ATTENDANCE_FILE, &mut body).await {
                    Ok(len) => {
                        let head = response_head(Status::Ok, Some("application/json"), len);
                        self.transport.write_all(head.as_bytes()).await?;
                        self.transport.write_all(&body[..len]).await?;
                        Status::Ok
                    }
                    Err(e) => {
                        warn!("serving {} failed: {}", ATTENDANCE_FILE, e);
                        self.reply_empty(Status::InternalServerError).await?
                    }
                }
            }
            Route::Unknown => self.reply_empty(Status::NotFound).await?,
        };
        debug!("http {} ({} byte request)", status.code(), n);
        Ok(status)
    }

    async fn reply_empty(&mut self, status: Status) -> Result<Status, T::Error> {
        let head = response_head(status, None, 0);
        self.transport.write_all(head.as_bytes()).await?;
        Ok(status)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
