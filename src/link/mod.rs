//! Radio link to a companion app.
//!
//! The radio stack runs in its own task and reports what happens to the
//! main loop through [`LinkEvents`]. [`LinkNotifier`] owns the connection
//! flag and applies posted events once per tick, so the main loop never
//! observes a half-applied update.
//!
//! ## Components
//!
//! - **Events**: latest connection transition plus a bounded queue of
//!   inbound writes.
//! - **Notifier**: connection flag, status rendering, outbound notify gating.
//! - **Advertising**: payload builder for the advertised name.

pub mod advertising;

use core::str;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::config::{BLE_RX_BUFFER_SIZE, LINK_EVENT_QUEUE_DEPTH};
use crate::error::LinkError;
use crate::ui::{Presenter, Screen};

/// Something the radio stack observed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Connected,
    Disconnected,
    /// Bytes written by the peer to the inbound attribute.
    Received(Vec<u8, BLE_RX_BUFFER_SIZE>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Connected,
    Disconnected,
}

/// Shared mailbox between the radio task and the main loop.
///
/// Connection transitions go to a single latest-value slot and are never
/// dropped. The radio cannot reconnect before the main loop has seen the
/// disconnect and asked to advertise again, so a slot that was overwritten
/// only ever loses a `Connected` that was immediately followed by its
/// `Disconnected`. Inbound writes queue separately, and only they are
/// dropped when the main loop falls behind.
pub struct LinkEvents {
    transition: Signal<CriticalSectionRawMutex, Transition>,
    received: Channel<CriticalSectionRawMutex, Vec<u8, BLE_RX_BUFFER_SIZE>, LINK_EVENT_QUEUE_DEPTH>,
    pending: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkEvents {
    pub const fn new() -> Self {
        Self {
            transition: Signal::new(),
            received: Channel::new(),
            pending: Signal::new(),
        }
    }

    /// Post an event from the radio side without blocking.
    ///
    /// Returns `false` only for an inbound write dropped on a full queue.
    pub fn post(&self, event: LinkEvent) -> bool {
        let posted = match event {
            LinkEvent::Connected => {
                self.transition.signal(Transition::Connected);
                true
            }
            LinkEvent::Disconnected => {
                self.transition.signal(Transition::Disconnected);
                true
            }
            LinkEvent::Received(bytes) => match self.received.try_send(bytes) {
                Ok(()) => true,
                Err(_) => {
                    warn!("link receive queue full, write dropped");
                    false
                }
            },
        };
        self.pending.signal(());
        posted
    }

    /// Wait until something has been posted since the last pump.
    ///
    /// May wake spuriously; the pump then simply finds nothing.
    pub async fn wait(&self) {
        self.pending.wait().await;
    }
}

/// Post an event from the radio side; see [`LinkEvents::post`].
pub fn enqueue(events: &LinkEvents, event: LinkEvent) -> bool {
    events.post(event)
}

/// Commands the main loop issues to the radio stack.
pub trait LinkRadio {
    /// (Re)start advertising so a peer can connect.
    fn advertise(&mut self);

    /// Push `data` to the peer over the notify attribute.
    fn notify(&mut self, data: &[u8]) -> Result<(), LinkError>;
}

/// Connection state and inbound text as seen by the main loop.
pub struct LinkNotifier<'a, R> {
    events: &'a LinkEvents,
    radio: R,
    connected: bool,
    inbound: Vec<u8, BLE_RX_BUFFER_SIZE>,
}

impl<'a, R: LinkRadio> LinkNotifier<'a, R> {
    pub fn new(events: &'a LinkEvents, radio: R) -> Self {
        Self {
            events,
            radio,
            connected: false,
            inbound: Vec::new(),
        }
    }

    /// Begin advertising and show the startup banner.
    pub fn start<S: Screen>(&mut self, presenter: &mut Presenter<S>) {
        self.radio.advertise();
        presenter.status("ESP32 Attendance", 0, 0, true);
        presenter.status("Advertising...", 0, 16, false);
        info!("link advertising");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Forward `data` to the peer if one is connected; otherwise drop it.
    pub fn send(&mut self, data: &[u8]) -> bool {
        if !self.connected {
            return false;
        }
        match self.radio.notify(data) {
            Ok(()) => true,
            Err(e) => {
                debug!("notify dropped: {}", e);
                false
            }
        }
    }

    /// Apply everything posted since the last call, rendering status as it
    /// changes.
    ///
    /// Inbound writes are appended to the receive buffer, which is shown and
    /// emptied once the queue has been drained. Returns whether anything was
    /// applied.
    pub fn pump<S: Screen>(&mut self, presenter: &mut Presenter<S>) -> bool {
        self.events.pending.reset();
        let mut applied = false;

        match self.events.transition.try_take() {
            Some(Transition::Connected) => {
                applied = true;
                self.connected = true;
                info!("link connected");
                presenter.status("Connected to app", 0, 0, true);
            }
            // Also reached when the matching connect was overwritten; the
            // radio waits for a new advertise request either way.
            Some(Transition::Disconnected) => {
                applied = true;
                self.connected = false;
                info!("link disconnected");
                presenter.status("Disconnected", 0, 0, true);
                presenter.status("Advertising...", 0, 16, false);
                self.radio.advertise();
            }
            None => {}
        }

        while let Ok(bytes) = self.events.received.try_receive() {
            applied = true;
            let room = self.inbound.capacity() - self.inbound.len();
            let take = bytes.len().min(room);
            let _ = self.inbound.extend_from_slice(&bytes[..take]);
        }

        if !self.inbound.is_empty() {
            let text = decode_text(&self.inbound);
            info!("link received {} bytes", self.inbound.len());
            presenter.status("Received:", 0, 0, true);
            presenter.status(text, 0, 16, false);
            self.inbound.clear();
        }
        applied
    }

    /// Wait until the radio side posts something.
    pub async fn wait(&self) {
        self.events.wait().await;
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }
}

/// Longest valid UTF-8 prefix of `bytes`, trimmed.
pub fn decode_text(bytes: &[u8]) -> &str {
    let valid = match str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    };
    valid.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Radio {
        advertised: usize,
        sent: std::vec::Vec<std::vec::Vec<u8>>,
        reject: bool,
    }

    impl LinkRadio for Radio {
        fn advertise(&mut self) {
            self.advertised += 1;
        }
        fn notify(&mut self, data: &[u8]) -> Result<(), LinkError> {
            if self.reject {
                return Err(LinkError::Rejected);
            }
            self.sent.push(data.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Lines(std::vec::Vec<std::string::String>);

    impl Screen for Lines {
        fn clear(&mut self) {
            self.0.clear();
        }
        fn draw_text(&mut self, text: &str, _x: i32, _y: i32) {
            self.0.push(text.into());
        }
        fn flush(&mut self) {}
    }

    fn bytes(data: &[u8]) -> Vec<u8, BLE_RX_BUFFER_SIZE> {
        Vec::from_slice(data).unwrap()
    }

    #[test]
    fn send_is_dropped_until_connected() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());

        assert!(!link.send(b"1"));
        assert!(link.radio().sent.is_empty());

        assert!(enqueue(&events, LinkEvent::Connected));
        assert!(link.pump(&mut presenter));
        assert!(link.is_connected());
        assert_eq!(presenter.screen().0, ["Connected to app"]);

        assert!(link.send(b"1"));
        assert_eq!(link.radio().sent, [b"1".to_vec()]);
    }

    #[test]
    fn disconnect_readvertises() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());
        link.start(&mut presenter);
        assert_eq!(link.radio().advertised, 1);

        enqueue(&events, LinkEvent::Connected);
        enqueue(&events, LinkEvent::Disconnected);
        link.pump(&mut presenter);

        assert!(!link.is_connected());
        assert_eq!(link.radio().advertised, 2);
        assert_eq!(presenter.screen().0, ["Disconnected", "Advertising..."]);
        assert!(!link.send(b"x"));
    }

    #[test]
    fn inbound_writes_append_then_render_once() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());

        enqueue(&events, LinkEvent::Received(bytes(b" hello")));
        enqueue(&events, LinkEvent::Received(bytes(b" world \n")));
        link.pump(&mut presenter);

        assert_eq!(presenter.screen().0, ["Received:", "hello world"]);
        // Buffer is consumed.
        assert!(!link.pump(&mut presenter));
        assert_eq!(presenter.screen().0, ["Received:", "hello world"]);
    }

    #[test]
    fn inbound_buffer_drops_excess() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());

        enqueue(&events, LinkEvent::Received(bytes(&[b'a'; 80])));
        enqueue(&events, LinkEvent::Received(bytes(&[b'b'; 80])));
        link.pump(&mut presenter);

        let shown = &presenter.screen().0[1];
        assert_eq!(shown.len(), BLE_RX_BUFFER_SIZE);
        assert!(shown.ends_with(&"b".repeat(20)));
    }

    #[test]
    fn full_queue_drops_writes_only() {
        let events = LinkEvents::new();
        for _ in 0..LINK_EVENT_QUEUE_DEPTH {
            assert!(enqueue(&events, LinkEvent::Received(bytes(b"x"))));
        }
        assert!(!enqueue(&events, LinkEvent::Received(bytes(b"y"))));
        assert!(enqueue(&events, LinkEvent::Disconnected));
    }

    #[test]
    fn disconnect_after_a_burst_of_writes_is_applied() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());
        link.start(&mut presenter);
        enqueue(&events, LinkEvent::Connected);
        link.pump(&mut presenter);

        for _ in 0..LINK_EVENT_QUEUE_DEPTH + 2 {
            enqueue(&events, LinkEvent::Received(bytes(b"ab")));
        }
        assert!(enqueue(&events, LinkEvent::Disconnected));
        assert!(link.pump(&mut presenter));

        assert!(!link.is_connected());
        assert_eq!(link.radio().advertised, 2);
        assert_eq!(presenter.screen().0[1], "ab".repeat(LINK_EVENT_QUEUE_DEPTH));
    }

    #[test]
    fn unseen_connect_still_readvertises() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(&events, Radio::default());

        enqueue(&events, LinkEvent::Connected);
        enqueue(&events, LinkEvent::Disconnected);
        link.pump(&mut presenter);

        assert!(!link.is_connected());
        assert_eq!(link.radio().advertised, 1);
        assert!(!link.pump(&mut presenter));
    }

    #[test]
    fn rejected_notify_reports_failure() {
        let events = LinkEvents::new();
        let mut presenter = Presenter::new(Lines::default());
        let mut link = LinkNotifier::new(
            &events,
            Radio {
                reject: true,
                ..Default::default()
            },
        );
        enqueue(&events, LinkEvent::Connected);
        link.pump(&mut presenter);
        assert!(!link.send(b"1"));
    }

    #[test]
    fn invalid_utf8_shows_valid_prefix() {
        assert_eq!(decode_text(b"ok\xff\xfe rest"), "ok");
        assert_eq!(decode_text(b"\xff"), "");
        assert_eq!(decode_text(b"  padded  "), "padded");
    }
}
