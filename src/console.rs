//! The kiosk's shared I/O context.
//!
//! [`Console`] owns every device the main loop touches (keypad, display,
//! radio link and delay source) and is handed by `&mut` to whichever state
//! machine currently occupies the loop. Link events are applied here, at a
//! single point per tick, before each key scan.

use embedded_hal_async::delay::DelayNs;

use crate::config::{IDLE_TICK_MS, LINK_STATUS_HOLD_MS};
use crate::keypad::{Command, Key, KeyScan};
use crate::link::{LinkNotifier, LinkRadio};
use crate::ui::{Presenter, Screen};

pub struct Console<'a, K, S, R, D> {
    keys: K,
    presenter: Presenter<S>,
    link: LinkNotifier<'a, R>,
    delay: D,
}

impl<'a, K, S, R, D> Console<'a, K, S, R, D>
where
    K: KeyScan,
    S: Screen,
    R: LinkRadio,
    D: DelayNs,
{
    pub fn new(keys: K, presenter: Presenter<S>, link: LinkNotifier<'a, R>, delay: D) -> Self {
        Self {
            keys,
            presenter,
            link,
            delay,
        }
    }

    /// Start the radio link and show the boot banner.
    pub fn start(&mut self) {
        self.link.start(&mut self.presenter);
    }

    pub fn show(&mut self, text: &str, x: i32, y: i32, clear: bool) {
        self.presenter.show(text, x, y, clear);
    }

    pub async fn pause(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }

    /// Apply pending link events.
    ///
    /// Anything applied is rendered as a status message, held briefly, and
    /// then the prompt it covered is drawn again.
    pub async fn pump_link(&mut self) -> bool {
        if !self.link.pump(&mut self.presenter) {
            return false;
        }
        self.delay.delay_ms(LINK_STATUS_HOLD_MS).await;
        self.presenter.restore();
        true
    }

    /// Wait until the radio side has something for [`pump_link`](Self::pump_link).
    pub async fn link_activity(&self) {
        self.link.wait().await;
    }

    /// Block until a key is pressed, ticking the link while idle.
    ///
    /// A connected peer gets every key as its ASCII label.
    pub async fn next_key(&mut self) -> Key {
        loop {
            self.pump_link().await;
            if let Some(key) = self.keys.scan().await {
                if self.link.is_connected() {
                    let sent = self.link.send(&[key.as_char() as u8]);
                    debug!("key {} forwarded: {}", key.as_char() as u8, sent);
                }
                return key;
            }
            self.delay.delay_ms(IDLE_TICK_MS).await;
        }
    }

    /// Block until a key with a reserved meaning is pressed.
    pub async fn next_command(&mut self) -> Command {
        loop {
            if let Some(command) = self.next_key().await.command() {
                return command;
            }
        }
    }

    pub fn presenter(&self) -> &Presenter<S> {
        &self.presenter
    }

    pub fn link(&self) -> &LinkNotifier<'a, R> {
        &self.link
    }
}
