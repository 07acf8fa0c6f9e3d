//! Host test doubles for the hardware seams.

use std::cell::Cell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::string::String;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::error::LinkError;
use crate::keypad::{Key, KeyScan};
use crate::link::LinkRadio;
use crate::ui::Screen;

/// Keys played back in order; `None` entries are idle scans.
///
/// Panics when the script runs out, so a state machine waiting for input
/// it should not need fails instead of hanging.
pub struct ScriptedKeys(pub VecDeque<Option<Key>>);

impl ScriptedKeys {
    pub fn new(script: &[Option<Key>]) -> Self {
        Self(script.iter().copied().collect())
    }

    /// Presses only, no idle scans between them.
    pub fn presses(keys: &[Key]) -> Self {
        Self(keys.iter().map(|&k| Some(k)).collect())
    }
}

impl KeyScan for ScriptedKeys {
    async fn scan(&mut self) -> Option<Key> {
        match self.0.pop_front() {
            Some(step) => step,
            None => panic!("key script exhausted"),
        }
    }
}

/// Screen that keeps the lines currently in its buffer and every frame
/// flushed so far.
#[derive(Default)]
pub struct Lines {
    pub buffer: Vec<(String, i32, i32)>,
    pub frames: Vec<Vec<String>>,
}

impl Lines {
    pub fn texts(&self) -> Vec<&str> {
        self.buffer.iter().map(|(t, _, _)| t.as_str()).collect()
    }

    /// Whether any flushed frame contained `text`.
    pub fn showed(&self, text: &str) -> bool {
        self.frames.iter().any(|f| f.iter().any(|t| t == text))
    }

    /// Number of flushes whose newest line is `text`.
    pub fn count(&self, text: &str) -> usize {
        self.frames
            .iter()
            .filter(|f| f.last().is_some_and(|t| t == text))
            .count()
    }
}

impl Screen for Lines {
    fn clear(&mut self) {
        self.buffer.clear();
    }
    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.buffer.push((text.into(), x, y));
    }
    fn flush(&mut self) {
        self.frames
            .push(self.buffer.iter().map(|(t, _, _)| t.clone()).collect());
    }
}

/// Delay that returns at once and adds the requested time to a shared clock.
#[derive(Clone, Default)]
pub struct Clock(pub Rc<Cell<u64>>);

impl Clock {
    pub fn elapsed_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }
}

impl DelayNs for Clock {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + ns as u64);
    }
}

/// Radio recording what the main loop asked of it.
#[derive(Default)]
pub struct Radio {
    pub advertised: usize,
    pub sent: Vec<Vec<u8>>,
}

impl LinkRadio for Radio {
    fn advertise(&mut self) {
        self.advertised += 1;
    }
    fn notify(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.sent.push(data.to_vec());
        Ok(())
    }
}

/// Poll `future` up to `n` times on the current thread.
///
/// For loops that never return: drive them until they park, then inspect
/// the state they left behind. Returns the output if the future finished.
pub fn poll_times<F: Future>(future: F, n: usize) -> Option<F::Output> {
    let mut future = pin!(future);
    let mut cx = Context::from_waker(Waker::noop());
    for _ in 0..n {
        if let Poll::Ready(out) = future.as_mut().poll(&mut cx) {
            return Some(out);
        }
    }
    None
}
