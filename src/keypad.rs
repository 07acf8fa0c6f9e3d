//! 4×4 matrix keypad scanning.
//!
//! Rows are driven high one at a time while the columns (pulled down) are
//! sampled. The first active column wins: after a debounce delay the scan
//! waits for the release before reporting, so one physical press yields
//! exactly one [`Key`] however long it is held.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::config::{KEYPAD_COLS, KEYPAD_ROWS, KEY_DEBOUNCE_MS, KEY_RELEASE_POLL_MS};

/// One of the sixteen keypad symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    /// `0` to `9`.
    Digit(u8),
    A,
    B,
    C,
    D,
    Star,
    Hash,
}

/// Meaning a key carries in the menus and the marking prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Previous,
    Next,
    Select,
    Present,
    Absent,
}

/// Symbols by row (top to bottom) and column (left to right).
pub const KEYMAP: [[Key; KEYPAD_COLS]; KEYPAD_ROWS] = [
    [Key::Digit(1), Key::Digit(2), Key::Digit(3), Key::A],
    [Key::Digit(4), Key::Digit(5), Key::Digit(6), Key::B],
    [Key::Digit(7), Key::Digit(8), Key::Digit(9), Key::C],
    [Key::Star, Key::Digit(0), Key::Hash, Key::D],
];

impl Key {
    /// Printed label of the key.
    pub fn as_char(self) -> char {
        match self {
            Key::Digit(d) => (b'0' + d % 10) as char,
            Key::A => 'A',
            Key::B => 'B',
            Key::C => 'C',
            Key::D => 'D',
            Key::Star => '*',
            Key::Hash => '#',
        }
    }

    /// Reserved meaning, if any.
    pub fn command(self) -> Option<Command> {
        match self {
            Key::C => Some(Command::Previous),
            Key::D => Some(Command::Next),
            Key::Hash => Some(Command::Select),
            Key::A => Some(Command::Present),
            Key::B => Some(Command::Absent),
            _ => None,
        }
    }
}

/// A source of debounced key events.
#[allow(async_fn_in_trait)]
pub trait KeyScan {
    /// One scan pass: `None` if no key is down.
    async fn scan(&mut self) -> Option<Key>;
}

/// Key matrix over `embedded-hal` pins.
pub struct Keypad<R, C, D> {
    rows: [R; KEYPAD_ROWS],
    cols: [C; KEYPAD_COLS],
    delay: D,
}

impl<R, C, D> Keypad<R, C, D>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
{
    /// Take ownership of the pins and drive every row inactive.
    pub fn new(mut rows: [R; KEYPAD_ROWS], cols: [C; KEYPAD_COLS], delay: D) -> Self {
        for row in rows.iter_mut() {
            let _ = row.set_low();
        }
        Self { rows, cols, delay }
    }

    fn column_active(&mut self, col: usize) -> bool {
        // A pin read error counts as "not pressed".
        self.cols[col].is_high().unwrap_or(false)
    }

    async fn wait_release(&mut self, col: usize) {
        while self.column_active(col) {
            self.delay.delay_ms(KEY_RELEASE_POLL_MS).await;
        }
    }
}

impl<R, C, D> KeyScan for Keypad<R, C, D>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
{
    async fn scan(&mut self) -> Option<Key> {
        for row in 0..KEYPAD_ROWS {
            let _ = self.rows[row].set_high();
            for col in 0..KEYPAD_COLS {
                if self.column_active(col) {
                    self.delay.delay_ms(KEY_DEBOUNCE_MS).await;
                    self.wait_release(col).await;
                    let _ = self.rows[row].set_low();
                    let key = KEYMAP[row][col];
                    debug!("key {} (row {}, col {})", key.as_char() as u8, row, col);
                    return Some(key);
                }
            }
            let _ = self.rows[row].set_low();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Electrical state of the matrix: which row is driven, which key is
    /// held and for how many more column reads.
    #[derive(Default)]
    struct Matrix {
        driven: RefCell<[bool; KEYPAD_ROWS]>,
        pressed: Cell<Option<(usize, usize)>>,
        reads_until_release: Cell<u32>,
    }

    struct Row(Rc<Matrix>, usize);
    struct Col(Rc<Matrix>, usize);
    struct CountingDelay(Rc<Cell<u64>>);

    impl embedded_hal::digital::ErrorType for Row {
        type Error = Infallible;
    }
    impl OutputPin for Row {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.driven.borrow_mut()[self.1] = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.driven.borrow_mut()[self.1] = true;
            Ok(())
        }
    }

    impl embedded_hal::digital::ErrorType for Col {
        type Error = Infallible;
    }
    impl InputPin for Col {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let Some((row, col)) = self.0.pressed.get() else {
                return Ok(false);
            };
            if col != self.1 || !self.0.driven.borrow()[row] {
                return Ok(false);
            }
            let left = self.0.reads_until_release.get();
            if left == 0 {
                self.0.pressed.set(None);
                return Ok(false);
            }
            self.0.reads_until_release.set(left - 1);
            Ok(true)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.0.set(self.0.get() + ns as u64);
        }
    }

    fn keypad(
        matrix: &Rc<Matrix>,
        elapsed: &Rc<Cell<u64>>,
    ) -> Keypad<Row, Col, CountingDelay> {
        let rows = core::array::from_fn(|i| Row(matrix.clone(), i));
        let cols = core::array::from_fn(|i| Col(matrix.clone(), i));
        Keypad::new(rows, cols, CountingDelay(elapsed.clone()))
    }

    #[test]
    fn no_key_down_scans_to_none() {
        let matrix = Rc::new(Matrix::default());
        let elapsed = Rc::new(Cell::new(0));
        let mut pad = keypad(&matrix, &elapsed);

        assert_eq!(block_on(pad.scan()), None);
        assert_eq!(elapsed.get(), 0);
        assert_eq!(*matrix.driven.borrow(), [false; KEYPAD_ROWS]);
    }

    #[test]
    fn every_position_maps_to_its_symbol() {
        for row in 0..KEYPAD_ROWS {
            for col in 0..KEYPAD_COLS {
                let matrix = Rc::new(Matrix::default());
                matrix.pressed.set(Some((row, col)));
                matrix.reads_until_release.set(1);
                let elapsed = Rc::new(Cell::new(0));
                let mut pad = keypad(&matrix, &elapsed);

                assert_eq!(block_on(pad.scan()), Some(KEYMAP[row][col]));
            }
        }
    }

    #[test]
    fn long_hold_yields_one_event_and_restores_rows() {
        let matrix = Rc::new(Matrix::default());
        matrix.pressed.set(Some((3, 2)));
        matrix.reads_until_release.set(50);
        let elapsed = Rc::new(Cell::new(0));
        let mut pad = keypad(&matrix, &elapsed);

        assert_eq!(block_on(pad.scan()), Some(Key::Hash));
        // Debounce plus one poll per held read after the first.
        let expected_ms = KEY_DEBOUNCE_MS as u64 + 49 * KEY_RELEASE_POLL_MS as u64;
        assert_eq!(elapsed.get(), expected_ms * 1_000_000);
        assert_eq!(*matrix.driven.borrow(), [false; KEYPAD_ROWS]);

        // Still released on the next pass.
        assert_eq!(block_on(pad.scan()), None);
    }

    #[test]
    fn reserved_keys_carry_commands() {
        assert_eq!(Key::C.command(), Some(Command::Previous));
        assert_eq!(Key::D.command(), Some(Command::Next));
        assert_eq!(Key::Hash.command(), Some(Command::Select));
        assert_eq!(Key::A.command(), Some(Command::Present));
        assert_eq!(Key::B.command(), Some(Command::Absent));
        assert_eq!(Key::Digit(5).command(), None);
        assert_eq!(Key::Star.command(), None);
    }

    #[test]
    fn labels_follow_the_printed_grid() {
        let labels: std::string::String = KEYMAP.iter().flatten().map(|k| k.as_char()).collect();
        assert_eq!(labels, "123A456B789C*0#D");
    }
}
