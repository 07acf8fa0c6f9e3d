use crate::keypad::Command;

/// Move selection cursor one item back, wrapping to the last item.
pub fn select_prev(selected: usize, item_count: usize) -> usize {
    if item_count == 0 {
        return 0;
    }
    (selected + item_count - 1) % item_count
}

/// Move selection cursor one item forward, wrapping to the first item.
pub fn select_next(selected: usize, item_count: usize) -> usize {
    if item_count == 0 {
        return 0;
    }
    (selected + 1) % item_count
}

/// Outcome of feeding one command to a [`Selection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectionStep {
    /// Cursor moved; redraw.
    Moved(usize),
    /// The highlighted item was chosen.
    Chosen(usize),
    /// The key means nothing here.
    Ignored,
}

/// Cursor over a fixed-length list, shared by the action menu and the
/// class picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Selection {
    index: usize,
    len: usize,
}

impl Selection {
    pub const fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn apply(&mut self, command: Command) -> SelectionStep {
        if self.len == 0 {
            return SelectionStep::Ignored;
        }
        match command {
            Command::Previous => {
                self.index = select_prev(self.index, self.len);
                SelectionStep::Moved(self.index)
            }
            Command::Next => {
                self.index = select_next(self.index, self.len);
                SelectionStep::Moved(self.index)
            }
            Command::Select => SelectionStep::Chosen(self.index),
            Command::Present | Command::Absent => SelectionStep::Ignored,
        }
    }
}
