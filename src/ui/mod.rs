//! User interface subsystem - OLED text output + shared cursor logic.
//!
//! ## Components
//!
//! - **Presenter**: writes short text lines to a [`Screen`], either on a
//!   cleared buffer or composited over what is already there. Remembers the
//!   current prompt so it can be put back after a status message.
//! - **Input logic**: wrap-around cursor used by every picker.

pub mod input_logic;

use core::fmt::Write;

use heapless::{String, Vec};

/// Longest line the presenter formats (21 glyphs fit at 6 px).
pub const LINE_CAPACITY: usize = 48;

/// Lines of one prompt that can be redrawn.
const PROMPT_LINES: usize = 4;

/// A formatted screen line.
pub type Line = String<LINE_CAPACITY>;

/// Text-capable display with a frame buffer.
///
/// Driver errors are not modelled; implementations swallow them.
pub trait Screen {
    /// Wipe the frame buffer.
    fn clear(&mut self);
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, text: &str, x: i32, y: i32);
    /// Push the frame buffer to the panel.
    fn flush(&mut self);
}

/// Renders status and prompt text.
///
/// Text drawn with [`show`](Presenter::show) is the prompt the user is
/// answering. Text drawn with [`status`](Presenter::status) is transient and
/// can be replaced by the prompt again with [`restore`](Presenter::restore).
pub struct Presenter<S> {
    screen: S,
    prompt: Vec<(Line, i32, i32), PROMPT_LINES>,
}

impl<S: Screen> Presenter<S> {
    pub fn new(screen: S) -> Self {
        Self {
            screen,
            prompt: Vec::new(),
        }
    }

    /// Draw prompt `text` at (`x`, `y`), wiping the buffer first if `clear`.
    pub fn show(&mut self, text: &str, x: i32, y: i32, clear: bool) {
        if clear {
            self.prompt.clear();
        }
        // Lines past the last slot are drawn but not redrawn.
        let _ = self.prompt.push((line(format_args!("{}", text)), x, y));
        self.draw(text, x, y, clear);
    }

    /// Draw a status message without touching the remembered prompt.
    pub fn status(&mut self, text: &str, x: i32, y: i32, clear: bool) {
        self.draw(text, x, y, clear);
    }

    /// Redraw the last prompt. Returns `false` if there is none yet.
    pub fn restore(&mut self) -> bool {
        if self.prompt.is_empty() {
            return false;
        }
        self.screen.clear();
        for (text, x, y) in &self.prompt {
            self.screen.draw_text(text, *x, *y);
        }
        self.screen.flush();
        true
    }

    fn draw(&mut self, text: &str, x: i32, y: i32, clear: bool) {
        if clear {
            self.screen.clear();
        }
        self.screen.draw_text(text, x, y);
        self.screen.flush();
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }
}

/// Format a line, truncating on overflow.
pub fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut out = Line::new();
    let _ = out.write_fmt(args);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lines: std::vec::Vec<(std::string::String, i32, i32)>,
        clears: usize,
        flushes: usize,
    }

    impl Screen for Recorder {
        fn clear(&mut self) {
            self.clears += 1;
            self.lines.clear();
        }
        fn draw_text(&mut self, text: &str, x: i32, y: i32) {
            self.lines.push((text.into(), x, y));
        }
        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    #[test]
    fn clear_wipes_then_draws() {
        let mut p = Presenter::new(Recorder::default());
        p.show("one", 0, 0, true);
        p.show("two", 0, 20, false);
        p.show("three", 0, 0, true);

        let screen = p.screen();
        assert_eq!(screen.lines, vec![("three".into(), 0, 0)]);
        assert_eq!(screen.clears, 2);
        assert_eq!(screen.flushes, 3);
    }

    #[test]
    fn overlay_keeps_existing_text() {
        let mut p = Presenter::new(Recorder::default());
        p.show("Select Option:", 0, 0, true);
        p.show("> Take Attendance", 0, 20, false);

        assert_eq!(p.screen().lines.len(), 2);
        assert_eq!(p.screen().lines[1], ("> Take Attendance".into(), 0, 20));
    }

    #[test]
    fn restore_redraws_prompt_after_status() {
        let mut p = Presenter::new(Recorder::default());
        assert!(!p.restore());

        p.show("RNO: 1", 0, 0, true);
        p.show("Name: Asha", 0, 20, false);
        p.status("Connected to app", 0, 0, true);
        assert_eq!(p.screen().lines, vec![("Connected to app".into(), 0, 0)]);

        assert!(p.restore());
        assert_eq!(
            p.screen().lines,
            vec![("RNO: 1".into(), 0, 0), ("Name: Asha".into(), 0, 20)]
        );
        assert_eq!(p.screen().flushes, 4);
    }

    #[test]
    fn line_truncates_instead_of_failing() {
        let long = line(format_args!("{:>60}", "x"));
        assert!(long.len() <= LINE_CAPACITY);
        assert_eq!(line(format_args!("RNO: {}", 7)).as_str(), "RNO: 7");
    }
}
