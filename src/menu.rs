//! Top-level menu.
//!
//! `Idle` shows the highlighted action; `C`/`D` move the highlight (with
//! wrap-around) and `#` dispatches it. A dispatched action owns the main
//! loop until it returns, then the menu is shown again. The menu itself
//! never exits.

use embedded_hal_async::delay::DelayNs;

use crate::attendance::{AttendanceSession, SessionOutcome};
use crate::config::DISPATCH_BANNER_MS;
use crate::console::Console;
use crate::error::ServerError;
use crate::http::{FileServer, HttpTransport};
use crate::keypad::{Command, KeyScan};
use crate::link::LinkRadio;
use crate::storage::{FileStore, RosterStore};
use crate::ui::input_logic::{Selection, SelectionStep};
use crate::ui::{line, Screen};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuAction {
    TakeAttendance,
    TransferData,
}

/// Menu entries in display order.
pub const MENU_ACTIONS: [MenuAction; 2] = [MenuAction::TakeAttendance, MenuAction::TransferData];

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::TakeAttendance => "Take Attendance",
            MenuAction::TransferData => "Transfer File",
        }
    }

    fn banner(self) -> &'static str {
        match self {
            MenuAction::TakeAttendance => "Starting Attendance...",
            MenuAction::TransferData => "Starting Transfer...",
        }
    }
}

/// What a dispatched action returned with.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatched<E> {
    Attendance(SessionOutcome),
    /// The file server only returns when it cannot start.
    Transfer(ServerError<E>),
}

pub struct MenuController {
    selection: Selection,
}

impl Default for MenuController {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuController {
    pub const fn new() -> Self {
        Self {
            selection: Selection::new(MENU_ACTIONS.len()),
        }
    }

    pub fn selected(&self) -> MenuAction {
        MENU_ACTIONS[self.selection.index()]
    }

    /// Move the highlight, or return the action to dispatch.
    pub fn handle(&mut self, command: Command) -> Option<MenuAction> {
        match self.selection.apply(command) {
            SelectionStep::Chosen(i) => Some(MENU_ACTIONS[i]),
            SelectionStep::Moved(_) | SelectionStep::Ignored => None,
        }
    }

    pub fn render<K, S, R, D>(&self, console: &mut Console<'_, K, S, R, D>)
    where
        K: KeyScan,
        S: Screen,
        R: LinkRadio,
        D: DelayNs,
    {
        console.show("Select Option:", 0, 0, true);
        console.show(&line(format_args!("> {}", self.selected().label())), 0, 20, false);
    }

    /// Show the menu, wait for one command and act on it.
    ///
    /// Returns what the dispatched action reported, or `None` if the command
    /// only moved the highlight.
    pub async fn step<K, S, R, D, F, T>(
        &mut self,
        console: &mut Console<'_, K, S, R, D>,
        store: &mut RosterStore<F>,
        server: &mut FileServer<T>,
    ) -> Option<Dispatched<T::Error>>
    where
        K: KeyScan,
        S: Screen,
        R: LinkRadio,
        D: DelayNs,
        F: FileStore,
        T: HttpTransport,
    {
        self.render(console);
        let action = self.handle(console.next_command().await)?;
        info!("dispatch {}", action);

        console.show(action.banner(), 0, 0, true);
        console.pause(DISPATCH_BANNER_MS).await;

        let result = match action {
            MenuAction::TakeAttendance => {
                let outcome = AttendanceSession::new(store).run(console).await;
                info!("session ended: {}", outcome);
                Dispatched::Attendance(outcome)
            }
            MenuAction::TransferData => {
                Dispatched::Transfer(server.run(console, store.files_mut()).await)
            }
        };
        Some(result)
    }

    /// Run the menu. Never returns.
    pub async fn run<K, S, R, D, F, T>(
        &mut self,
        console: &mut Console<'_, K, S, R, D>,
        store: &mut RosterStore<F>,
        server: &mut FileServer<T>,
    ) where
        K: KeyScan,
        S: Screen,
        R: LinkRadio,
        D: DelayNs,
        F: FileStore,
        T: HttpTransport,
    {
        loop {
            let _ = self.step(console, store, server).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypad::Key;
    use crate::link::{LinkEvents, LinkNotifier};
    use crate::storage::tests::MemFiles;
    use crate::testing::{Clock, Lines, Radio, ScriptedKeys};
    use crate::ui::Presenter;
    use embassy_futures::block_on;

    struct NoNetwork;

    impl HttpTransport for NoNetwork {
        type Error = ();
        async fn start(&mut self) -> Result<(), ()> {
            Err(())
        }
        async fn accept(&mut self) -> Result<(), ()> {
            Err(())
        }
        async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
            Err(())
        }
        async fn write_all(&mut self, _data: &[u8]) -> Result<(), ()> {
            Err(())
        }
        async fn close(&mut self) {}
    }

    fn console<'a>(
        events: &'a LinkEvents,
        keys: &[Key],
    ) -> Console<'a, ScriptedKeys, Lines, Radio, Clock> {
        Console::new(
            ScriptedKeys::presses(keys),
            Presenter::new(Lines::default()),
            LinkNotifier::new(events, Radio::default()),
            Clock::default(),
        )
    }

    #[test]
    fn navigation_wraps_in_both_directions() {
        let mut menu = MenuController::new();
        for _ in 0..MENU_ACTIONS.len() {
            assert_eq!(menu.handle(Command::Next), None);
        }
        assert_eq!(menu.selected(), MenuAction::TakeAttendance);
        assert_eq!(menu.handle(Command::Previous), None);
        assert_eq!(menu.selected(), MenuAction::TransferData);
        assert_eq!(menu.handle(Command::Present), None);
        assert_eq!(menu.handle(Command::Select), Some(MenuAction::TransferData));
    }

    #[test]
    fn idle_renders_highlighted_action() {
        let events = LinkEvents::new();
        let mut c = console(&events, &[Key::D]);
        let mut store = RosterStore::new(MemFiles::default());
        let mut server = FileServer::new(NoNetwork);
        let mut menu = MenuController::new();

        assert_eq!(block_on(menu.step(&mut c, &mut store, &mut server)), None);
        assert_eq!(c.presenter().screen().texts(), ["Select Option:", "> Take Attendance"]);

        menu.render(&mut c);
        assert_eq!(c.presenter().screen().texts(), ["Select Option:", "> Transfer File"]);
    }

    #[test]
    fn take_attendance_without_rosters_returns_to_idle() {
        let events = LinkEvents::new();
        let mut c = console(&events, &[Key::Hash]);
        let mut store = RosterStore::new(MemFiles::default());
        let mut server = FileServer::new(NoNetwork);
        let mut menu = MenuController::new();

        let result = block_on(menu.step(&mut c, &mut store, &mut server));

        assert_eq!(result, Some(Dispatched::Attendance(SessionOutcome::NoClasses)));
        assert!(c.presenter().screen().showed("Starting Attendance..."));
        assert_eq!(c.presenter().screen().texts(), ["No classes found!"]);
        assert_eq!(menu.selected(), MenuAction::TakeAttendance);
    }

    #[test]
    fn transfer_that_cannot_start_returns_to_idle() {
        let events = LinkEvents::new();
        let mut c = console(&events, &[Key::D, Key::Hash]);
        let mut store = RosterStore::new(MemFiles::default());
        let mut server = FileServer::new(NoNetwork);
        let mut menu = MenuController::new();

        assert_eq!(block_on(menu.step(&mut c, &mut store, &mut server)), None);
        let result = block_on(menu.step(&mut c, &mut store, &mut server));

        assert_eq!(result, Some(Dispatched::Transfer(ServerError::Start(()))));
        assert!(c.presenter().screen().showed("Starting Transfer..."));
    }
}
