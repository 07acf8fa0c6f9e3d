//! Attendance session: pick a class, mark every student, save.
//!
//! The session has two phases. **Class selection** cycles over the roster
//! files in storage with the same keys as the main menu. **Marking** walks
//! the loaded roster in file order and prompts once per student until
//! `A` (present) or `B` (absent) is pressed. There is no skip and no going
//! back; after the last student the whole roster is saved in one write.
//!
//! Storage failures abort the session with a message on screen. Nothing is
//! marked against a roster that failed to load.

use embedded_hal_async::delay::DelayNs;

use crate::config::{MARK_CONFIRM_HOLD_MS, RESULT_HOLD_MS};
use crate::console::Console;
use crate::error::StoreError;
use crate::keypad::{Command, KeyScan};
use crate::link::LinkRadio;
use crate::roster::{Attendance, ClassId, Mark, Roster};
use crate::storage::{FileStore, RosterStore};
use crate::ui::input_logic::{Selection, SelectionStep};
use crate::ui::{line, Screen};

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionOutcome {
    /// Storage holds no roster files.
    NoClasses,
    /// Listing, loading or saving failed; nothing was persisted.
    Failed(StoreError),
    /// Every student was marked and the roster saved.
    Saved { present: usize, absent: usize },
}

/// One pass through class selection and marking.
pub struct AttendanceSession<'s, F> {
    store: &'s mut RosterStore<F>,
}

impl<'s, F: FileStore> AttendanceSession<'s, F> {
    pub fn new(store: &'s mut RosterStore<F>) -> Self {
        Self { store }
    }

    pub async fn run<K, S, R, D>(&mut self, console: &mut Console<'_, K, S, R, D>) -> SessionOutcome
    where
        K: KeyScan,
        S: Screen,
        R: LinkRadio,
        D: DelayNs,
    {
        let classes = match self.store.list_available().await {
            Ok(classes) => classes,
            Err(e) => return fail(console, e, e.message()).await,
        };
        if classes.is_empty() {
            info!("no roster files");
            console.show("No classes found!", 0, 0, true);
            console.pause(RESULT_HOLD_MS).await;
            return SessionOutcome::NoClasses;
        }

        let class = select_class(console, &classes).await;
        info!("class selected: {}", class.as_str());

        let mut roster = match self.store.load(class).await {
            Ok(roster) => roster,
            Err(e) => return fail(console, e, e.message()).await,
        };

        mark_all(console, &mut roster).await;

        if let Err(e) = self.store.save(&roster).await {
            return fail(console, e, "Save failed!").await;
        }
        let present = roster.count(Attendance::Present);
        let absent = roster.count(Attendance::Absent);
        info!("attendance saved: {} present, {} absent", present, absent);
        console.show("Attendance saved!", 0, 0, true);
        console.pause(RESULT_HOLD_MS).await;
        SessionOutcome::Saved { present, absent }
    }
}

async fn fail<K, S, R, D>(
    console: &mut Console<'_, K, S, R, D>,
    error: StoreError,
    message: &str,
) -> SessionOutcome
where
    K: KeyScan,
    S: Screen,
    R: LinkRadio,
    D: DelayNs,
{
    warn!("session aborted: {}", error);
    console.show(message, 0, 0, true);
    console.pause(RESULT_HOLD_MS).await;
    SessionOutcome::Failed(error)
}

/// Cycle through `classes` until one is chosen. `classes` must be non-empty.
async fn select_class<'c, K, S, R, D>(
    console: &mut Console<'_, K, S, R, D>,
    classes: &'c [ClassId],
) -> &'c ClassId
where
    K: KeyScan,
    S: Screen,
    R: LinkRadio,
    D: DelayNs,
{
    let mut selection = Selection::new(classes.len());
    loop {
        console.show("Select Class:", 0, 0, true);
        console.show(&line(format_args!("> {}", classes[selection.index()])), 0, 20, false);
        loop {
            match selection.apply(console.next_command().await) {
                SelectionStep::Moved(_) => break,
                SelectionStep::Chosen(i) => return &classes[i],
                SelectionStep::Ignored => {}
            }
        }
    }
}

async fn mark_all<K, S, R, D>(console: &mut Console<'_, K, S, R, D>, roster: &mut Roster)
where
    K: KeyScan,
    S: Screen,
    R: LinkRadio,
    D: DelayNs,
{
    for index in 0..roster.len() {
        let student = &roster.students()[index];
        let rno = line(format_args!("RNO: {}", student.roll_number));
        console.show(&rno, 0, 0, true);
        console.show(&line(format_args!("Name: {}", student.name)), 0, 20, false);
        console.show("A:Present B:Absent", 0, 40, false);

        let mark = loop {
            match console.next_command().await {
                Command::Present => break Mark::Present,
                Command::Absent => break Mark::Absent,
                _ => {}
            }
        };
        roster.mark(index, mark);
        info!("rno {} marked {}", roster.students()[index].roll_number, mark);

        let status = Attendance::from(mark).as_str();
        console.show(&rno, 0, 0, true);
        console.show(&line(format_args!("Status: {}", status)), 0, 20, false);
        console.pause(MARK_CONFIRM_HOLD_MS).await;
    }
}
