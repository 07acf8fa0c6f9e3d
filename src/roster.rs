//! Class roster model and its JSON file format.
//!
//! A roster file is a JSON array of records:
//!
//! ```text
//! [{"rno":1,"name":"Asha","attendance":"Present"},{"rno":2,"name":"Ravi"}]
//! ```
//!
//! `attendance` is omitted (or `null`) until the student has been marked;
//! whichever form a record used is written back unchanged. Encoding is
//! compact and keeps the file's record order, so a compact roster that was
//! loaded and saved without marking comes back byte-identical.

use heapless::{String, Vec};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{FILE_NAME_CAPACITY, MAX_STUDENTS, ROSTER_FILE_SUFFIX, STUDENT_NAME_CAPACITY};
use crate::error::StoreError;

/// Storage file name identifying a class, e.g. `cse-a.json`.
pub type ClassId = String<FILE_NAME_CAPACITY>;

/// A student's attendance for the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attendance {
    /// Not marked yet.
    #[default]
    Unset,
    Present,
    Absent,
}

/// A marking decision taken at the keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mark {
    Present,
    Absent,
}

impl From<Mark> for Attendance {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Present => Attendance::Present,
            Mark::Absent => Attendance::Absent,
        }
    }
}

impl Attendance {
    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Unset => "Unset",
            Attendance::Present => "Present",
            Attendance::Absent => "Absent",
        }
    }
}

/// What a record's `attendance` key holds on disk.
///
/// A missing key and an explicit `null` both mean "not marked", but they
/// are kept apart so an unmarked record is written back the way it came.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Recorded {
    #[default]
    Missing,
    Null,
    Marked(Mark),
}

impl Recorded {
    fn is_missing(&self) -> bool {
        matches!(self, Recorded::Missing)
    }
}

impl Serialize for Recorded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recorded::Missing | Recorded::Null => serializer.serialize_none(),
            Recorded::Marked(mark) => mark.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Recorded {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only called when the key is present.
        Ok(Option::<Mark>::deserialize(deserializer)?.map_or(Recorded::Null, Recorded::Marked))
    }
}

/// One roster record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Student {
    #[serde(rename = "rno")]
    pub roll_number: u32,
    pub name: String<STUDENT_NAME_CAPACITY>,
    #[serde(default, skip_serializing_if = "Recorded::is_missing")]
    attendance: Recorded,
}

impl Student {
    pub fn attendance(&self) -> Attendance {
        match self.attendance {
            Recorded::Missing | Recorded::Null => Attendance::Unset,
            Recorded::Marked(mark) => mark.into(),
        }
    }
}

/// The ordered students of one class.
///
/// Students can only be marked, never added, removed or reordered, so a
/// session cannot change the roster's length or identities.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Roster {
    id: ClassId,
    students: Vec<Student, MAX_STUDENTS>,
}

impl Roster {
    /// Decode a roster file.
    pub fn parse(id: ClassId, bytes: &[u8]) -> Result<Self, StoreError> {
        let (students, _) = serde_json_core::from_slice::<Vec<Student, MAX_STUDENTS>>(bytes)
            .map_err(|_| StoreError::Format)?;
        Ok(Self { id, students })
    }

    /// Encode into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, StoreError> {
        serde_json_core::to_slice(&self.students, buf).map_err(|_| StoreError::Io)
    }

    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// File name without the `.json` suffix.
    pub fn class_name(&self) -> &str {
        class_name(&self.id)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Record `mark` for the student at `index`. Returns `false` if out of range.
    pub fn mark(&mut self, index: usize, mark: Mark) -> bool {
        match self.students.get_mut(index) {
            Some(student) => {
                student.attendance = Recorded::Marked(mark);
                true
            }
            None => false,
        }
    }

    pub fn count(&self, attendance: Attendance) -> usize {
        self.students
            .iter()
            .filter(|s| s.attendance() == attendance)
            .count()
    }
}

/// Strip the roster suffix from a file name.
pub fn class_name(id: &str) -> &str {
    id.strip_suffix(ROSTER_FILE_SUFFIX).unwrap_or(id)
}

/// Whether a storage file name looks like a roster.
pub fn is_roster_file(name: &str) -> bool {
    name.len() > ROSTER_FILE_SUFFIX.len() && name.ends_with(ROSTER_FILE_SUFFIX)
}
