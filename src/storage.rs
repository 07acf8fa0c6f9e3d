//! Roster persistence.
//!
//! Storage is a flat set of named files behind the [`FileStore`] trait; the
//! flash-backed implementation lives with the board code. [`RosterStore`]
//! layers roster discovery, loading and saving on top of it: one JSON file
//! per class, rewritten whole on every save.

use heapless::Vec;

use crate::config::{MAX_CLASSES, ROSTER_FILE_CAPACITY};
use crate::error::StoreError;
use crate::roster::{is_roster_file, ClassId, Roster};

/// Flat, named file storage.
#[allow(async_fn_in_trait)]
pub trait FileStore {
    /// Names of every stored file, in storage order.
    async fn list(&mut self) -> Result<Vec<ClassId, MAX_CLASSES>, StoreError>;

    /// Read the file `name` into `buf`, returning its length.
    ///
    /// Fails with [`StoreError::NotFound`] if absent and [`StoreError::Io`]
    /// if it does not fit `buf`.
    async fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Replace the file `name` with `data` in one write, creating it if needed.
    async fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// Loads and saves class rosters.
pub struct RosterStore<F> {
    files: F,
}

impl<F: FileStore> RosterStore<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    /// Roster files present in storage, in storage order.
    pub async fn list_available(&mut self) -> Result<Vec<ClassId, MAX_CLASSES>, StoreError> {
        let mut rosters = self.files.list().await?;
        rosters.retain(|name| is_roster_file(name));
        debug!("{} roster files available", rosters.len());
        Ok(rosters)
    }

    pub async fn load(&mut self, id: &ClassId) -> Result<Roster, StoreError> {
        let mut buf = [0u8; ROSTER_FILE_CAPACITY];
        let len = self.files.read(id, &mut buf).await.map_err(|e| {
            warn!("roster {} read failed: {}", id.as_str(), e);
            e
        })?;
        let roster = Roster::parse(id.clone(), &buf[..len]).map_err(|e| {
            warn!("roster {} is malformed", id.as_str());
            e
        })?;
        info!("loaded {} ({} students)", id.as_str(), roster.len());
        Ok(roster)
    }

    /// Overwrite the roster's file with its full current content.
    pub async fn save(&mut self, roster: &Roster) -> Result<(), StoreError> {
        let mut buf = [0u8; ROSTER_FILE_CAPACITY];
        let len = roster.encode(&mut buf)?;
        self.files.write(roster.id(), &buf[..len]).await?;
        info!("saved {} ({} bytes)", roster.id().as_str(), len);
        Ok(())
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut F {
        &mut self.files
    }
}
