//! Roster files in the ESP32's data partition.
//!
//! Uses `sequential-storage`'s key-value map over the first `spiffs` data
//! partition, so wear levelling and garbage collection are handled for us.
//!
//! Storage layout:
//!   - Key 0 holds the directory: file names separated by `\n`.
//!   - Key n (1-based) holds the bytes of the n-th directory entry.
//!   - Writing a file stores a new copy of its item; the map keeps only the
//!     latest copy per key.

use core::ops::Range;

use defmt::{debug, error, info};
use embassy_embedded_hal::adapter::BlockingAsync;
use esp_bootloader_esp_idf::partitions::{
    self, DataPartitionSubType, FlashRegion, PartitionType, PARTITION_TABLE_MAX_LEN,
};
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;
use heapless::{String, Vec};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};
use static_cell::StaticCell;

use attendance_kiosk::config::{FILE_NAME_CAPACITY, MAX_CLASSES, ROSTER_FILE_CAPACITY};
use attendance_kiosk::roster::ClassId;
use attendance_kiosk::{FileStore, StoreError};

/// Key of the directory item.
const DIRECTORY_KEY: u8 = 0;

/// Serialized directory: one name plus separator per entry.
const DIRECTORY_CAPACITY: usize = MAX_CLASSES * (FILE_NAME_CAPACITY + 1);

/// Largest item plus `sequential-storage` item header and key.
const ITEM_BUFFER_SIZE: usize = ROSTER_FILE_CAPACITY + 64;

type Region = FlashRegion<'static, FlashStorage<'static>>;

static FLASH_STORAGE: StaticCell<FlashStorage<'static>> = StaticCell::new();
static PARTITION_TABLE: StaticCell<[u8; PARTITION_TABLE_MAX_LEN]> = StaticCell::new();

pub struct FlashFiles {
    flash: BlockingAsync<Region>,
    range: Range<u32>,
    buf: [u8; ITEM_BUFFER_SIZE],
}

impl FlashFiles {
    /// Locate the data partition and take it over.
    pub fn mount(flash: FLASH<'static>) -> Result<Self, StoreError> {
        let flash = FLASH_STORAGE.init(FlashStorage::new(flash).multicore_auto_park());
        let table_mem = PARTITION_TABLE.init([0u8; PARTITION_TABLE_MAX_LEN]);
        let table = partitions::read_partition_table(flash, table_mem).map_err(|e| {
            error!("partition table unreadable: {:?}", defmt::Debug2Format(&e));
            StoreError::Io
        })?;
        let entry = table
            .find_partition(PartitionType::Data(DataPartitionSubType::Spiffs))
            .map_err(|_| StoreError::Io)?
            .ok_or(StoreError::NotFound)?;

        let size = entry.len();
        info!("roster partition at 0x{:x} ({} bytes)", entry.offset(), size);
        Ok(Self {
            flash: BlockingAsync::new(entry.as_embedded_storage(flash)),
            range: 0..size,
            buf: [0u8; ITEM_BUFFER_SIZE],
        })
    }

    async fn directory(&mut self) -> Result<Vec<ClassId, MAX_CLASSES>, StoreError> {
        let raw = fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buf,
            &DIRECTORY_KEY,
        )
        .await
        .map_err(|e| {
            error!("directory read failed: {:?}", defmt::Debug2Format(&e));
            StoreError::Io
        })?;

        let mut names = Vec::new();
        let Some(raw) = raw else {
            return Ok(names);
        };
        let text = core::str::from_utf8(raw).map_err(|_| StoreError::Io)?;
        for name in text.split('\n').filter(|n| !n.is_empty()) {
            let name = ClassId::try_from(name).map_err(|_| StoreError::Io)?;
            names.push(name).map_err(|_| StoreError::Io)?;
        }
        Ok(names)
    }

    async fn store(&mut self, key: u8, data: &[u8]) -> Result<(), StoreError> {
        store_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buf,
            &key,
            &data,
        )
        .await
        .map_err(|e| {
            error!("flash write of key {} failed: {:?}", key, defmt::Debug2Format(&e));
            StoreError::Io
        })
    }
}

/// Item key of the file at `index` in the directory.
fn file_key(index: usize) -> u8 {
    index as u8 + 1
}

impl FileStore for FlashFiles {
    async fn list(&mut self) -> Result<Vec<ClassId, MAX_CLASSES>, StoreError> {
        self.directory().await
    }

    async fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
        let directory = self.directory().await?;
        let index = directory
            .iter()
            .position(|n| n == name)
            .ok_or(StoreError::NotFound)?;

        let data = fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buf,
            &file_key(index),
        )
        .await
        .map_err(|e| {
            error!("flash read of {} failed: {:?}", name, defmt::Debug2Format(&e));
            StoreError::Io
        })?
        .ok_or(StoreError::NotFound)?;

        let dst = buf.get_mut(..data.len()).ok_or(StoreError::Io)?;
        dst.copy_from_slice(data);
        debug!("read {} ({} bytes)", name, data.len());
        Ok(data.len())
    }

    async fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut directory = self.directory().await?;
        let index = match directory.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                let entry = ClassId::try_from(name).map_err(|_| StoreError::Io)?;
                directory.push(entry).map_err(|_| StoreError::Io)?;
                directory.len() - 1
            }
        };

        // Data first: a failed write never leaves a directory entry
        // pointing at nothing.
        self.store(file_key(index), data).await?;

        let mut listing: String<DIRECTORY_CAPACITY> = String::new();
        for entry in &directory {
            let _ = listing.push_str(entry);
            let _ = listing.push('\n');
        }
        self.store(DIRECTORY_KEY, listing.as_bytes()).await
    }
}
