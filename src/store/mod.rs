// Metadata store - a flat JSON file holding the whole painting collection.
//
// load() re-reads the file on every call and save() rewrites it wholesale.
// That is the deliberate simplicity tradeoff for a single-process,
// human-scale catalog. Mutations serialize the read-modify-write cycle
// through a per-store mutex so two concurrent uploads cannot drop a record.
mod error;
mod types;

pub use error::StoreError;
pub use types::{GalleryStats, PaintingRecord};

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub type SharedStore = Arc<PaintingStore>;

pub struct PaintingStore {
    data_file: PathBuf,
    write_lock: Mutex<()>,
}

impl PaintingStore {
    pub fn new(data_file: PathBuf) -> Self {
        Self {
            data_file,
            write_lock: Mutex::new(()),
        }
    }

    pub fn data_file(&self) -> &PathBuf {
        &self.data_file
    }

    /// Read the full collection in on-disk (insertion) order.
    ///
    /// A missing file is an empty collection. A corrupt file is logged and
    /// treated as an empty collection; the file itself is left in place.
    pub async fn load(&self) -> Result<Vec<PaintingRecord>, StoreError> {
        let json = match tokio::fs::read_to_string(&self.data_file).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Data file {:?} not found, starting empty", self.data_file);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&json) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    "Data file {:?} is not valid JSON ({}), treating as empty",
                    self.data_file, e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Serialize the whole collection and overwrite the data file.
    pub async fn save(&self, records: &[PaintingRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.data_file, json).await?;
        Ok(())
    }

    /// Full collection sorted by date descending. Presentation order is
    /// computed here, never persisted.
    pub async fn list(&self) -> Result<Vec<PaintingRecord>, StoreError> {
        let mut records = self.load().await?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<PaintingRecord, StoreError> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)
    }

    pub async fn add(&self, record: PaintingRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.push(record);
        self.save(&records).await
    }

    pub async fn update_date(
        &self,
        id: &str,
        date: DateTime<Utc>,
    ) -> Result<PaintingRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        record.date = date;
        let updated = record.clone();
        self.save(&records).await?;
        Ok(updated)
    }

    /// Remove a record and return it so the caller can clean up its file.
    pub async fn remove(&self, id: &str) -> Result<PaintingRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        let removed = records.remove(index);
        self.save(&records).await?;
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<GalleryStats, StoreError> {
        let records = self.load().await?;
        Ok(GalleryStats {
            total_paintings: records.len(),
            total_size: records.iter().map(|r| r.size).sum(),
            first_painting: records.iter().map(|r| r.date).min(),
            latest_painting: records.iter().map(|r| r.date).max(),
        })
    }
}
