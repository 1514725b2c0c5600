//! Chunk persistence.
//!
//! All saved chunks live in one JSON object keyed `"{cx}_{cy}"`, each value a
//! [`ChunkRecord`]. Saving merges into whatever the file already holds, so a
//! world that evicted part of its map does not erase what was saved earlier.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StorageError;
use crate::world::chunk::{Chunk, ChunkRecord};
use crate::world::coords::ChunkPos;

/// Storage manager for a single chunk file.
#[derive(Clone, Debug)]
pub struct ChunkStorage {
    path: PathBuf,
}

impl ChunkStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every record in the file. A missing file is an empty map.
    pub fn load_records(&self) -> Result<BTreeMap<ChunkPos, ChunkRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let raw: BTreeMap<String, ChunkRecord> = serde_json::from_reader(reader)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;

        let mut records = BTreeMap::new();
        for (key, record) in raw {
            let pos = ChunkPos::from_key(&key).ok_or_else(|| StorageError::BadKey(key.clone()))?;
            if (pos.x, pos.y) != record.coordinates {
                return Err(StorageError::BadKey(key));
            }
            records.insert(pos, record);
        }
        debug!(path = %self.path.display(), count = records.len(), "loaded chunk records");
        Ok(records)
    }

    /// Load a single record, if saved.
    pub fn load_record(&self, pos: ChunkPos) -> Result<Option<ChunkRecord>, StorageError> {
        Ok(self.load_records()?.remove(&pos))
    }

    /// Merge `chunks` into the file, overwriting records with the same key.
    /// Returns the number of records now stored.
    pub fn save_chunks<'a>(&self, chunks: impl IntoIterator<Item = &'a Chunk>) -> Result<usize, StorageError> {
        let mut records = self.load_records()?;
        for chunk in chunks {
            records.insert(chunk.pos(), chunk.to_record());
        }
        self.write(&records)?;
        info!(path = %self.path.display(), count = records.len(), "saved chunks");
        Ok(records.len())
    }

    fn write(&self, records: &BTreeMap<ChunkPos, ChunkRecord>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let keyed: BTreeMap<String, &ChunkRecord> =
            records.iter().map(|(pos, record)| (pos.key(), record)).collect();
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(writer, &keyed).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// List all saved chunk coordinates.
    pub fn list_chunks(&self) -> Result<Vec<ChunkPos>, StorageError> {
        Ok(self.load_records()?.into_keys().collect())
    }

    /// Delete the file (if it exists).
    pub fn clear(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
