//! Concurrent map of opponent records.
//!
//! The map lock is only held long enough to find or insert a record handle;
//! all work on a record happens under that record's own mutex, so different
//! opponents never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::debug;

use super::record::OpponentRecord;
use crate::error::EngineError;

pub type RecordHandle = Arc<Mutex<OpponentRecord>>;

#[derive(Debug)]
pub struct OpponentStore {
    window: usize,
    records: RwLock<HashMap<String, RecordHandle>>,
}

impl OpponentStore {
    pub fn new(window: usize) -> Self {
        OpponentStore {
            window,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the record for `opponent`, creating an empty one on first
    /// contact.
    pub fn handle(&self, opponent: &str) -> Result<RecordHandle, EngineError> {
        if let Some(handle) = self.get(opponent)? {
            return Ok(handle);
        }
        let mut records = self
            .records
            .write()
            .map_err(|_| poisoned("opponent map"))?;
        let handle = records.entry(opponent.to_string()).or_insert_with(|| {
            debug!("new opponent record for '{opponent}'");
            Arc::new(Mutex::new(OpponentRecord::new(self.window)))
        });
        Ok(Arc::clone(handle))
    }

    /// Returns the record for `opponent` if one exists.
    pub fn get(&self, opponent: &str) -> Result<Option<RecordHandle>, EngineError> {
        let records = self.records.read().map_err(|_| poisoned("opponent map"))?;
        Ok(records.get(opponent).map(Arc::clone))
    }

    /// Drops everything learned about `opponent`. Returns whether a record
    /// existed.
    pub fn reset(&self, opponent: &str) -> Result<bool, EngineError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| poisoned("opponent map"))?;
        Ok(records.remove(opponent).is_some())
    }

    /// Known opponent ids, sorted.
    pub fn ids(&self) -> Result<Vec<String>, EngineError> {
        let records = self.records.read().map_err(|_| poisoned("opponent map"))?;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn len(&self) -> Result<usize, EngineError> {
        Ok(self
            .records
            .read()
            .map_err(|_| poisoned("opponent map"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.len()? == 0)
    }
}

/// Locks a record, turning a poisoned mutex into `StateCorruption`.
pub fn lock_record(handle: &RecordHandle) -> Result<MutexGuard<'_, OpponentRecord>, EngineError> {
    handle.lock().map_err(|_| poisoned("opponent record"))
}

pub(crate) fn poisoned(what: &str) -> EngineError {
    EngineError::StateCorruption(format!("{what} lock poisoned"))
}
