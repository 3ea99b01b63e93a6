//! Store - concurrency-safe, file-backed task collection.
//!
//! The store keeps every task in memory behind a reader/writer lock and
//! persists the whole collection as one JSON document. Tasks only cross the
//! store boundary by value: inserts take ownership and every accessor hands
//! back an owned copy, so callers can never alias the stored state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Task, TaskStatus};
use crate::{tlog, tlog_debug, Error, Result};

const STORE_VERSION: u32 = 1;

/// Metadata describing the persisted collection as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreMetadata {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            version: STORE_VERSION,
            created_at: now,
            updated_at: now,
        }
    }
}

/// On-disk layout: `{ "metadata": {...}, "tasks": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreData {
    metadata: StoreMetadata,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl StoreData {
    fn new() -> Self {
        Self {
            metadata: StoreMetadata::new(),
            tasks: Vec::new(),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn insert(&mut self, mut task: Task) -> Result<()> {
        task.validate()?;
        if self.position(&task.id).is_some() {
            return Err(Error::DuplicateId(task.id));
        }
        if task.order == 0 {
            if let Some(max) = self.tasks.iter().map(|t| t.order).max() {
                // Saturates at u32::MAX; the tie still sorts after by position.
                task.order = max.saturating_add(1);
            }
        }
        tlog_debug!("Store::add id={} order={}", task.id, task.order);
        self.tasks.push(task);
        Ok(())
    }
}

/// Thread-safe task collection persisted to a single JSON file.
///
/// Reads take a shared lock and writes an exclusive one. File I/O only
/// happens in [`Store::load`] and [`Store::save`], both under the exclusive
/// lock. There is no cross-process locking: one process owns the file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl Store {
    /// Create an empty store backed by `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: RwLock::new(StoreData::new()),
        }
    }

    /// Create a store and load its backing file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the in-memory collection with the contents of the backing file.
    ///
    /// A missing file yields an empty collection.
    ///
    /// # Errors
    /// `CorruptStore` when the file is not a valid task document, holds an
    /// invalid task, or repeats an id.
    pub fn load(&self) -> Result<()> {
        let mut data = self.write();
        tlog_debug!("Store::load path={}", self.path.display());

        if !self.path.exists() {
            tlog_debug!("Task file not found, starting with empty store");
            *data = StoreData::new();
            return Ok(());
        }

        let contents = fs::read_to_string(&self.path)?;
        *data = self.parse(&contents)?;
        tlog!(
            "Store loaded: {} tasks from {}",
            data.tasks.len(),
            self.path.display()
        );
        Ok(())
    }

    fn parse(&self, contents: &str) -> Result<StoreData> {
        let corrupt = |reason: String| Error::CorruptStore {
            path: self.path.clone(),
            reason,
        };

        let data: StoreData = serde_json::from_str(contents).map_err(|e| corrupt(e.to_string()))?;

        let mut seen = HashSet::new();
        for task in &data.tasks {
            task.validate().map_err(|e| corrupt(e.to_string()))?;
            if !seen.insert(task.id.as_str()) {
                return Err(corrupt(format!("duplicate task id {}", task.id)));
            }
        }
        Ok(data)
    }

    /// Write the whole collection to disk.
    ///
    /// The document is written to a temporary sibling and renamed into place;
    /// an existing file is first copied to a `.bak` sibling.
    pub fn save(&self) -> Result<()> {
        let mut data = self.write();
        data.metadata.updated_at = Utc::now();
        let contents = serde_json::to_string_pretty(&*data)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tlog_debug!("Creating store directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }

        if self.path.exists() {
            fs::copy(&self.path, sibling(&self.path, "bak"))?;
        }

        let temp_path = sibling(&self.path, "tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)?;
        tlog_debug!(
            "Store saved: {} tasks to {}",
            data.tasks.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Insert a task.
    ///
    /// A task with order 0 is placed after every existing task (max + 1,
    /// saturating at `u32::MAX`).
    /// Explicit orders are kept as given, even when they collide.
    pub fn add(&self, task: Task) -> Result<()> {
        self.write().insert(task)
    }

    /// Insert tasks one after another.
    ///
    /// Not atomic: the first failure stops the batch and every task inserted
    /// before it stays in the store.
    pub fn add_all(&self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        let mut data = self.write();
        for task in tasks {
            data.insert(task)?;
        }
        Ok(())
    }

    /// Replace the stored task with the same id.
    pub fn update(&self, task: Task) -> Result<()> {
        task.validate()?;
        let mut data = self.write();
        let index = data
            .position(&task.id)
            .ok_or_else(|| Error::TaskNotFound(task.id.clone()))?;
        tlog_debug!("Store::update id={} status={}", task.id, task.status);
        data.tasks[index] = task;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut data = self.write();
        let index = data
            .position(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        data.tasks.remove(index);
        tlog_debug!("Store::delete id={}", id);
        Ok(())
    }

    pub fn clear(&self) {
        self.write().tasks.clear();
    }

    /// Replace the whole collection. Orders and ids are taken as given.
    ///
    /// Unlike `add_all` this is all-or-nothing: an invalid task or a repeated
    /// id leaves the current collection untouched.
    pub fn set_tasks(&self, tasks: Vec<Task>) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &tasks {
            task.validate()?;
            if !seen.insert(task.id.as_str()) {
                return Err(Error::DuplicateId(task.id.clone()));
            }
        }
        self.write().tasks = tasks;
        Ok(())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.read().position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Every task, in stored (insertion) order.
    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    pub fn count(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn count_by_status(&self, status: TaskStatus) -> usize {
        self.read()
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .count()
    }

    pub fn get_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.read()
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    pub fn metadata(&self) -> StoreMetadata {
        self.read().metadata.clone()
    }
}

/// `tasks.json` -> `tasks.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
