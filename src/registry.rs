//! Registry of open spreadsheet files.
//!
//! Every `open` yields a fresh [`FileHandle`] under a new decimal identifier. The registry is the
//! only long-lived owner of a handle; operations borrow it through an `Arc` for their own
//! duration, so a close never pulls a workbook from under a running request.

use crate::config::ReaderConfig;
use crate::error::ExdSheetError;
use crate::helpers::locator;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::structure::discover::discover;
use crate::structure::hints::HintPolicy;
use crate::structure::hints::MeanLengthHints;
use crate::structure::Schema;
use log::debug;
use log::info;
use log::warn;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// One open spreadsheet together with its lazily discovered schema
pub struct FileHandle {
    id: String,
    locator: String,
    path: PathBuf,
    file_name: String,
    /// Container readers need `&mut` for every part they read
    spreadsheet: Mutex<Box<dyn Spreadsheet>>,
    schema: OnceCell<Schema>,
    /// Parsed sheets, keyed by sheet index
    sheets: RwLock<HashMap<usize, Arc<Sheet>>>,
    config: Arc<ReaderConfig>,
    policy: Arc<dyn HintPolicy>,
}

impl FileHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Locator the handle was opened with
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Returns the schema, discovering it on first use.
    ///
    /// Concurrent first calls wait for a single discovery; later calls do not lock.
    pub fn schema(&self) -> Result<&Schema, ExdSheetError> {
        self.schema.get_or_try_init(|| -> Result<Schema, ExdSheetError> {
            let mut spreadsheet = self.spreadsheet.lock();
            let discovery = discover(spreadsheet.as_mut(), self.config.analyze_rows, self.policy.as_ref())
                .map_err(|error| error.into_unreadable(&self.file_name))?;
            if self.config.cache_sheets {
                let mut sheets = self.sheets.write();
                for (sheet_index, sheet) in discovery.sheets {
                    sheets.insert(sheet_index, Arc::new(sheet));
                }
            }
            debug!(
                "Handle {}: discovered {} groups in '{}'",
                self.id,
                discovery.schema.groups.len(),
                self.file_name,
            );
            Ok(discovery.schema)
        })
    }

    /// Returns a sheet read at least as far as `criteria` asks.
    ///
    /// A cached sheet is reused when it covers the request; otherwise the sheet is read from the
    /// open workbook and, with sheet caching enabled, kept for later requests.
    pub(crate) fn sheet(&self, sheet_index: usize, criteria: Criteria) -> Result<Arc<Sheet>, ExdSheetError> {
        let cached = self.sheets
            .read()
            .get(&sheet_index)
            .filter(|sheet| sheet.criteria.covers(&criteria))
            .cloned();
        if let Some(sheet) = cached {
            return Ok(sheet);
        }

        let sheet = {
            let mut spreadsheet = self.spreadsheet.lock();
            spreadsheet
                .read_resolved_sheet(sheet_index, &criteria)
                .map_err(|error| error.into_unreadable(&self.file_name))?
        };
        let sheet = Arc::new(sheet);
        if self.config.cache_sheets {
            self.sheets.write().insert(sheet_index, sheet.clone());
        }
        Ok(sheet)
    }

    /// Number of sheets currently cached
    pub(crate) fn cached_sheets(&self) -> usize {
        self.sheets.read().len()
    }

    /// Drops cached sheets; the workbook goes with the last reference to the handle.
    fn release(&self) {
        self.sheets.write().clear();
    }
}

/// Maps handle identifiers to open files
pub struct Registry {
    handles: RwLock<HashMap<String, Arc<FileHandle>>>,
    counter: AtomicU64,
    config: Arc<ReaderConfig>,
    policy: Arc<dyn HintPolicy>,
}

impl Registry {
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_policy(config, Arc::new(MeanLengthHints))
    }

    /// Creates a registry whose handles classify hint rows with `policy`.
    pub fn with_policy(config: ReaderConfig, policy: Arc<dyn HintPolicy>) -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            config: Arc::new(config),
            policy,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Opens a spreadsheet and registers it under a new handle.
    ///
    /// # Arguments
    /// * `locator` - `file://` URI or path, relative paths resolve against the base directory
    ///
    /// # Returns
    /// * `Result<Arc<FileHandle>, ExdSheetError>` - `NotFound` when the locator names no file,
    ///   `Unreadable` when the file is no supported spreadsheet
    pub fn open(&self, locator: &str) -> Result<Arc<FileHandle>, ExdSheetError> {
        let path = locator::resolve(locator, &self.config.base_dir)?;
        let file_name = locator::file_name(&path);
        let spreadsheet = open_spreadsheet(&path).map_err(|error| error.into_unreadable(&file_name))?;

        let id = (self.counter.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let handle = Arc::new(FileHandle {
            id: id.to_owned(),
            locator: locator.to_owned(),
            path: path.to_owned(),
            file_name,
            spreadsheet: Mutex::new(spreadsheet),
            schema: OnceCell::new(),
            sheets: RwLock::new(HashMap::new()),
            config: self.config.clone(),
            policy: self.policy.clone(),
        });
        self.handles.write().insert(id.to_owned(), handle.clone());
        info!("Opened '{}' as handle {}", path.display(), id);
        Ok(handle)
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<FileHandle>, ExdSheetError> {
        self.handles
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ExdSheetError::InvalidHandle(id.to_owned()))
    }

    /// Closes a handle. Unknown and already closed handles fail with `InvalidHandle`.
    pub fn close(&self, id: &str) -> Result<(), ExdSheetError> {
        let removed = self.handles.write().remove(id);
        match removed {
            Some(handle) => {
                handle.release();
                info!("Closed handle {} ('{}')", id, handle.path.display());
                Ok(())
            }
            None => {
                warn!("Close of unknown handle {}", id);
                Err(ExdSheetError::InvalidHandle(id.to_owned()))
            }
        }
    }

    /// Closes every handle and returns how many were open.
    pub fn close_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.write());
        for handle in handles.values() {
            handle.release();
        }
        if !handles.is_empty() {
            info!("Closed {} open handles", handles.len());
        }
        handles.len()
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}
