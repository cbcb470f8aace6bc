//! Streaming readers for the supported spreadsheet containers.
//!
//! Office Open XML workbooks (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`, `.xlam`) and OpenDocument
//! spreadsheets (`.ods`) are parsed straight from their ZIP archives. Each reader produces a
//! sparse [`Sheet`] for one worksheet at a time and stops early once the requested row upper
//! bound has been passed.

pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

use crate::error::ExdSheetError;
use crate::helpers::locator;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use log::debug;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while locating parts of a spreadsheet container
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("Spreadsheet '{0}' contains no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Unsupported spreadsheet format '{0}'")]
    UnsupportedFormatError(String),

    #[error("Sheet {0} not found")]
    SheetNotFoundError(usize),
}

/// Common interface of the container readers
pub(crate) trait Spreadsheet: Send {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Returns the worksheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads shared strings, all of them or only the given indexes.
    ///
    /// # Returns
    /// Tuple of (shared_strings, mappings) where mappings maps shared string indexes to loaded positions
    fn load_shared_strings(
        &mut self,
        indexes: Option<HashSet<usize>>,
    ) -> Result<(Vec<String>, HashMap<usize, usize>), ExdSheetError>;

    /// Reads one worksheet, honouring the row upper bound of `criteria`.
    /// Shared string cells keep their table index as value.
    fn read_sheet(&mut self, index: usize, criteria: &Criteria) -> Result<Sheet, ExdSheetError>;

    /// Reads one worksheet and resolves shared string cells to their text.
    /// Only the strings referenced by the sheet are loaded.
    fn read_resolved_sheet(&mut self, index: usize, criteria: &Criteria) -> Result<Sheet, ExdSheetError> {
        let mut sheet = self.read_sheet(index, criteria)?;
        let indexes = sheet.cells
            .iter()
            .filter(|cell| cell.kind == CellType::SharedString)
            .filter_map(|cell| cell.value.parse::<usize>().ok())
            .collect::<HashSet<usize>>();
        if !indexes.is_empty() {
            let (shared_strings, mappings) = self.load_shared_strings(Some(indexes))?;
            for cell in sheet.cells.iter_mut().filter(|cell| cell.kind == CellType::SharedString) {
                let text = cell.value
                    .parse::<usize>()
                    .ok()
                    .and_then(|id| mappings.get(&id))
                    .and_then(|position| shared_strings.get(*position));
                match text {
                    Some(text) => {
                        cell.kind = CellType::InlineString;
                        cell.value = text.to_owned();
                    }
                    None => {
                        cell.kind = CellType::Empty;
                        cell.value.clear();
                    }
                }
            }
        }
        debug!(
            "Read sheet '{}' of '{}': {} cells up to row {:?}",
            sheet.name,
            sheet.file_name,
            sheet.cells.len(),
            sheet.row_upper_bound,
        );
        Ok(sheet)
    }
}

/// Opens a spreadsheet file, choosing the reader by file extension.
///
/// # Arguments
/// * `path` - Resolved path of the spreadsheet
///
/// # Returns
/// * `Result<Box<dyn Spreadsheet>, ExdSheetError>` - `NotFound` when the path is no regular file,
///   any other error means the file is unreadable
pub(crate) fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, ExdSheetError> {
    let reader = locator::open_file(path)?;
    let file_name = locator::file_name(path);
    let extension = path.extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xltx" | "xltm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(&file_name, reader)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(&file_name, reader)?)),
        _ => Err(SpreadsheetError::UnsupportedFormatError(file_name))?,
    }
}
