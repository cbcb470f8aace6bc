use crate::error::ExdSheetError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// Document content part
const CONTENT: &str = "content.xml";
/// XML element name for spreadsheet root
const SPREADSHEET: QName = QName(b"office:spreadsheet");
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");
/// XML element name for tabulator text
const TAB: QName = QName(b"text:tab");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// ODS spreadsheet handler for reading OpenDocument Spreadsheet files
pub(crate) struct OdsSpreadsheet {
    /// Name of the ODS file
    pub(crate) name: String,
    /// ZIP archive containing the ODS file contents
    zip: ZipArchive<BufReader<File>>,
    /// Table names in document order
    sheets: Vec<String>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file and validates its format
    ///
    /// # Arguments
    /// * `file_name` - Name of the ODS file
    /// * `reader` - Opened file
    ///
    /// # Returns
    /// * `Result<Self, ExdSheetError>` - ODS spreadsheet instance or error
    pub(crate) fn open(file_name: &str, reader: BufReader<File>) -> Result<Self, ExdSheetError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        let sheets = load_table_names(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.to_owned()
    }

    /// ODS stores strings inline, so there is no shared string table to load.
    fn load_shared_strings(
        &mut self,
        _indexes: Option<HashSet<usize>>,
    ) -> Result<(Vec<String>, HashMap<usize, usize>), ExdSheetError> {
        Ok((Vec::new(), HashMap::new()))
    }

    /// Reads one table of content.xml, expanding repeated rows and columns.
    /// Stops once a row passes the criteria's upper bound.
    fn read_sheet(&mut self, index: usize, criteria: &Criteria) -> Result<Sheet, ExdSheetError> {
        let sheet_name = self.sheets
            .get(index)
            .ok_or(SpreadsheetError::SheetNotFoundError(index))?;
        let mut sheet = Sheet::new(&self.name, sheet_name, *criteria);
        let mut reader = self.zip
            .xml_reader(CONTENT)?
            .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;

        // Skip to the requested table
        let mut table_index = 0usize;
        let mut found = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == SPREADSHEET => break,
            Event::Start(event) if event.name() == TABLE => {
                if table_index == index {
                    found = true;
                    break;
                }
                table_index += 1;
            }
        });
        if !found {
            Err(SpreadsheetError::SheetNotFoundError(index))?;
        }

        // Cell state
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Element state
        let mut element_context = false; // reading text children
        let mut comment_context = false; // inside an annotation
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
                if sheet.after_row_upper_bound(row) {
                    break;
                }
            }
            Event::End(event) if event.name() == TABLE_ROW => {
                row += row_count;
                if sheet.after_row_upper_bound(row) {
                    break;
                }
            }
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let is_error = event.get_attribute_value("calcext:value-type")?
                    .map(|cow| cow == "error")
                    .unwrap_or(false);
                kind = match event.get_attribute_value("office:value-type")? {
                    _ if is_error => CellType::Empty,
                    Some(value_type) => match value_type.as_ref() {
                        "boolean" => CellType::Boolean,
                        "date" => CellType::IsoDateTime,
                        "time" => CellType::IsoDuration,
                        "string" => CellType::InlineString,
                        _ => CellType::Number,
                    },
                    None => CellType::Empty,
                };

                match kind {
                    CellType::InlineString => element_context = true,
                    CellType::Boolean => {
                        let is_true = event.get_attribute_value("office:boolean-value")?
                            .map(|cow| cow != "false" && cow != "0")
                            .unwrap_or(false);
                        value.push_str(if is_true { "1" } else { "0" });
                    }
                    CellType::IsoDateTime => if let Some(data) = event.get_attribute_value("office:date-value")? {
                        value.push_str(&data);
                    },
                    CellType::IsoDuration => if let Some(data) = event.get_attribute_value("office:time-value")? {
                        value.push_str(&data);
                    },
                    CellType::Number => if let Some(data) = event.get_attribute_value("office:value")? {
                        value.push_str(&data);
                    },
                    _ => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    'rows: for row_offset in 0..row_count {
                        let row_number = row + row_offset;
                        if sheet.after_row_upper_bound(row_number) {
                            break 'rows;
                        }
                        for col_offset in 0..col_count {
                            sheet.push(Cell {
                                row: row_number,
                                col: col + col_offset,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col += col_count;
                kind = CellType::default();
                element_context = false;
                comment_context = false;
            }
            // String content
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == TAB => value.push('\t'),
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });

        Ok(sheet)
    }
}

/// Collects the table names of content.xml in document order
fn load_table_names(zip: &mut ZipArchive<BufReader<File>>) -> Result<Vec<String>, ExdSheetError> {
    let mut reader = zip
        .xml_reader(CONTENT)?
        .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;
    let mut names = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == SPREADSHEET => break,
        Event::Start(event) if event.name() == TABLE => {
            let name = event.get_attribute_value("table:name")?
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("Sheet{}", names.len() + 1));
            names.push(name);
        }
    });
    Ok(names)
}

/// Validates that the ZIP archive contains a valid ODS file by checking MIME type
fn check_mime(zip: &mut ZipArchive<BufReader<File>>) -> Result<(), ExdSheetError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::<u8>::new();
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks if the ODS file is password protected by examining the manifest
fn is_password_protected(zip: &mut ZipArchive<BufReader<File>>) -> Result<bool, ExdSheetError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}
