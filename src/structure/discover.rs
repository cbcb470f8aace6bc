//! Structure discovery: header, hint rows, data region and channel types of each sheet.
//!
//! Discovery works in two passes over a sheet. The layout pass finds the data start, the header
//! row and the rows between them. The typing pass samples the data region of every channel
//! column. Nothing here fails on odd layouts; a sheet that does not fit degrades to fewer
//! attributes or a group without channels.

use crate::error::ExdSheetError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::structure::hints::unit_text;
use crate::structure::hints::Hint;
use crate::structure::hints::HintCell;
use crate::structure::hints::HintPolicy;
use crate::structure::inference::classify;
use crate::structure::inference::to_datetime;
use crate::structure::inference::to_number;
use crate::structure::inference::to_text;
use crate::structure::inference::CellClass;
use crate::structure::inference::TypeDetector;
use crate::structure::Channel;
use crate::structure::ChannelType;
use crate::structure::Group;
use crate::structure::Schema;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Header labels with a trailing unit: `Speed [km/h]` or `Speed (km/h)`
static LABEL_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.*?\S)\s*[\[(](?P<unit>[^\[\]()]+)[\])]$").expect("Hardcode regex pattern")
});

/// Result of discovering a whole workbook
pub(crate) struct Discovery {
    pub(crate) schema: Schema,
    /// Sheets read during discovery, keyed by sheet index
    pub(crate) sheets: Vec<(usize, Sheet)>,
}

/// Discovers the schema of a workbook, one group per non-empty sheet in workbook order.
///
/// # Arguments
/// * `spreadsheet` - Open workbook
/// * `analyze_rows` - Number of data rows sampled for type inference, all rows when `None`
/// * `policy` - Classifier for rows between header and data
pub(crate) fn discover(
    spreadsheet: &mut dyn Spreadsheet,
    analyze_rows: Option<usize>,
    policy: &dyn HintPolicy,
) -> Result<Discovery, ExdSheetError> {
    let mut groups = Vec::<Group>::new();
    let mut sheets = Vec::<(usize, Sheet)>::new();
    for (sheet_index, sheet_name) in spreadsheet.sheet_names().iter().enumerate() {
        let sheet = spreadsheet.read_resolved_sheet(sheet_index, &Criteria::all())?;
        match discover_sheet(&sheet, sheet_index, groups.len(), analyze_rows, policy) {
            Some(group) => {
                debug!(
                    "Sheet '{}': header row {:?}, data rows {}..{}, {} channels",
                    sheet_name,
                    group.header_row,
                    group.first_data_row,
                    group.first_data_row + group.number_of_rows,
                    group.channels.len(),
                );
                groups.push(group);
                sheets.push((sheet_index, sheet));
            }
            None => debug!("Sheet '{}' is empty, skipped", sheet_name),
        }
    }
    let schema = Schema {
        name: spreadsheet.name(),
        groups,
    };
    Ok(Discovery { schema, sheets })
}

/// Row positions found by the layout pass
#[derive(Debug, PartialEq)]
struct Layout {
    header_row: Option<usize>,
    columns: Vec<usize>,
    hint_rows: Vec<usize>,
    first_data_row: usize,
}

/// Classified view of a sheet
struct Grid<'a> {
    sheet: &'a Sheet,
    row_lower: usize,
    row_upper: usize,
    col_lower: usize,
    col_upper: usize,
}

impl Grid<'_> {
    fn class(&self, row: usize, col: usize) -> CellClass {
        classify(self.sheet.get(row, col))
    }

    fn classes(&self, row: usize) -> Vec<CellClass> {
        (self.col_lower..=self.col_upper)
            .map(|col| self.class(row, col))
            .collect()
    }

    fn is_non_empty(&self, row: usize, columns: &[usize]) -> bool {
        columns.iter().any(|col| self.class(row, *col) != CellClass::Empty)
    }

    fn all_columns(&self) -> Vec<usize> {
        (self.col_lower..=self.col_upper).collect()
    }
}

/// Discovers the group of one sheet; `None` when the sheet holds no value at all.
pub(crate) fn discover_sheet(
    sheet: &Sheet,
    sheet_index: usize,
    group_id: usize,
    analyze_rows: Option<usize>,
    policy: &dyn HintPolicy,
) -> Option<Group> {
    let (row_lower, row_upper) = sheet.row_lower_bound.zip(sheet.row_upper_bound)?;
    let (col_lower, col_upper) = sheet.col_lower_bound.zip(sheet.col_upper_bound)?;
    let grid = Grid { sheet, row_lower, row_upper, col_lower, col_upper };

    let layout = match find_data_start(&grid) {
        Some(data_start) => layout_with_values(&grid, data_start),
        None => layout_all_text(&grid)?,
    };

    let region_columns = if layout.header_row.is_some() {
        layout.columns.to_owned()
    } else {
        grid.all_columns()
    };
    let number_of_rows = (layout.first_data_row..=row_upper)
        .rev()
        .find(|row| grid.is_non_empty(*row, &region_columns))
        .map(|last_row| last_row - layout.first_data_row + 1)
        .unwrap_or(0);

    let channels = match layout.header_row {
        Some(header_row) => build_channels(&grid, &layout, header_row, number_of_rows, analyze_rows, policy),
        None => Vec::new(),
    };

    Some(Group {
        id: group_id,
        name: sheet.name.to_owned(),
        sheet_index,
        header_row: layout.header_row,
        first_data_row: layout.first_data_row,
        number_of_rows,
        channels,
    })
}

/// First row starting a stable pair of value rows.
///
/// Both rows must be non-empty and hold a non-text value, and their classes must agree wherever
/// both have a cell. Without such a pair the first row holding any value is used.
fn find_data_start(grid: &Grid) -> Option<usize> {
    let mut previous = grid.classes(grid.row_lower);
    for row in grid.row_lower..grid.row_upper {
        let current = grid.classes(row + 1);
        if is_stable_pair(&previous, &current) {
            return Some(row);
        }
        previous = current;
    }
    (grid.row_lower..=grid.row_upper).find(|row| grid.classes(*row).iter().any(CellClass::is_value))
}

fn is_stable_pair(first: &[CellClass], second: &[CellClass]) -> bool {
    let has_value = |classes: &[CellClass]| classes.iter().any(CellClass::is_value);
    let agree = first
        .iter()
        .zip(second)
        .filter(|(a, b)| **a != CellClass::Empty && **b != CellClass::Empty)
        .all(|(a, b)| a == b);
    has_value(first) && has_value(second) && agree
}

/// Header is the first row above the data start labelling every data column.
fn layout_with_values(grid: &Grid, data_start: usize) -> Layout {
    let classes = grid.classes(data_start);
    let data_columns = (grid.col_lower..=grid.col_upper)
        .zip(&classes)
        .filter(|(_, class)| **class != CellClass::Empty)
        .map(|(col, _)| col)
        .collect::<Vec<usize>>();
    let span = data_columns.first().copied().zip(data_columns.last().copied());

    let header_row = span.and_then(|(span_lower, span_upper)| {
        (grid.row_lower..data_start)
            .find(|row| (span_lower..=span_upper).all(|col| grid.class(*row, col) == CellClass::Text))
    });
    let (header_row, (span_lower, span_upper)) = match header_row.zip(span) {
        Some(found) => found,
        None => return Layout {
            header_row: None,
            columns: Vec::new(),
            hint_rows: Vec::new(),
            first_data_row: data_start,
        },
    };

    // Extend to the whole run of labels around the span
    let mut first_col = span_lower;
    while first_col > grid.col_lower && grid.class(header_row, first_col - 1) == CellClass::Text {
        first_col -= 1;
    }
    let mut last_col = span_upper;
    while last_col < grid.col_upper && grid.class(header_row, last_col + 1) == CellClass::Text {
        last_col += 1;
    }
    let columns = (first_col..=last_col).collect::<Vec<usize>>();
    let hint_rows = (header_row + 1..data_start)
        .filter(|row| grid.is_non_empty(*row, &columns))
        .collect();

    Layout {
        header_row: Some(header_row),
        columns,
        hint_rows,
        first_data_row: data_start,
    }
}

/// Sheets without any value: the first non-empty row is the header.
fn layout_all_text(grid: &Grid) -> Option<Layout> {
    let all_columns = grid.all_columns();
    let header_row = (grid.row_lower..=grid.row_upper).find(|row| grid.is_non_empty(*row, &all_columns))?;
    let columns = (grid.col_lower..=grid.col_upper)
        .skip_while(|col| grid.class(header_row, *col) != CellClass::Text)
        .take_while(|col| grid.class(header_row, *col) == CellClass::Text)
        .collect::<Vec<usize>>();
    let first_data_row = (header_row + 1..=grid.row_upper)
        .find(|row| grid.is_non_empty(*row, &columns))
        .unwrap_or(header_row + 1);
    Some(Layout {
        header_row: Some(header_row),
        columns,
        hint_rows: Vec::new(),
        first_data_row,
    })
}

fn build_channels(
    grid: &Grid,
    layout: &Layout,
    header_row: usize,
    number_of_rows: usize,
    analyze_rows: Option<usize>,
    policy: &dyn HintPolicy,
) -> Vec<Channel> {
    let mut units = None::<Vec<HintCell>>;
    let mut descriptions = None::<Vec<HintCell>>;
    for row in &layout.hint_rows {
        let cells = layout.columns
            .iter()
            .map(|col| HintCell {
                class: grid.class(*row, *col),
                text: to_text(grid.sheet.get(*row, *col))
                    .map(|text| text.trim().to_owned())
                    .filter(|text| !text.is_empty()),
            })
            .collect::<Vec<HintCell>>();
        match policy.classify(&cells) {
            Some(Hint::Unit) => units = Some(cells),
            Some(Hint::Description) => descriptions = Some(cells),
            None => (),
        }
    }

    let first_data_row = layout.first_data_row;
    let sample_rows = analyze_rows.map(|rows| rows.min(number_of_rows)).unwrap_or(number_of_rows);
    let mut channels = Vec::<Channel>::new();
    for (id, col) in layout.columns.iter().enumerate() {
        let label = to_text(grid.sheet.get(header_row, *col)).unwrap_or_default();
        let (name, inline_unit) = split_label(label.trim());
        let unit = units
            .as_ref()
            .and_then(|cells| cells[id].text.as_deref())
            .map(unit_text)
            .filter(|unit| !unit.is_empty())
            .or(inline_unit);
        let description = descriptions
            .as_ref()
            .and_then(|cells| cells[id].text.to_owned());

        let mut detector = TypeDetector::default();
        for row in first_data_row..first_data_row + sample_rows {
            detector.push(grid.sheet.get(row, *col));
        }
        let channel_type = detector.detect();
        let independent = id == 0 && is_monotonic(grid, *col, first_data_row, number_of_rows, channel_type);

        channels.push(Channel {
            id,
            name,
            channel_type,
            unit,
            description,
            column: *col,
            independent,
        });
    }
    channels
}

/// Splits an inline unit off a header label.
fn split_label(label: &str) -> (String, Option<String>) {
    match LABEL_WITH_UNIT.captures(label) {
        Some(captures) => {
            let name = captures["name"].trim().to_owned();
            let unit = captures["unit"].trim().to_owned();
            (name, (!unit.is_empty()).then_some(unit))
        }
        None => (label.to_owned(), None),
    }
}

/// Whether a column is complete and never decreases over the data region.
fn is_monotonic(grid: &Grid, col: usize, first_data_row: usize, number_of_rows: usize, channel_type: ChannelType) -> bool {
    if number_of_rows == 0 {
        return false;
    }
    let mut previous = None::<f64>;
    for row in first_data_row..first_data_row + number_of_rows {
        let cell = grid.sheet.get(row, col);
        let value = match channel_type {
            ChannelType::Float64 => to_number(cell),
            ChannelType::DateTime => to_datetime(cell).map(|datetime| datetime.and_utc().timestamp_millis() as f64),
            ChannelType::String => None,
        };
        match (previous, value) {
            (_, None) => return false,
            (Some(previous), Some(value)) if value < previous => return false,
            (_, value) => previous = value,
        }
    }
    true
}
