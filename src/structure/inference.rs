//! Cell classification, column type inference and value normalization.

use crate::spreadsheet::cell::parse_iso_datetime;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::structure::ChannelType;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Decimal numbers written as text, e.g. `-1.5`, `.25` or `3e-4`
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("Hardcode regex pattern")
});

/// ISO 8601 dates written as text: `YYYY-MM-DD[(T| )hh:mm[:ss[.f]][Z|±hh:mm]]`
static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:\d{2})?)?$")
        .expect("Hardcode regex pattern")
});

/// Semantic class of a single cell
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellClass {
    Empty,
    Text,
    Number,
    DateTime,
    Boolean,
}

impl CellClass {
    /// Values other than text labels
    pub fn is_value(&self) -> bool {
        !matches!(self, CellClass::Empty | CellClass::Text)
    }
}

/// Classifies a cell; `None`, blanks and error cells are [`CellClass::Empty`].
pub(crate) fn classify(cell: Option<&Cell>) -> CellClass {
    let cell = match cell {
        Some(cell) if !cell.is_blank() => cell,
        _ => return CellClass::Empty,
    };
    match cell.kind {
        CellType::Boolean => CellClass::Boolean,
        CellType::Number => match cell.to_double() {
            Some(_) => CellClass::Number,
            None => CellClass::Empty,
        },
        CellType::InlineString => classify_text(&cell.value),
        kind if kind.is_date_number() || kind == CellType::IsoDateTime || kind == CellType::IsoDuration => {
            match cell.to_datetime() {
                Some(_) => CellClass::DateTime,
                None => CellClass::Empty,
            }
        }
        _ => CellClass::Empty,
    }
}

fn classify_text(text: &str) -> CellClass {
    let text = text.trim();
    if text.is_empty() {
        CellClass::Empty
    } else if NUMBER.is_match(text) {
        CellClass::Number
    } else if ISO_DATETIME.is_match(text) && parse_iso_datetime(text).is_some() {
        CellClass::DateTime
    } else {
        CellClass::Text
    }
}

/// Numeric value of a Number-class cell.
pub(crate) fn to_number(cell: Option<&Cell>) -> Option<f64> {
    let cell = cell?;
    match (classify(Some(cell)), cell.kind) {
        (CellClass::Number, CellType::Number) => cell.to_double(),
        (CellClass::Number, _) => cell.value.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        _ => None,
    }
}

/// Timestamp of a DateTime-class cell, rounded to the millisecond.
pub(crate) fn to_datetime(cell: Option<&Cell>) -> Option<NaiveDateTime> {
    let cell = cell?;
    match (classify(Some(cell)), cell.kind) {
        (CellClass::DateTime, CellType::InlineString) => parse_iso_datetime(&cell.value),
        (CellClass::DateTime, _) => cell.to_datetime(),
        _ => None,
    }
}

/// Textual form of any non-empty cell.
pub(crate) fn to_text(cell: Option<&Cell>) -> Option<String> {
    cell.and_then(Cell::to_text)
}

/// Accumulates the classes of a column sample and derives its [`ChannelType`].
///
/// Missing cells do not take part in the decision:
/// - only DateTime cells: `DateTime`
/// - only Number cells: `Float64`, whole numbers included
/// - anything else, including an empty sample: `String`
#[derive(Clone, Debug)]
pub(crate) struct TypeDetector {
    count: usize,
    all_datetime: bool,
    all_number: bool,
}

impl Default for TypeDetector {
    fn default() -> Self {
        Self {
            count: 0,
            all_datetime: true,
            all_number: true,
        }
    }
}

impl TypeDetector {
    pub(crate) fn push(&mut self, cell: Option<&Cell>) {
        match classify(cell) {
            CellClass::Empty => return,
            CellClass::DateTime => self.all_number = false,
            CellClass::Number => self.all_datetime = false,
            CellClass::Text | CellClass::Boolean => {
                self.all_datetime = false;
                self.all_number = false;
            }
        }
        self.count += 1;
    }

    pub(crate) fn detect(&self) -> ChannelType {
        match (self.count, self.all_datetime, self.all_number) {
            (0, _, _) => ChannelType::String,
            (_, true, _) => ChannelType::DateTime,
            (_, _, true) => ChannelType::Float64,
            _ => ChannelType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell { row: 0, col: 0, kind, value: value.to_owned() }
    }

    fn detect(cells: &[Cell]) -> ChannelType {
        let mut detector = TypeDetector::default();
        for cell in cells {
            detector.push(Some(cell));
        }
        detector.push(None);
        detector.detect()
    }

    #[test]
    fn classifies_cells() {
        assert_eq!(classify(None), CellClass::Empty);
        assert_eq!(classify(Some(&cell(CellType::Number, "1.5"))), CellClass::Number);
        assert_eq!(classify(Some(&cell(CellType::InlineString, " -3e2 "))), CellClass::Number);
        assert_eq!(classify(Some(&cell(CellType::InlineString, "2024-01-01T00:00:01"))), CellClass::DateTime);
        assert_eq!(classify(Some(&cell(CellType::InlineString, "2024-01-01T00:00:00Z"))), CellClass::DateTime);
        assert_eq!(classify(Some(&cell(CellType::InlineString, "2024-01-01T08:30:00.5+02:00"))), CellClass::DateTime);
        assert_eq!(classify(Some(&cell(CellType::InlineString, "2024-13-45"))), CellClass::Text);
        assert_eq!(classify(Some(&cell(CellType::InlineString, "Speed"))), CellClass::Text);
        assert_eq!(classify(Some(&cell(CellType::NumberDate1900, "45292"))), CellClass::DateTime);
        assert_eq!(classify(Some(&cell(CellType::Boolean, "0"))), CellClass::Boolean);
        assert_eq!(classify(Some(&cell(CellType::Error, "#N/A"))), CellClass::Empty);
        assert_eq!(classify(Some(&cell(CellType::InlineString, ""))), CellClass::Empty);
    }

    #[test]
    fn infers_column_types() {
        let integers = [cell(CellType::Number, "10"), cell(CellType::InlineString, "20")];
        assert_eq!(detect(&integers), ChannelType::Float64);

        let floats = [cell(CellType::Number, "10"), cell(CellType::Number, "20.5")];
        assert_eq!(detect(&floats), ChannelType::Float64);

        let dates = [cell(CellType::NumberDateTime1900, "45292.5"), cell(CellType::IsoDateTime, "2024-01-02")];
        assert_eq!(detect(&dates), ChannelType::DateTime);

        let zoned = [
            cell(CellType::InlineString, "2024-01-01T00:00:00Z"),
            cell(CellType::InlineString, "2024-01-01T00:00:01Z"),
        ];
        assert_eq!(detect(&zoned), ChannelType::DateTime);

        let mixed = [cell(CellType::Number, "1"), cell(CellType::InlineString, "n/a")];
        assert_eq!(detect(&mixed), ChannelType::String);

        let flags = [cell(CellType::Boolean, "1")];
        assert_eq!(detect(&flags), ChannelType::String);

        assert_eq!(detect(&[]), ChannelType::String);
    }

    #[test]
    fn normalizes_values() {
        assert_eq!(to_number(Some(&cell(CellType::InlineString, "2.5"))), Some(2.5));
        assert_eq!(to_number(Some(&cell(CellType::InlineString, "abc"))), None);
        assert_eq!(to_number(Some(&cell(CellType::Boolean, "1"))), None);

        let datetime = to_datetime(Some(&cell(CellType::InlineString, "2024-01-01 00:00:01.2344")));
        assert_eq!(datetime.map(|value| value.to_string()).as_deref(), Some("2024-01-01 00:00:01.234"));
        let datetime = to_datetime(Some(&cell(CellType::InlineString, "2024-01-01T00:00:01Z")));
        assert_eq!(datetime.map(|value| value.to_string()).as_deref(), Some("2024-01-01 00:00:01"));

        assert_eq!(to_text(Some(&cell(CellType::Number, "10"))).as_deref(), Some("10"));
        assert_eq!(to_text(Some(&cell(CellType::Boolean, "0"))).as_deref(), Some("false"));
        assert_eq!(to_text(None), None);
    }
}
