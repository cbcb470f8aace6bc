use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use iso8601_duration::Duration as IsoDuration;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Inline string values
    InlineString,
    /// Shared string table references, resolved to inline strings once the sheet is read
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Literal text, escapes and bracketed sections (colors, locales) are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Returns true for numbers carrying a date or time number format.
    pub(crate) fn is_date_number(&self) -> bool {
        matches!(
            self,
            CellType::NumberDateTime1900 | CellType::NumberDate1900 | CellType::NumberTime1900 |
            CellType::NumberDateTime1904 | CellType::NumberDate1904 | CellType::NumberTime1904
        )
    }
}

/// Represents a single cell in a spreadsheet with position, type, and value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the container
    pub(crate) value: String,
}

impl Cell {
    /// Returns true when the cell carries no usable value.
    pub(crate) fn is_blank(&self) -> bool {
        match self.kind {
            CellType::Empty | CellType::Error => true,
            _ => self.value.trim().is_empty(),
        }
    }

    /// Converts a native numeric cell to double-precision floating point.
    pub(crate) fn to_double(&self) -> Option<f64> {
        match self.kind {
            CellType::Number => self.value.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
            _ => None,
        }
    }

    /// Converts date and time cells to a timestamp, rounded to the millisecond.
    ///
    /// Excel serial numbers honour both the 1900 and 1904 date systems. Time-only values are
    /// anchored at 1970-01-01.
    pub(crate) fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self.kind {
            CellType::NumberDateTime1900 | CellType::NumberDate1900 => {
                from_serial(self.value.trim().parse().ok()?, false)
            }
            CellType::NumberDateTime1904 | CellType::NumberDate1904 => {
                from_serial(self.value.trim().parse().ok()?, true)
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                let serial = self.value.trim().parse::<f64>().ok()?;
                if serial >= 1.0 {
                    from_serial(serial, self.kind == CellType::NumberTime1904)
                } else {
                    from_time_fraction(serial)
                }
            }
            CellType::IsoDateTime => parse_iso_datetime(&self.value),
            CellType::IsoDuration => from_iso_duration(&self.value),
            _ => None,
        }
    }

    /// Returns the textual form of the cell, `None` for blanks and errors.
    pub(crate) fn to_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        let text = match self.kind {
            CellType::Boolean => if self.value == "1" || self.value.eq_ignore_ascii_case("true") {
                "true".to_owned()
            } else {
                "false".to_owned()
            },
            kind if kind.is_date_number() || kind == CellType::IsoDateTime || kind == CellType::IsoDuration => {
                self.to_datetime()
                    .map(|datetime| to_iso_string(&datetime))
                    .unwrap_or_else(|| self.value.to_owned())
            }
            _ => self.value.to_owned(),
        };
        Some(text)
    }
}

/// Excel epoch for the 1900 date system (serial 0 maps to 1899-12-30 for serials from 61 on)
fn epoch_1900() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate Literal").and_hms_opt(0, 0, 0).expect("Midnight")
}

/// Excel epoch for the 1904 date system
fn epoch_1904() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1904, 1, 1).expect("NaiveDate Literal").and_hms_opt(0, 0, 0).expect("Midnight")
}

/// Unix epoch, the anchor for time-only values
fn epoch_1970() -> NaiveDateTime {
    DateTime::UNIX_EPOCH.naive_utc()
}

/// Converts an Excel serial date number to a timestamp.
/// Handles the Lotus 1-2-3 leap year bug of the 1900 system.
pub(crate) fn from_serial(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial * 86_400_000f64).round() as i64;
    let datetime = if is_1904 {
        epoch_1904()
    } else if serial < 60.0 {
        epoch_1900() + Duration::days(1)
    } else {
        epoch_1900()
    };
    datetime.checked_add_signed(Duration::milliseconds(millis))
}

/// Converts a fraction of a day to a timestamp on 1970-01-01.
pub(crate) fn from_time_fraction(fraction: f64) -> Option<NaiveDateTime> {
    if !fraction.is_finite() || fraction < 0.0 {
        return None;
    }
    let millis = (fraction * 86_400_000f64).round() as i64;
    epoch_1970().checked_add_signed(Duration::milliseconds(millis))
}

/// Parses ISO 8601 date and date/time text, with `T` or a space as separator.
pub(crate) fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let text = text.trim();
    let datetime = FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|datetime| datetime.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(round_to_millis(datetime))
}

/// Converts an ISO 8601 duration (ODS time values such as `PT12H30M15S`) to a time on 1970-01-01.
fn from_iso_duration(text: &str) -> Option<NaiveDateTime> {
    let duration = text.trim().parse::<IsoDuration>().ok()?;
    let hours = duration.day as f64 * 24.0 + duration.hour as f64;
    let seconds = (hours * 60.0 + duration.minute as f64) * 60.0 + duration.second as f64;
    epoch_1970().checked_add_signed(Duration::milliseconds((seconds * 1000.0).round() as i64))
}

/// Rounds a timestamp to the nearest millisecond.
pub(crate) fn round_to_millis(datetime: NaiveDateTime) -> NaiveDateTime {
    let nanos = datetime.nanosecond() % 1_000_000_000;
    let millis = ((nanos as f64) / 1_000_000f64).round() as i64;
    datetime
        .with_nanosecond(0)
        .and_then(|second| second.checked_add_signed(Duration::milliseconds(millis)))
        .unwrap_or(datetime)
}

/// Formats a timestamp as ISO 8601 text, with milliseconds only when present.
pub(crate) fn to_iso_string(datetime: &NaiveDateTime) -> String {
    if datetime.nanosecond() == 0 {
        datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        datetime.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}
