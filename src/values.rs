//! Column-major value retrieval for a group's data region.

use crate::error::ExdSheetError;
use crate::registry::FileHandle;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::structure::inference::to_datetime;
use crate::structure::inference::to_number;
use crate::structure::inference::to_text;
use crate::structure::Channel;
use crate::structure::ChannelType;
use crate::structure::DataType;
use crate::structure::Group;
use chrono::NaiveDateTime;
use log::debug;
use serde::ser::SerializeStruct;
use serde::Serialize;
use serde::Serializer;

/// Typed values of one channel; `None` marks a missing value
#[derive(Clone, Debug, PartialEq)]
pub enum ValueArray {
    Double(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Date(Vec<Option<NaiveDateTime>>),
}

impl ValueArray {
    pub fn data_type(&self) -> DataType {
        match self {
            ValueArray::Double(_) => DataType::Double,
            ValueArray::String(_) => DataType::String,
            ValueArray::Date(_) => DataType::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueArray::Double(values) => values.len(),
            ValueArray::String(values) => values.len(),
            ValueArray::Date(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes as `{"data_type": "DT_...", "values": [...]}`, dates as ASAM ODS date strings.
impl Serialize for ValueArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValueArray", 2)?;
        state.serialize_field("data_type", &self.data_type())?;
        match self {
            ValueArray::Double(values) => state.serialize_field("values", values)?,
            ValueArray::String(values) => state.serialize_field("values", values)?,
            ValueArray::Date(values) => {
                let values = values
                    .iter()
                    .map(|value| value.as_ref().map(to_ods_date))
                    .collect::<Vec<Option<String>>>();
                state.serialize_field("values", &values)?
            }
        }
        state.end()
    }
}

/// Formats a timestamp as ASAM ODS date `YYYYMMDDhhmmssffffff`.
pub fn to_ods_date(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y%m%d%H%M%S%6f").to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelValues {
    pub channel_id: usize,
    pub values: ValueArray,
}

/// Values of several channels over one row range of a group
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueChunk {
    pub group_id: usize,
    /// Offset of the first row within the data region
    pub start: usize,
    pub channels: Vec<ChannelValues>,
}

/// Reads `row_count` rows of the given channels, starting `row_start` rows into the data region.
///
/// Rows past the data region are padded with missing values. Errors are checked in this order:
/// `UnknownGroup`, `UnknownChannel`, `OutOfRange` (negative start only), then the configured
/// row count limit.
pub(crate) fn get_values(
    handle: &FileHandle,
    group_id: usize,
    channel_ids: &[usize],
    row_start: i64,
    row_count: usize,
) -> Result<ValueChunk, ExdSheetError> {
    let schema = handle.schema()?;
    let group = schema.group(group_id)
        .ok_or(ExdSheetError::UnknownGroup(group_id))?;
    let channels = channel_ids
        .iter()
        .map(|channel_id| group.channel(*channel_id).ok_or(ExdSheetError::UnknownChannel(group_id, *channel_id)))
        .collect::<Result<Vec<&Channel>, ExdSheetError>>()?;
    if row_start < 0 {
        Err(ExdSheetError::OutOfRange(row_start))?
    }
    let max_row_count = handle.config().max_row_count;
    if row_count > max_row_count {
        Err(ExdSheetError::RowCountLimit(row_count, max_row_count))?
    }

    let start = usize::try_from(row_start).unwrap_or(usize::MAX);
    let available = group.number_of_rows.saturating_sub(start).min(row_count);
    let sheet = if available > 0 && !channels.is_empty() {
        let last_row = group.first_data_row + start + available - 1;
        Some(handle.sheet(group.sheet_index, Criteria::until_row(last_row))?)
    } else {
        None
    };
    debug!(
        "Handle {}: group {} rows {}+{} ({} available), {} channels",
        handle.id(),
        group_id,
        start,
        row_count,
        available,
        channels.len(),
    );
    extract(sheet.as_deref(), group, &channels, start, row_count)
}

/// Builds the typed arrays for a row range; without a sheet every value is missing.
pub(crate) fn extract(
    sheet: Option<&Sheet>,
    group: &Group,
    channels: &[&Channel],
    start: usize,
    count: usize,
) -> Result<ValueChunk, ExdSheetError> {
    let rows = collect_reserved(0..count, |offset| {
        start.checked_add(offset).and_then(|offset| group.sheet_row(offset))
    })?;
    let cell = |row: &Option<usize>, column: usize| {
        sheet.zip(*row).and_then(|(sheet, row)| sheet.get(row, column))
    };

    let channels = channels
        .iter()
        .map(|channel| -> Result<ChannelValues, ExdSheetError> {
            let column = channel.column;
            let values = match channel.channel_type {
                ChannelType::Float64 => ValueArray::Double(
                    collect_reserved(rows.iter(), |row| to_number(cell(row, column)))?
                ),
                ChannelType::DateTime => ValueArray::Date(
                    collect_reserved(rows.iter(), |row| to_datetime(cell(row, column)))?
                ),
                ChannelType::String => ValueArray::String(
                    collect_reserved(rows.iter(), |row| to_text(cell(row, column)))?
                ),
            };
            Ok(ChannelValues {
                channel_id: channel.id,
                values,
            })
        })
        .collect::<Result<Vec<ChannelValues>, ExdSheetError>>()?;

    Ok(ValueChunk {
        group_id: group.id,
        start,
        channels,
    })
}

/// Collects into a vector whose storage is reserved up front, failing instead of aborting.
fn collect_reserved<I, T, F>(items: I, map: F) -> Result<Vec<T>, ExdSheetError>
where
    I: ExactSizeIterator,
    F: FnMut(I::Item) -> T,
{
    let mut values = Vec::new();
    values.try_reserve_exact(items.len())?;
    values.extend(items.map(map));
    Ok(values)
}
