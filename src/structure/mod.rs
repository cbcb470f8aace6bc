//! Logical schema discovered from a spreadsheet.
//!
//! A [`Schema`] holds one [`Group`] per non-empty worksheet. Each group holds the [`Channel`]s
//! found in the sheet's header row. The schema is computed once per open file and never changes
//! afterwards.

pub mod discover;
pub mod hints;
pub mod inference;

use serde::Deserialize;
use serde::Serialize;

/// Semantic type of a channel, fixed at discovery
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    DateTime,
    String,
    /// Any numeric column, integral ones included
    Float64,
}

impl ChannelType {
    /// Wire data type the channel values are delivered as.
    pub fn data_type(&self) -> DataType {
        match self {
            ChannelType::DateTime => DataType::Date,
            ChannelType::String => DataType::String,
            ChannelType::Float64 => DataType::Double,
        }
    }
}

/// ASAM ODS data types used on the wire
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "DT_DOUBLE")]
    Double,
    #[serde(rename = "DT_STRING")]
    String,
    #[serde(rename = "DT_DATE")]
    Date,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Position within the group
    pub id: usize,
    pub name: String,
    pub channel_type: ChannelType,
    pub unit: Option<String>,
    pub description: Option<String>,
    /// Sheet column (0-based)
    pub column: usize,
    /// Set on the first channel when its values are complete and never decrease
    pub independent: bool,
}

impl Channel {
    pub fn data_type(&self) -> DataType {
        self.channel_type.data_type()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    /// Position within the schema
    pub id: usize,
    /// Sheet name
    pub name: String,
    /// Position of the sheet within the workbook
    pub sheet_index: usize,
    /// Header row (0-based); `None` when the sheet has no header and therefore no channels
    pub header_row: Option<usize>,
    /// First data row (0-based)
    pub first_data_row: usize,
    /// Number of rows in the data region
    pub number_of_rows: usize,
    pub channels: Vec<Channel>,
}

impl Group {
    /// Sheet row holding the data row at `offset`, `None` past the data region.
    pub fn sheet_row(&self, offset: usize) -> Option<usize> {
        (offset < self.number_of_rows).then(|| self.first_data_row + offset)
    }

    pub fn channel(&self, id: usize) -> Option<&Channel> {
        self.channels.get(id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    /// Name of the file the schema was discovered from
    pub name: String,
    pub groups: Vec<Group>,
}

impl Schema {
    pub fn group(&self, id: usize) -> Option<&Group> {
        self.groups.get(id)
    }
}
