//! The four EXD API operations and their request/response messages.
//!
//! Messages mirror the ASAM ODS external data messages field by field, so a transport only needs
//! to move them on and off the wire.

use crate::config::ReaderConfig;
use crate::error::ExdSheetError;
use crate::registry::Registry;
use crate::structure::Channel;
use crate::structure::DataType;
use crate::structure::Group;
use crate::values;
use crate::values::ValueArray;
use log::debug;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Location of a file plus open parameters, which are currently unused
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub url: String,
    #[serde(default)]
    pub parameters: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    pub uuid: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureRequest {
    pub handle: Handle,
    /// Omit every group's channel list
    pub suppress_channels: bool,
    /// Omit units, descriptions and the independent flag
    pub suppress_attributes: bool,
    /// Only return channels with these names; all channels when empty
    pub channel_names: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureResult {
    pub identifier: Identifier,
    pub name: String,
    pub groups: Vec<StructureGroup>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureGroup {
    pub name: String,
    pub id: usize,
    pub total_number_of_channels: usize,
    pub number_of_rows: usize,
    pub channels: Vec<StructureChannel>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureChannel {
    pub name: String,
    pub id: usize,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_string: Option<String>,
    #[serde(default)]
    pub attributes: ChannelAttributes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `1` on the measurement's independent channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub independent: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuesRequest {
    pub handle: Handle,
    pub group_id: usize,
    #[serde(default)]
    pub channel_ids: Vec<usize>,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValuesResult {
    /// Group id
    pub id: usize,
    pub channels: Vec<ChannelValuesResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelValuesResult {
    /// Channel id
    pub id: usize,
    pub values: ValueArray,
}

/// Serves spreadsheets through the EXD API operations
pub struct ExternalDataReader {
    registry: Registry,
}

impl ExternalDataReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_registry(Registry::new(config))
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Opens the file named by `identifier.url` under a new handle.
    pub fn open(&self, identifier: &Identifier) -> Result<Handle, ExdSheetError> {
        let handle = self.registry.open(&identifier.url)?;
        Ok(Handle {
            uuid: handle.id().to_owned(),
        })
    }

    /// Returns the file-group-channel hierarchy of an open file.
    pub fn get_structure(&self, request: &StructureRequest) -> Result<StructureResult, ExdSheetError> {
        let handle = self.registry.lookup(&request.handle.uuid)?;
        let schema = handle.schema()?;

        let groups = schema.groups
            .iter()
            .map(|group| structure_group(group, request))
            .collect();
        Ok(StructureResult {
            identifier: Identifier {
                url: handle.locator().to_owned(),
                parameters: String::new(),
            },
            name: schema.name.to_owned(),
            groups,
            attributes: BTreeMap::new(),
        })
    }

    /// Returns one typed array per requested channel, each exactly `limit` long.
    pub fn get_values(&self, request: &ValuesRequest) -> Result<ValuesResult, ExdSheetError> {
        let handle = self.registry.lookup(&request.handle.uuid)?;
        let chunk = values::get_values(&handle, request.group_id, &request.channel_ids, request.start, request.limit)?;
        Ok(ValuesResult {
            id: chunk.group_id,
            channels: chunk.channels
                .into_iter()
                .map(|channel| ChannelValuesResult {
                    id: channel.channel_id,
                    values: channel.values,
                })
                .collect(),
        })
    }

    /// Virtual groups are not supported.
    pub fn get_values_ex(&self) -> Result<ValuesResult, ExdSheetError> {
        warn!("Rejected GetValuesEx request");
        Err(ExdSheetError::Unimplemented("GetValuesEx".to_owned()))
    }

    pub fn close(&self, handle: &Handle) -> Result<Empty, ExdSheetError> {
        self.registry.close(&handle.uuid)?;
        Ok(Empty {})
    }

    /// Closes every open handle, returning how many there were.
    pub fn close_all(&self) -> usize {
        self.registry.close_all()
    }
}

fn structure_group(group: &Group, request: &StructureRequest) -> StructureGroup {
    let channels = if request.suppress_channels {
        Vec::new()
    } else {
        group.channels
            .iter()
            .filter(|channel| request.channel_names.is_empty() || request.channel_names.contains(&channel.name))
            .map(|channel| structure_channel(channel, request.suppress_attributes))
            .collect::<Vec<_>>()
    };
    debug!("Group {} '{}': {} of {} channels", group.id, group.name, channels.len(), group.channels.len());

    StructureGroup {
        name: group.name.to_owned(),
        id: group.id,
        total_number_of_channels: group.channels.len(),
        number_of_rows: group.number_of_rows,
        channels,
        attributes: BTreeMap::new(),
    }
}

fn structure_channel(channel: &Channel, suppress_attributes: bool) -> StructureChannel {
    let (unit_string, attributes) = if suppress_attributes {
        (None, ChannelAttributes::default())
    } else {
        (channel.unit.to_owned(), ChannelAttributes {
            description: channel.description.to_owned(),
            independent: channel.independent.then_some(1),
        })
    };
    StructureChannel {
        name: channel.name.to_owned(),
        id: channel.id,
        data_type: channel.data_type(),
        unit_string,
        attributes,
    }
}
