//! Line codec for EXD API calls.
//!
//! Each request is one JSON object per line:
//! `{"id": 1, "method": "Open", "params": {"url": "file:///data/run.xlsx"}}`.
//! Each response echoes the id and carries either `result` or
//! `error: {"code": "<ErrorKind>", "message": "..."}`.

use crate::error::ErrorKind;
use crate::error::ExdSheetError;
use crate::service::ExternalDataReader;
use crate::service::Handle;
use crate::service::Identifier;
use crate::service::StructureRequest;
use crate::service::ValuesRequest;
use log::debug;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorKind,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Success { id: Value, result: Value },
    Failure { id: Value, error: ErrorBody },
}

impl Response {
    fn failure(id: Value, error: &ExdSheetError) -> Self {
        Response::Failure {
            id,
            error: ErrorBody {
                code: error.kind(),
                message: error.to_string(),
            },
        }
    }
}

/// Runs one request line against the reader and returns the response line, without newline.
///
/// Malformed lines and unknown methods are answered with a `BadRequest` error.
pub fn dispatch(reader: &ExternalDataReader, line: &str) -> String {
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            debug!("Dispatching {} (id {})", request.method, request.id);
            let id = request.id.to_owned();
            match call(reader, request) {
                Ok(result) => Response::Success { id, result },
                Err(error) => {
                    warn!("Request {} failed: {}", id, error);
                    Response::failure(id, &error)
                }
            }
        }
        Err(error) => {
            warn!("Malformed request line: {}", error);
            Response::failure(Value::Null, &ExdSheetError::BadRequest(error.to_string()))
        }
    };
    encode(&response)
}

/// Response line for a request that could not be read at all.
pub fn reject(message: &str) -> String {
    encode(&Response::failure(Value::Null, &ExdSheetError::BadRequest(message.to_owned())))
}

fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        format!(r#"{{"id":null,"error":{{"code":"BadRequest","message":"{}"}}}}"#, error.to_string().replace('"', "'"))
    })
}

fn call(reader: &ExternalDataReader, request: Request) -> Result<Value, ExdSheetError> {
    let result = match request.method.as_str() {
        "Open" => serde_json::to_value(reader.open(&params::<Identifier>(request.params)?)?)?,
        "GetStructure" => serde_json::to_value(reader.get_structure(&params::<StructureRequest>(request.params)?)?)?,
        "GetValues" => serde_json::to_value(reader.get_values(&params::<ValuesRequest>(request.params)?)?)?,
        "Close" => serde_json::to_value(reader.close(&params::<Handle>(request.params)?)?)?,
        "GetValuesEx" => serde_json::to_value(reader.get_values_ex()?)?,
        method => Err(ExdSheetError::BadRequest(format!("Unknown method '{}'", method)))?,
    };
    Ok(result)
}

fn params<T: DeserializeOwned>(params: Value) -> Result<T, ExdSheetError> {
    serde_json::from_value(params).map_err(|error| ExdSheetError::BadRequest(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::fixtures::Value as CellValue;
    use crate::fixtures::Workbook;
    use serde_json::json;

    fn reader() -> (tempfile::TempDir, ExternalDataReader) {
        let directory = tempfile::tempdir().unwrap();
        Workbook::new()
            .sheet("Drive", vec![
                vec![CellValue::text("Time"), CellValue::text("Speed [km/h]")],
                vec![CellValue::number(0.0), CellValue::number(10.0)],
                vec![CellValue::number(1.0), CellValue::number(20.0)],
            ])
            .write_ods(directory.path(), "drive.ods");
        let reader = ExternalDataReader::new(ReaderConfig {
            base_dir: directory.path().to_path_buf(),
            ..ReaderConfig::default()
        });
        (directory, reader)
    }

    fn send(reader: &ExternalDataReader, request: serde_json::Value) -> serde_json::Value {
        serde_json::from_str(&dispatch(reader, &request.to_string())).unwrap()
    }

    #[test]
    fn full_session() {
        let (_directory, reader) = reader();

        let response = send(&reader, json!({"id": 1, "method": "Open", "params": {"url": "drive.ods"}}));
        assert_eq!(response["id"], 1);
        let handle = response["result"].clone();
        assert_eq!(handle["uuid"], "1");

        let response = send(&reader, json!({"id": 2, "method": "GetStructure", "params": {"handle": handle}}));
        let group = &response["result"]["groups"][0];
        assert_eq!(group["number_of_rows"], 2);
        assert_eq!(group["channels"][1]["name"], "Speed");
        assert_eq!(group["channels"][1]["unit_string"], "km/h");
        assert_eq!(group["channels"][1]["data_type"], "DT_DOUBLE");

        let response = send(&reader, json!({
            "id": 3,
            "method": "GetValues",
            "params": {"handle": handle, "group_id": 0, "channel_ids": [1], "start": 0, "limit": 3}
        }));
        assert_eq!(response["result"]["channels"][0]["values"], json!({"data_type": "DT_DOUBLE", "values": [10.0, 20.0, null]}));

        let response = send(&reader, json!({"id": 4, "method": "Close", "params": handle}));
        assert_eq!(response, json!({"id": 4, "result": {}}));

        let response = send(&reader, json!({"id": 5, "method": "Close", "params": handle}));
        assert_eq!(response["error"]["code"], "InvalidHandle");
    }

    #[test]
    fn rejected_requests() {
        let (_directory, reader) = reader();

        let response: serde_json::Value = serde_json::from_str(&dispatch(&reader, "not json")).unwrap();
        assert_eq!(response["id"], serde_json::Value::Null);
        assert_eq!(response["error"]["code"], "BadRequest");

        let response = send(&reader, json!({"id": 1, "method": "Frobnicate"}));
        assert_eq!(response["error"]["code"], "BadRequest");

        let response = send(&reader, json!({"id": 2, "method": "GetValues", "params": {"group_id": "x"}}));
        assert_eq!(response["error"]["code"], "BadRequest");

        let response = send(&reader, json!({"id": 3, "method": "GetValuesEx", "params": {}}));
        assert_eq!(response["error"]["code"], "Unimplemented");

        let response = send(&reader, json!({"id": 4, "method": "Open", "params": {"url": "missing.xlsx"}}));
        assert_eq!(response["error"]["code"], "NotFound");

        let response = send(&reader, json!({"id": 5, "method": "GetValues", "params": {"handle": {"uuid": "1"}, "group_id": 0}}));
        assert_eq!(response["error"]["code"], "InvalidHandle");
    }

    #[test]
    fn rejection_line() {
        let response: serde_json::Value = serde_json::from_str(&reject("Request line too long")).unwrap();
        assert_eq!(response, json!({
            "id": null,
            "error": {"code": "BadRequest", "message": "Bad request: Request line too long"}
        }));
    }

    #[test]
    fn huge_limit_fails_only_its_request() {
        let (_directory, reader) = reader();
        let handle = send(&reader, json!({"id": 1, "method": "Open", "params": {"url": "drive.ods"}}))["result"].clone();
        let response = send(&reader, json!({
            "id": 2,
            "method": "GetValues",
            "params": {"handle": handle, "group_id": 0, "channel_ids": [0, 1], "start": 0, "limit": 1u64 << 40}
        }));
        assert_eq!(response["id"], 2);
        assert_eq!(response["error"]["code"], "BadRequest");

        let response = send(&reader, json!({
            "id": 3,
            "method": "GetValues",
            "params": {"handle": handle, "group_id": 0, "channel_ids": [1], "start": 0, "limit": 2}
        }));
        assert_eq!(response["result"]["channels"][0]["values"]["values"], json!([10.0, 20.0]));
    }

    #[test]
    fn negative_start_is_out_of_range() {
        let (_directory, reader) = reader();
        let handle = send(&reader, json!({"id": 1, "method": "Open", "params": {"url": "drive.ods"}}))["result"].clone();
        let response = send(&reader, json!({
            "id": 2,
            "method": "GetValues",
            "params": {"handle": handle, "group_id": 0, "channel_ids": [0], "start": -1, "limit": 1}
        }));
        assert_eq!(response["error"]["code"], "OutOfRange");
        assert_eq!(response["id"], 2);
    }
}
