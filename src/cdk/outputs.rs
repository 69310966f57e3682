// src/cdk/outputs.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::anyhow;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::Result;

/// Read the tool's JSON outputs file into one flat `name -> value` map.
///
/// Nested objects (one per stack) are flattened; on duplicate names the last
/// one seen wins. Numbers are rendered with six decimals.
pub fn parse_outputs(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    debug!(path = ?path, "parsing deployment outputs");

    let contents = fs::read_to_string(path)?;
    let root: Map<String, Value> = serde_json::from_str(&contents)?;

    let mut values = BTreeMap::new();
    flatten_into(&mut values, &root)?;
    debug!(count = values.len(), "parsed deployment outputs");
    Ok(values)
}

fn flatten_into(values: &mut BTreeMap<String, String>, object: &Map<String, Value>) -> Result<()> {
    for (key, value) in object {
        match value {
            Value::Object(inner) => flatten_into(values, inner)?,
            Value::String(s) => {
                values.insert(key.clone(), s.clone());
            }
            Value::Number(n) => {
                let n = n
                    .as_f64()
                    .ok_or_else(|| anyhow!("output '{key}' is not a representable number"))?;
                values.insert(key.clone(), format!("{n:.6}"));
            }
            _ => return Err(anyhow!("output '{key}' is of unexpected type").into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn nested_stacks_are_flattened() {
        let file = write_json(
            r#"{
                "Agc-Core": {"BucketName": "agc-bucket", "Port": 8080},
                "Agc-Context-dev": {"WesUrl": "https://example.invalid/wes"}
            }"#,
        );

        let values = parse_outputs(file.path()).unwrap();
        assert_eq!(values.get("BucketName").map(String::as_str), Some("agc-bucket"));
        assert_eq!(values.get("Port").map(String::as_str), Some("8080.000000"));
        assert_eq!(
            values.get("WesUrl").map(String::as_str),
            Some("https://example.invalid/wes")
        );
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn unsupported_value_type_names_the_key() {
        let file = write_json(r#"{"Stack": {"Flags": [1, 2]}}"#);
        let err = parse_outputs(file.path()).unwrap_err();
        assert!(err.to_string().contains("Flags"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = parse_outputs("/no/such/outputs.json").unwrap_err();
        assert!(matches!(err, crate::errors::StackrunError::IoError(_)));
    }
}
