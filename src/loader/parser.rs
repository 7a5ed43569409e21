//! Generic JSON file parsing: reads a file, deserializes, converts I/O and
//! serde errors into [`crate::error::Error`].

use std::fs;

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Parses a JSON file into `T`, converting I/O and deserialization failures
/// into `crate::error::Error` via `#[from]`.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path)?;
    let parsed: T = serde_json::from_str(&data)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn parses_a_well_formed_json_file() {
        let dir = std::env::temp_dir().join(format!("nep_timetable_core_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.json");
        std::fs::write(&path, r#"{"name": "a", "count": 3}"#).unwrap();

        let parsed: Sample = parse_json_file(path.to_str().unwrap()).unwrap();
        assert_eq!(parsed, Sample { name: "a".into(), count: 3 });

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let result: Result<Sample> = parse_json_file("/nonexistent/path/does_not_exist.json");
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
