//! Pull-based telemetry sources

use std::path::PathBuf;

use super::TelemetryError;
use crate::data::{load_records, RawSample};

/// Anything that can be polled for a full telemetry catalog.
///
/// `fetch` runs on the worker thread; `now_ms` is the host time the fetch
/// was requested at.
pub trait TelemetrySource: Send {
    fn name(&self) -> &str;

    fn fetch(&mut self, now_ms: i64) -> Result<Vec<RawSample>, TelemetryError>;
}

/// Reads catalogs from JSON files, advancing through the list on each fetch
/// and repeating the last file once the list is exhausted
#[derive(Debug, Clone)]
pub struct FileTelemetrySource {
    name: String,
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl FileTelemetrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::sequence(vec![path.into()])
    }

    pub fn sequence(paths: Vec<PathBuf>) -> Self {
        let name = match paths.as_slice() {
            [single] => single.display().to_string(),
            _ => format!("{} catalog files", paths.len()),
        };
        Self {
            name,
            paths,
            cursor: 0,
        }
    }

    /// Index of the file the next fetch will read
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor + 1 >= self.paths.len()
    }
}

impl TelemetrySource for FileTelemetrySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, _now_ms: i64) -> Result<Vec<RawSample>, TelemetryError> {
        let path = self
            .paths
            .get(self.cursor)
            .ok_or_else(|| TelemetryError::NoData {
                source_name: self.name.clone(),
            })?;

        let records = load_records(path).map_err(|e| TelemetryError::Source {
            source_name: self.name.clone(),
            message: format!("{:#}", e),
        })?;

        if self.cursor + 1 < self.paths.len() {
            self.cursor += 1;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog(tag: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "orbitglobe-source-{}-{}.json",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_sequence_advances_then_repeats_last() {
        let first = write_catalog("seq-a", r#"[{"norad_id": 1}]"#);
        let second = write_catalog("seq-b", r#"[{"norad_id": 1}, {"norad_id": 2}]"#);
        let mut source = FileTelemetrySource::sequence(vec![first.clone(), second.clone()]);

        assert_eq!(source.fetch(0).unwrap().len(), 1);
        assert!(source.is_exhausted());
        assert_eq!(source.fetch(0).unwrap().len(), 2);
        assert_eq!(source.fetch(0).unwrap().len(), 2);

        std::fs::remove_file(first).ok();
        std::fs::remove_file(second).ok();
    }

    #[test]
    fn test_missing_file_is_a_source_error() {
        let mut source = FileTelemetrySource::new("/nonexistent/orbitglobe/positions.json");
        match source.fetch(0) {
            Err(TelemetryError::Source { message, .. }) => {
                assert!(message.contains("Failed to open"))
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(source.cursor(), 0);
    }

    #[test]
    fn test_empty_sequence_has_no_data() {
        let mut source = FileTelemetrySource::sequence(Vec::new());
        assert!(matches!(
            source.fetch(0),
            Err(TelemetryError::NoData { .. })
        ));
    }
}
