use std::path::Path;

use serde::{Deserialize, Serialize};
use unilidar_frame::{FrameConfig, DEFAULT_BUFFER_CEILING, DEFAULT_MAX_PAYLOAD, DEFAULT_READ_CHUNK};

use crate::error::{ReaderError, Result};

/// Reader tuning.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Largest payload accepted from the device, bytes.
    pub max_payload_size: usize,
    /// Unconsumed bytes kept before the oldest are dropped.
    pub buffer_ceiling: usize,
    /// Bytes requested from the channel per read.
    pub read_chunk_size: usize,
    /// Upper bound on bytes drained from the channel in one poll.
    pub max_read_per_poll: usize,
    /// Point-cloud scans merged into one emitted cloud. 1 emits every scan.
    pub cloud_scan_num: u32,
}

impl ReaderConfig {
    /// Frame-layer view of this configuration.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            buffer_ceiling: self.buffer_ceiling,
            read_chunk_size: self.read_chunk_size.max(1),
        }
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ReaderError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            buffer_ceiling: DEFAULT_BUFFER_CEILING,
            read_chunk_size: DEFAULT_READ_CHUNK,
            max_read_per_poll: DEFAULT_BUFFER_CEILING,
            cloud_scan_num: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ReaderConfig::from_json_str(r#"{ "cloud_scan_num": 18 }"#).unwrap();
        assert_eq!(cfg.cloud_scan_num, 18);
        assert_eq!(cfg.max_payload_size, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ReaderConfig::from_json_str(r#"{ "baud": 9600 }"#).unwrap_err();
        assert!(matches!(err, ReaderError::Json(_)));
    }

    #[test]
    fn frame_config_mirrors_fields() {
        let cfg = ReaderConfig {
            max_payload_size: 128,
            buffer_ceiling: 4096,
            read_chunk_size: 0,
            ..ReaderConfig::default()
        };
        let frame = cfg.frame_config();
        assert_eq!(frame.max_payload_size, 128);
        assert_eq!(frame.buffer_ceiling, 4096);
        assert_eq!(frame.read_chunk_size, 1);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = ReaderConfig::load("/nonexistent/unilidar.json").unwrap_err();
        assert!(matches!(err, ReaderError::ConfigFile { .. }));
    }
}
