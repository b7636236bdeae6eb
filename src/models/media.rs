//! Identity and metadata of a relayed video.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Prefix every stored video key starts with.
pub const OBJECT_KEY_PREFIX: &str = "videos/";

/// Extension every stored video key ends with.
pub const OBJECT_KEY_SUFFIX: &str = ".mp4";

/// Content type attached to uploaded videos.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Randomly generated identifier of one uploaded video.
///
/// Both the local staging file name and the storage key are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a fresh v4 identifier. Uniqueness is probabilistic only.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Storage key for this identifier: `videos/<id>.mp4`.
    pub fn object_key(&self) -> String {
        format!("{OBJECT_KEY_PREFIX}{}{OBJECT_KEY_SUFFIX}", self.0)
    }

    /// File name used in the staging directory.
    pub fn staging_file_name(&self) -> String {
        format!("{}{OBJECT_KEY_SUFFIX}", self.0)
    }

    /// Recover the identifier from a key produced by [`FileId::object_key`].
    ///
    /// Any other key shape yields `None`.
    #[cfg(test)]
    pub fn from_object_key(key: &str) -> Option<Self> {
        key.strip_prefix(OBJECT_KEY_PREFIX)?
            .strip_suffix(OBJECT_KEY_SUFFIX)?
            .parse()
            .ok()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Descriptive fields scraped from the extraction tool.
///
/// Only ever returned in the create response; there is no metadata store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    /// Falls back to the title when the post has no description.
    pub description: String,
    pub duration_seconds: f64,
}

/// Serialize whole-second durations as integers (`30`, not `30.0`).
pub fn serialize_seconds<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Human-readable size using 1024 steps, rounded to two decimals.
///
/// `0` → `0 Bytes`, `1536` → `1.5 KB`, `1234567` → `1.18 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn object_key_uses_fixed_prefix_and_extension() {
        let id: FileId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(
            id.object_key(),
            "videos/550e8400-e29b-41d4-a716-446655440000.mp4"
        );
        assert_eq!(
            id.staging_file_name(),
            "550e8400-e29b-41d4-a716-446655440000.mp4"
        );
    }

    #[test]
    fn object_key_maps_back_to_identifier() {
        let id = FileId::generate();
        assert_eq!(FileId::from_object_key(&id.object_key()), Some(id));
    }

    #[test]
    fn foreign_key_shapes_are_rejected() {
        assert_eq!(FileId::from_object_key("images/abc.mp4"), None);
        assert_eq!(FileId::from_object_key("videos/not-a-uuid.mp4"), None);
        assert_eq!(
            FileId::from_object_key("videos/550e8400-e29b-41d4-a716-446655440000.mov"),
            None
        );
    }

    #[test]
    fn file_sizes_are_formatted_like_the_api_reports_them() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn timestamps_carry_milliseconds_and_zulu() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn whole_durations_serialize_as_integers() {
        #[derive(Serialize)]
        struct Probe {
            #[serde(serialize_with = "serialize_seconds")]
            d: f64,
        }
        assert_eq!(
            serde_json::to_string(&Probe { d: 30.0 }).unwrap(),
            r#"{"d":30}"#
        );
        assert_eq!(
            serde_json::to_string(&Probe { d: 12.5 }).unwrap(),
            r#"{"d":12.5}"#
        );
    }
}
