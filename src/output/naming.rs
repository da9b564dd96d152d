//! Artifact file names

use crate::config::CaptureKind;
use chrono::{DateTime, SecondsFormat, Utc};

/// Prefix of intermediate recordings
pub const TEMP_PREFIX: &str = "temp";
/// Extension of intermediate recordings
pub const INTERMEDIATE_EXTENSION: &str = "webm";

/// File-system safe UTC timestamp, e.g. `2024-03-01T14-05-09-123Z`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileStamp(String);

impl FileStamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// ISO-8601 with millisecond precision, `:` and `.` replaced by `-`
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let iso = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self(iso.replace([':', '.'], "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<kind>-<stamp>.<ext>`
    pub fn file_name(&self, kind: CaptureKind, extension: &str) -> String {
        format!("{}-{}.{}", kind.prefix(), self.0, extension)
    }

    /// `temp-<stamp>.webm`
    pub fn temp_file_name(&self) -> String {
        format!("{}-{}.{}", TEMP_PREFIX, self.0, INTERMEDIATE_EXTENSION)
    }
}

impl std::fmt::Display for FileStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> FileStamp {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap()
            + chrono::Duration::milliseconds(123);
        FileStamp::from_datetime(at)
    }

    #[test]
    fn test_stamp_format() {
        assert_eq!(stamp().as_str(), "2024-03-01T14-05-09-123Z");
    }

    #[test]
    fn test_file_names() {
        let s = stamp();
        assert_eq!(
            s.file_name(CaptureKind::Recording, "mp4"),
            "recording-2024-03-01T14-05-09-123Z.mp4"
        );
        assert_eq!(s.file_name(CaptureKind::Snip, "png"), "snip-2024-03-01T14-05-09-123Z.png");
        assert_eq!(s.temp_file_name(), "temp-2024-03-01T14-05-09-123Z.webm");
    }
}
