//! Saving rendered exports to disk.
//!
//! [`save_as_file`] is fire-and-forget: failures are logged, never returned.
//! [`try_save_as_file`] is the fallible core for callers that do care.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

/// Content type of a saved export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Csv,
    Json,
}

impl MimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::Csv => "text/csv;charset=utf-8",
            MimeType::Json => "application/json;charset=utf-8",
        }
    }
}

/// Where and how files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub dir: PathBuf,
    /// Gzip the content and append `.gz` to the file name.
    pub gzip: bool,
}

impl SaveOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            gzip: false,
        }
    }
}

/// Writes `content` to `filename` inside `options.dir`, creating the
/// directory if needed. Returns the path written.
#[tracing::instrument(skip(content, mime, options), fields(dir = %options.dir.display(), gzip = options.gzip, mime = mime.as_str()))]
pub fn try_save_as_file(
    content: &str,
    filename: &str,
    mime: MimeType,
    options: &SaveOptions,
) -> Result<PathBuf> {
    fs::create_dir_all(&options.dir)
        .with_context(|| format!("Failed to create {}", options.dir.display()))?;

    let (path, body) = if options.gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes())?;
        let compressed = encoder.finish()?;
        (options.dir.join(format!("{filename}.gz")), compressed)
    } else {
        (options.dir.join(filename), content.as_bytes().to_vec())
    };

    fs::write(&path, &body).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = body.len(), "Export saved");
    Ok(path)
}

/// Best-effort save. Errors are logged and dropped.
pub fn save_as_file(content: &str, filename: &str, mime: MimeType, options: &SaveOptions) {
    if let Err(e) = try_save_as_file(content, filename, mime, options) {
        error!(filename, error = %e, "Failed to save export");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::env;
    use std::io::Read;
    use std::path::Path;

    fn is_gzip(path: &Path) -> bool {
        fs::read(path).unwrap().starts_with(&[0x1f, 0x8b])
    }

    fn temp_dir(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_save_creates_directory_and_file() {
        let dir = temp_dir("cat_cutoffs_test_save");
        let _ = fs::remove_dir_all(&dir);

        let options = SaveOptions::new(&dir);
        let path = try_save_as_file("\"a\",\"b\"\n", "rows.csv", MimeType::Csv, &options).unwrap();

        assert_eq!(path, dir.join("rows.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "\"a\",\"b\"\n");
        assert!(!is_gzip(&path));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_gzip_round_trip() {
        let dir = temp_dir("cat_cutoffs_test_gzip");
        let _ = fs::remove_dir_all(&dir);

        let options = SaveOptions {
            dir: dir.clone(),
            gzip: true,
        };
        let path = try_save_as_file("{}", "data.json", MimeType::Json, &options).unwrap();

        assert_eq!(path, dir.join("data.json.gz"));
        assert!(is_gzip(&path));

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "{}");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_as_file_swallows_errors() {
        // A regular file where the directory should be makes create_dir_all fail.
        let blocker = temp_dir("cat_cutoffs_test_blocker");
        let _ = fs::remove_dir_all(&blocker);
        fs::write(&blocker, "not a directory").unwrap();

        let options = SaveOptions::new(&blocker);
        save_as_file("content", "out.csv", MimeType::Csv, &options);
        assert!(try_save_as_file("content", "out.csv", MimeType::Csv, &options).is_err());

        fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(MimeType::Csv.as_str(), "text/csv;charset=utf-8");
        assert_eq!(MimeType::Json.as_str(), "application/json;charset=utf-8");
    }
}
