use anyhow::{Context, Result};
use std::path::PathBuf;

/// Runtime settings, read from the environment (and `.env`, loaded by the
/// binary before this runs).
///
/// | Variable           | Default                |
/// |--------------------|------------------------|
/// | `CAT_EXPORT_DIR`   | `exports`              |
/// | `CAT_DEFAULT_YEAR` | latest year in tables  |
/// | `CAT_GZIP`         | `false`                |
/// | `LOG_FILE_PATH`    | `logs/cat_cutoffs.log` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub export_dir: PathBuf,
    pub default_year: Option<u16>,
    pub gzip: bool,
    pub log_file_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_year = lookup("CAT_DEFAULT_YEAR")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .with_context(|| format!("CAT_DEFAULT_YEAR is not a year: '{raw}'"))
            })
            .transpose()?;

        let gzip = match lookup("CAT_GZIP").as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => anyhow::bail!("CAT_GZIP must be true or false, got '{v}'"),
        };

        Ok(Self {
            export_dir: lookup("CAT_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("exports")),
            default_year,
            gzip,
            log_file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs/cat_cutoffs.log")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.export_dir, PathBuf::from("exports"));
        assert_eq!(settings.default_year, None);
        assert!(!settings.gzip);
        assert_eq!(settings.log_file_path, PathBuf::from("logs/cat_cutoffs.log"));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("CAT_EXPORT_DIR", "/tmp/out"),
            ("CAT_DEFAULT_YEAR", " 2023 "),
            ("CAT_GZIP", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(settings.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.default_year, Some(2023));
        assert!(settings.gzip);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Settings::from_lookup(lookup_from(&[("CAT_DEFAULT_YEAR", "last")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("CAT_GZIP", "maybe")])).is_err());
    }
}
