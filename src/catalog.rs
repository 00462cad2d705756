//! Read-only reference data: the feed-in tariff table and battery sizes.
//!
//! Both lists are loaded once from JSON files. A file that is missing,
//! malformed or empty is replaced by the built-in default and a warning is
//! logged, so callers always receive a usable catalog.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::tariff::TariffSegment;

/// Failure to load one reference file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in \"{path}\": {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("\"{path}\" contains no usable entries")]
    Empty { path: PathBuf },
}

/// Feed-in tariff table used when no file is configured or loading fails.
pub fn default_tariffs() -> Vec<TariffSegment> {
    vec![
        TariffSegment::new(1, 4, 24.0),
        TariffSegment::new(5, 10, 8.3),
        TariffSegment::new(11, 15, 8.5),
    ]
}

/// Battery product sizes (kWh) used when no file is configured or loading fails.
pub fn default_battery_sizes() -> Vec<f64> {
    vec![0.0, 4.2, 5.6, 7.04, 9.8, 12.7, 16.4]
}

/// Sorts, drops negative and non-finite values, deduplicates, and adds 0.
pub fn normalize_battery_sizes(sizes: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = std::iter::once(0.0)
        .chain(sizes.iter().copied().filter(|v| v.is_finite() && *v >= 0.0))
        .collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a tariff table: a JSON array of `{startYear, endYear, yenPerKwh}`.
///
/// # Errors
///
/// Returns a `CatalogError` if the file cannot be read or parsed, or holds no segments.
pub fn load_tariffs(path: &Path) -> Result<Vec<TariffSegment>, CatalogError> {
    let segments: Vec<TariffSegment> = read_json(path)?;
    if segments.is_empty() {
        return Err(CatalogError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(segments)
}

/// Loads battery sizes: a JSON array of kWh values.
///
/// # Errors
///
/// Returns a `CatalogError` if the file cannot be read or parsed, or holds no sizes.
pub fn load_battery_sizes(path: &Path) -> Result<Vec<f64>, CatalogError> {
    let sizes: Vec<f64> = read_json(path)?;
    if sizes.is_empty() {
        return Err(CatalogError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(normalize_battery_sizes(&sizes))
}

/// Reference data shared by every calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCatalog {
    /// Project-year feed-in tariff segments.
    pub tariffs: Vec<TariffSegment>,
    /// Battery sizes in ascending order, always starting at 0.
    pub battery_sizes: Vec<f64>,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self {
            tariffs: default_tariffs(),
            battery_sizes: default_battery_sizes(),
        }
    }
}

impl ReferenceCatalog {
    /// Loads whichever files are given, falling back per file to the defaults.
    ///
    /// # Arguments
    ///
    /// * `tariffs` - Optional tariff table path
    /// * `battery_sizes` - Optional battery size list path
    pub fn load_or_default(tariffs: Option<&Path>, battery_sizes: Option<&Path>) -> Self {
        let mut catalog = Self::default();

        if let Some(path) = tariffs {
            match load_tariffs(path) {
                Ok(segments) => {
                    info!(path = %path.display(), segments = segments.len(), "tariff table loaded");
                    catalog.tariffs = segments;
                }
                Err(e) => warn!("{e}; using built-in tariff table"),
            }
        }

        if let Some(path) = battery_sizes {
            match load_battery_sizes(path) {
                Ok(sizes) => {
                    info!(path = %path.display(), sizes = sizes.len(), "battery sizes loaded");
                    catalog.battery_sizes = sizes;
                }
                Err(e) => warn!("{e}; using built-in battery sizes"),
            }
        }

        catalog
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn normalizes_battery_sizes() {
        let sizes = normalize_battery_sizes(&[9.8, 5.0, -1.0, f64::NAN, 5.0]);
        assert_eq!(sizes, vec![0.0, 5.0, 9.8]);
    }

    #[test]
    fn defaults_include_zero_battery() {
        let catalog = ReferenceCatalog::default();
        assert_eq!(catalog.battery_sizes.first(), Some(&0.0));
        assert_eq!(catalog.tariffs.len(), 3);
    }

    #[test]
    fn loads_tariff_file() {
        let file = write_temp(
            r#"[{"startYear":1,"endYear":10,"yenPerKwh":16},{"startYear":11,"endYear":20,"yenPerKwh":7}]"#,
        );
        let segments = load_tariffs(file.path()).expect("tariffs should load");
        assert_eq!(segments[1], TariffSegment::new(11, 20, 7.0));
    }

    #[test]
    fn loads_battery_file() {
        let file = write_temp("[12.7, 5.6, 5.6]");
        let sizes = load_battery_sizes(file.path()).expect("sizes should load");
        assert_eq!(sizes, vec![0.0, 5.6, 12.7]);
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = write_temp("[]");
        assert!(matches!(
            load_battery_sizes(file.path()),
            Err(CatalogError::Empty { .. })
        ));
    }

    #[test]
    fn malformed_file_falls_back() {
        let bad = write_temp("{ not json");
        let catalog = ReferenceCatalog::load_or_default(Some(bad.path()), Some(bad.path()));
        assert_eq!(catalog, ReferenceCatalog::default());
    }

    #[test]
    fn missing_file_falls_back() {
        let catalog =
            ReferenceCatalog::load_or_default(Some(Path::new("/nonexistent/tariffs.json")), None);
        assert_eq!(catalog.tariffs, default_tariffs());
    }
}
