//! Station metadata lookup.
//!
//! The reference table maps counting-station identifiers to display names. It
//! is only used to label output; yearly filtering uses a fixed station set.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument};

/// Substring identifying the stations on the Limmatquai.
pub const LIMMATQUAI: &str = "Limmatquai";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationRecord {
    pub id1: String,
    #[serde(default)]
    pub bezeichnung: Option<String>,
    #[serde(default)]
    pub abkuerzung: Option<String>,
}

impl StationRecord {
    pub fn name_contains(&self, needle: &str) -> bool {
        self.bezeichnung
            .as_deref()
            .is_some_and(|name| name.contains(needle))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    names: HashMap<String, String>,
    limmatquai: Vec<StationRecord>,
}

impl StationCatalog {
    /// Reads the reference CSV at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or is not a CSV with an `id1` column.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("station catalog {} not readable", path.display()))?;
        let mut rdr = csv::Reader::from_reader(file);

        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: StationRecord = result?;
            records.push(record);
        }
        debug!(stations = records.len(), "Station catalog loaded");

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<StationRecord>) -> Self {
        let limmatquai = records
            .iter()
            .filter(|r| r.name_contains(LIMMATQUAI))
            .cloned()
            .collect();

        let names = records
            .into_iter()
            .filter_map(|r| {
                let id = r.id1.trim().to_string();
                r.bezeichnung.map(|name| (id, name))
            })
            .collect();

        Self { names, limmatquai }
    }

    pub fn name(&self, station_id: &str) -> Option<&str> {
        self.names.get(station_id).map(String::as_str)
    }

    /// Stations whose display name contains "Limmatquai".
    pub fn limmatquai_stations(&self) -> &[StationRecord] {
        &self.limmatquai
    }

    pub fn limmatquai_ids(&self) -> Vec<String> {
        self.limmatquai
            .iter()
            .map(|r| r.id1.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(id: &str, name: Option<&str>) -> StationRecord {
        StationRecord {
            id1: id.to_string(),
            bezeichnung: name.map(str::to_string),
            abkuerzung: None,
        }
    }

    #[test]
    fn test_matching_ignores_missing_names() {
        let catalog = StationCatalog::from_records(vec![
            record("33", Some("Limmatquai --> Bellevue")),
            record("34", None),
            record("3279", Some("Limmatquai --> Central")),
            record("99", Some("Bahnhofstrasse")),
        ]);

        assert_eq!(catalog.limmatquai_ids(), vec!["33", "3279"]);
        assert_eq!(catalog.name("99"), Some("Bahnhofstrasse"));
        assert_eq!(catalog.name("34"), None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let catalog = StationCatalog::from_records(vec![record("1", Some("LIMMATQUAI Nord"))]);
        assert!(catalog.limmatquai_stations().is_empty());
    }

    #[test]
    fn test_load_reads_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "abkuerzung,bezeichnung,id1,korrekturfaktor").unwrap();
        writeln!(file, "LIM_BEL,Limmatquai --> Bellevue,33,1.0").unwrap();
        writeln!(file, "BHF,Bahnhofstrasse,12,").unwrap();

        let catalog = StationCatalog::load(file.path()).unwrap();

        assert_eq!(catalog.limmatquai_stations().len(), 1);
        assert_eq!(
            catalog.limmatquai_stations()[0].abkuerzung.as_deref(),
            Some("LIM_BEL")
        );
        assert_eq!(catalog.name("12"), Some("Bahnhofstrasse"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = StationCatalog::load(Path::new("/nonexistent/taz.view_eco_standorte.csv"));
        assert!(result.is_err());
    }
}
