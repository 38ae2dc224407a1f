use crate::error::{ComplianceError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Built-in list used when no list file is configured
pub const MOCK_LIST: &str = "OFAC_SDN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionsEntry {
    pub id: String,
    pub name: String,
}

impl SanctionsEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionsMatch {
    pub list: String,
    pub entry_id: String,
    pub matched_name: String,
}

/// SanctionsEngine holds named sanctions lists and answers name lookups
///
/// A name matches when its lowercase form contains a listed name's lowercase
/// form.
#[derive(Debug, Clone, Default)]
pub struct SanctionsEngine {
    // Map: list_name -> entries with lowercased names
    lists: Arc<DashMap<String, Vec<SanctionsEntry>>>,
}

impl SanctionsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine preloaded with the built-in mock list
    pub fn with_mock_list() -> Self {
        let engine = Self::new();
        engine.load_list(
            MOCK_LIST,
            vec![
                SanctionsEntry::new("SDN-0001", "John Doe"),
                SanctionsEntry::new("SDN-0002", "Jane Smith"),
            ],
        );
        engine
    }

    /// Load (or replace) a sanctions list; entries with blank names are skipped
    pub fn load_list(&self, list_name: &str, entries: Vec<SanctionsEntry>) -> usize {
        let entries: Vec<SanctionsEntry> = entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name.trim().to_lowercase();
                (!name.is_empty()).then(|| SanctionsEntry { id: entry.id, name })
            })
            .collect();

        let count = entries.len();
        self.lists.insert(list_name.to_string(), entries);
        info!(list = list_name, entries = count, "Loaded sanctions list");
        count
    }

    /// Load a list from CSV with `id,name` headers
    pub fn load_csv<R: Read>(&self, list_name: &str, reader: R) -> Result<usize> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let entries = csv_reader
            .deserialize::<SanctionsEntry>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if entries.is_empty() {
            return Err(ComplianceError::ListLoad(format!(
                "Sanctions list {} is empty",
                list_name
            )));
        }

        Ok(self.load_list(list_name, entries))
    }

    /// Load a list from a CSV file; the list is named after the file stem
    pub fn load_csv_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let list_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ComplianceError::ListLoad(format!("Bad list file name: {}", path.display()))
            })?
            .to_uppercase();

        let file = std::fs::File::open(path)
            .map_err(|e| ComplianceError::ListLoad(format!("{}: {}", path.display(), e)))?;
        self.load_csv(&list_name, file)
    }

    /// Check a full name against every loaded list
    ///
    /// Matches are ordered by list name, then entry id.
    pub fn check_name(&self, full_name: &str) -> Vec<SanctionsMatch> {
        let name = full_name.to_lowercase();
        let mut matches = Vec::new();

        for list_entry in self.lists.iter() {
            let list_name = list_entry.key();
            for entry in list_entry.value() {
                if name.contains(&entry.name) {
                    debug!(list = %list_name, entry_id = %entry.id, "Sanctions name match");
                    matches.push(SanctionsMatch {
                        list: list_name.clone(),
                        entry_id: entry.id.clone(),
                        matched_name: entry.name.clone(),
                    });
                }
            }
        }

        matches.sort_by(|a, b| a.list.cmp(&b.list).then_with(|| a.entry_id.cmp(&b.entry_id)));
        matches
    }

    /// Get total number of entries across all lists
    pub fn total_entries(&self) -> usize {
        self.lists.iter().map(|l| l.value().len()).sum()
    }

    /// Get list of loaded sanctions lists
    pub fn loaded_lists(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lists.iter().map(|l| l.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_list_substring_match() {
        let engine = SanctionsEngine::with_mock_list();

        let matches = engine.check_name("Mr. JOHN DOE Jr.");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].list, MOCK_LIST);
        assert_eq!(matches[0].matched_name, "john doe");

        assert!(engine.check_name("Johnny Dough").is_empty());
        assert!(engine.check_name("").is_empty());
    }

    #[test]
    fn test_load_csv() {
        let engine = SanctionsEngine::new();
        let csv = "id,name\nEU-1,Ivan Petrov\nEU-2,  \nEU-3,Acme Holdings\n";

        let loaded = engine.load_csv("EU", csv.as_bytes()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(engine.total_entries(), 2);
        assert_eq!(engine.check_name("ivan petrov")[0].entry_id, "EU-1");
    }

    #[test]
    fn test_load_csv_rejects_malformed_and_empty() {
        let engine = SanctionsEngine::new();

        assert!(matches!(
            engine.load_csv("X", "identifier\nfoo\n".as_bytes()),
            Err(ComplianceError::ListLoad(_))
        ));
        assert!(matches!(
            engine.load_csv("X", "id,name\n".as_bytes()),
            Err(ComplianceError::ListLoad(_))
        ));
        assert!(engine.loaded_lists().is_empty());
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("un_consolidated.csv");
        std::fs::write(&path, "id,name\nUN-9,Jane Roe\n").unwrap();

        let engine = SanctionsEngine::with_mock_list();
        engine.load_csv_file(&path).unwrap();

        assert_eq!(engine.loaded_lists(), vec!["OFAC_SDN", "UN_CONSOLIDATED"]);
        assert!(matches!(
            engine.load_csv_file(dir.path().join("missing.csv")),
            Err(ComplianceError::ListLoad(_))
        ));
    }
}
