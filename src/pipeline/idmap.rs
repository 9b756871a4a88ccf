//! On-disk map from batch custom_ids back to buyers.
//!
//! The Batches API restricts custom_id to a short safe alphabet, so buyer
//! names cannot ride along in the id itself. The map file written at
//! submission time is what makes ingestion possible later; it must be loaded
//! from the directory the submission ran in.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::Buyer;

/// Maps each submitted custom_id back to its buyer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap {
    entries: HashMap<String, Buyer>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, custom_id: String, buyer: Buyer) {
        self.entries.insert(custom_id, buyer);
    }

    pub fn get(&self, custom_id: &str) -> Option<&Buyer> {
        self.entries.get(custom_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `batch_<id>_map.json` in the working directory.
    pub fn path_for(batch_id: &str) -> PathBuf {
        PathBuf::from(format!("batch_{batch_id}_map.json"))
    }

    /// Persist the map next to the submission.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let raw = serde_json::to_string(self).map_err(std::io::Error::other)?;
        fs::write(path, raw)
    }

    /// Load a previously saved map.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(std::io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> IdMap {
        let mut map = IdMap::new();
        map.insert(
            "ES_0000".to_string(),
            Buyer {
                buyer_name: "Madrid City Council".to_string(),
                country: "ES".to_string(),
            },
        );
        map.insert(
            "FR_0001".to_string(),
            Buyer {
                buyer_name: "Ville de Lyon".to_string(),
                country: "FR".to_string(),
            },
        );
        map
    }

    #[test]
    fn test_path_for_embeds_batch_id() {
        assert_eq!(
            IdMap::path_for("msgbatch_abc123"),
            PathBuf::from("batch_msgbatch_abc123_map.json")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("batch_test_map.json");

        let map = sample_map();
        map.save(&path).expect("save");

        let loaded = IdMap::load(&path).expect("load");
        assert_eq!(loaded, map);
        assert_eq!(
            loaded.get("ES_0000").map(|b| b.buyer_name.as_str()),
            Some("Madrid City Council")
        );
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = IdMap::load(Path::new("/nonexistent/batch_x_map.json")).expect_err("missing");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unknown_id_lookup() {
        assert!(sample_map().get("IE_9999").is_none());
    }
}
