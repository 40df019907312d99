//! Participant metadata joined onto the feature table.

use std::collections::HashMap;
use std::path::Path;

use steer_config::{ParticipantMeta, load_metadata_csv};

/// Group reported for participants missing from the metadata table.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Metadata keyed by normalized participant ID.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    by_id: HashMap<String, ParticipantMeta>,
}

/// Trim and uppercase a participant ID.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

impl MetadataIndex {
    pub fn new(entries: impl IntoIterator<Item = ParticipantMeta>) -> Self {
        let by_id = entries
            .into_iter()
            .map(|m| (normalize_id(&m.id), m))
            .collect();
        Self { by_id }
    }

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let entries = load_metadata_csv(path)?;
        tracing::debug!(participants = entries.len(), path = %path.display(), "metadata loaded");
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Group and proficiency score of `id`, or `Unknown` and no score.
    pub fn lookup(&self, id: &str) -> (String, Option<f64>) {
        match self.by_id.get(&normalize_id(id)) {
            Some(m) => (m.group.clone(), m.proficiency_score),
            None => (UNKNOWN_GROUP.to_string(), None),
        }
    }
}
