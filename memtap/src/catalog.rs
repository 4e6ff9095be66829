//! The server-reported process catalog and its filtered views.

use crate::error::CatalogError;
use crate::types::ProcessDescriptor;

/// Every process visible to the server, ordered ascending by pid.
///
/// A catalog is immutable once built; a refresh replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCatalog {
    entries: Vec<ProcessDescriptor>,
}

impl ProcessCatalog {
    /// Sort and validate one enumeration response. Server order is not
    /// trusted; duplicate pids mean the response is not a usable snapshot.
    pub fn from_entries(mut entries: Vec<ProcessDescriptor>) -> Result<Self, CatalogError> {
        entries.sort_by_key(|p| p.pid);
        if let Some(pair) = entries.windows(2).find(|w| w[0].pid == w[1].pid) {
            return Err(CatalogError::Malformed(format!(
                "duplicate pid {}",
                pair[0].pid
            )));
        }
        Ok(Self { entries })
    }

    pub fn processes(&self) -> &[ProcessDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a pid. The ascending order makes this a binary search.
    pub fn find(&self, pid: i32) -> Option<&ProcessDescriptor> {
        self.entries
            .binary_search_by_key(&pid, |p| p.pid)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Case-insensitive substring view over process names. Lazy and
    /// restartable; empty text matches everything; the catalog itself is
    /// never touched by filtering.
    pub fn filter<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a ProcessDescriptor> {
        let needle = text.to_lowercase();
        self.entries
            .iter()
            .filter(move |p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
    }
}
