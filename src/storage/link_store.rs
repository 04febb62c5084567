//! Link store
//!
//! Short code → [`LinkRecord`]. Codes are opaque and case-sensitive; records are
//! never updated or removed here, expiry is decided at query time.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use super::LinkRecord;
use crate::errors::{Result, ShortUrlError};

pub trait LinkStore: Send + Sync {
    /// Insert a record under `code`. Fails with `Collision` when the code is taken,
    /// whether or not the existing record has expired.
    fn put(&self, code: &str, record: LinkRecord) -> Result<()>;

    /// Fetch the record for `code`, or `NotFound`.
    fn get(&self, code: &str) -> Result<LinkRecord>;

    fn contains(&self, code: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory link store backed by a [`DashMap`].
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, LinkRecord>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkStore for MemoryLinkStore {
    fn put(&self, code: &str, record: LinkRecord) -> Result<()> {
        // entry() holds the shard lock, so check and insert are one step
        match self.links.entry(code.to_string()) {
            Entry::Occupied(_) => Err(ShortUrlError::collision(format!(
                "short code '{}' already exists",
                code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                trace!("MemoryLinkStore: inserted {}", code);
                Ok(())
            }
        }
    }

    fn get(&self, code: &str) -> Result<LinkRecord> {
        self.links
            .get(code)
            .map(|r| r.value().clone())
            .ok_or_else(|| ShortUrlError::not_found(format!("short code '{}' not found", code)))
    }

    fn contains(&self, code: &str) -> bool {
        self.links.contains_key(code)
    }

    fn len(&self) -> usize {
        self.links.len()
    }
}
