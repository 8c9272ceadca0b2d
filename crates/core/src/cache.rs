use crate::error::IngestError;
use crate::ingest::ListExtraction;
use crate::models::SourceList;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Content address of one extraction: the document bytes and the list they
/// were parsed as. Any change to either yields a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub checksum: String,
    pub source: SourceList,
}

impl CacheKey {
    pub fn new(checksum: impl Into<String>, source: SourceList) -> Self {
        Self {
            checksum: checksum.into(),
            source,
        }
    }

    pub fn for_document(pdf: &[u8], source: SourceList) -> Self {
        Self::new(digest_bytes(pdf), source)
    }
}

/// Successful extractions keyed by content. Failures are not cached; an
/// unreadable document is simply parsed (and rejected) again.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: HashMap<CacheKey, ListExtraction>,
    hits: u64,
    misses: u64,
}

impl ExtractionCache {
    pub fn get_or_extract<F>(&mut self, key: CacheKey, extract: F) -> Result<ListExtraction, IngestError>
    where
        F: FnOnce() -> Result<ListExtraction, IngestError>,
    {
        if let Some(cached) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(cached.clone());
        }

        self.misses += 1;
        let extraction = extract()?;
        self.entries.insert(key, extraction.clone());
        Ok(extraction)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
