use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_NAME: &str = "Unknown Name";
pub const NOT_AVAILABLE: &str = "NA";
pub const MISSING_CELL: &str = "N/A";

/// How a list is laid out in its published PDF.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListFormat {
    Narrative,
    Tabular,
}

/// The five lists a screening session consolidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceList {
    Moha,
    Unscr1267,
    Unscr1988,
    Unscr1718,
    Unscr2231,
}

impl SourceList {
    pub const ALL: [SourceList; 5] = [
        SourceList::Moha,
        SourceList::Unscr1267,
        SourceList::Unscr1988,
        SourceList::Unscr1718,
        SourceList::Unscr2231,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceList::Moha => "MOHA Domestic List (Malaysia)",
            SourceList::Unscr1267 => "UNSCR 1267/1989/2253 (ISIL/Al-Qaida)",
            SourceList::Unscr1988 => "UNSCR 1988 (Taliban)",
            SourceList::Unscr1718 => "UNSCR 1718 (DPRK)",
            SourceList::Unscr2231 => "UNSCR 2231 (Iran)",
        }
    }

    /// Short key used on the command line and to classify file names.
    pub fn key(self) -> &'static str {
        match self {
            SourceList::Moha => "moha",
            SourceList::Unscr1267 => "1267",
            SourceList::Unscr1988 => "1988",
            SourceList::Unscr1718 => "1718",
            SourceList::Unscr2231 => "2231",
        }
    }

    pub fn format(self) -> ListFormat {
        match self {
            SourceList::Moha => ListFormat::Tabular,
            _ => ListFormat::Narrative,
        }
    }

    pub fn reference_prefix(self) -> &'static str {
        match self {
            SourceList::Moha => "KDN",
            SourceList::Unscr1267 => "QD",
            SourceList::Unscr1988 => "TA",
            SourceList::Unscr1718 => "KP",
            SourceList::Unscr2231 => "IR",
        }
    }
}

impl fmt::Display for SourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceList {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        let stripped = lowered.strip_prefix("unscr").unwrap_or(&lowered);
        let stripped = stripped.trim_start_matches(['-', '_', ' ']);
        SourceList::ALL
            .into_iter()
            .find(|list| list.key() == stripped || list.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| IngestError::UnknownList(value.to_string()))
    }
}

/// One designated person or entity as published by a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SanctionRecord {
    pub source: SourceList,
    pub reference_no: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub date_of_birth: String,
    pub designation: String,
    pub nationality: String,
    pub raw_excerpt: String,
}

impl SanctionRecord {
    /// Name followed by every alias, single-space separated. Always derived,
    /// never cached on the record.
    pub fn search_key(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn aliases_display(&self) -> String {
        self.aliases.join(" | ")
    }
}

/// Identity of one uploaded list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub source: SourceList,
    pub source_path: Option<String>,
    pub checksum: String,
    pub byte_len: usize,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningOptions {
    pub threshold: u8,
    pub limit: usize,
}

impl Default for ScreeningOptions {
    fn default() -> Self {
        Self {
            threshold: 80,
            limit: 10,
        }
    }
}
