//! Record extraction for the domestic (MOHA) list, published as a table.
//!
//! Column layout has changed between revisions of the document, so a row is
//! recognised by the `KDN` reference marker anywhere in it, and column roles
//! come from a [`ColumnResolver`]: either fixed positions or the header row,
//! falling back to positions for roles the header does not name.

use crate::chunking::normalize_whitespace;
use crate::error::IngestError;
use crate::models::{SanctionRecord, SourceList, MISSING_CELL};
use crate::tables::{LopdfTableExtractor, PdfTable};
use crate::traits::TableExtractor;
use serde::Serialize;

pub const ENTRY_MARKER: &str = "KDN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnRole {
    Name,
    DateOfBirth,
    Aliases,
    Identification,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 4] = [
        ColumnRole::Name,
        ColumnRole::DateOfBirth,
        ColumnRole::Aliases,
        ColumnRole::Identification,
    ];
}

/// Zero-based column index per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub date_of_birth: usize,
    pub aliases: usize,
    pub identification: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: 2,
            date_of_birth: 5,
            aliases: 7,
            identification: 10,
        }
    }
}

impl ColumnMap {
    pub fn index(&self, role: ColumnRole) -> usize {
        match role {
            ColumnRole::Name => self.name,
            ColumnRole::DateOfBirth => self.date_of_birth,
            ColumnRole::Aliases => self.aliases,
            ColumnRole::Identification => self.identification,
        }
    }

    fn set(&mut self, role: ColumnRole, index: usize) {
        match role {
            ColumnRole::Name => self.name = index,
            ColumnRole::DateOfBirth => self.date_of_birth = index,
            ColumnRole::Aliases => self.aliases = index,
            ColumnRole::Identification => self.identification = index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnResolver {
    Positional(ColumnMap),
    HeaderSniffing { fallback: ColumnMap },
}

impl Default for ColumnResolver {
    fn default() -> Self {
        ColumnResolver::HeaderSniffing {
            fallback: ColumnMap::default(),
        }
    }
}

impl ColumnResolver {
    pub fn fallback(&self) -> ColumnMap {
        match self {
            ColumnResolver::Positional(map) => *map,
            ColumnResolver::HeaderSniffing { fallback } => *fallback,
        }
    }

    /// Column map named by the first header row of `table` (a row before any
    /// entry naming at least two roles), or `None` if the table has none.
    pub fn header_map(&self, table: &PdfTable, marker: &str) -> Option<ColumnMap> {
        let ColumnResolver::HeaderSniffing { fallback } = self else {
            return None;
        };

        for row in table.rows.iter().take_while(|row| !is_entry(row, marker)) {
            let mut map = *fallback;
            let mut named = Vec::new();
            for (index, cell) in row.iter().enumerate() {
                if let Some(role) = header_role(cell) {
                    if !named.contains(&role) {
                        map.set(role, index);
                        named.push(role);
                    }
                }
            }
            if named.len() >= 2 {
                return Some(map);
            }
        }

        None
    }
}

fn header_role(cell: &str) -> Option<ColumnRole> {
    const ALIASES: &[&str] = &["nama lain", "alias", "a.k.a", "also known"];
    const BIRTH: &[&str] = &["tarikh lahir", "date of birth", "dob"];
    const IDENTIFICATION: &[&str] = &[
        "kad pengenalan",
        "k/p",
        "pasport",
        "passport",
        "identification",
    ];
    const NAME: &[&str] = &["nama", "name"];

    let lowered = normalize_whitespace(cell).to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| lowered.contains(word));

    if mentions(ALIASES) {
        Some(ColumnRole::Aliases)
    } else if mentions(BIRTH) {
        Some(ColumnRole::DateOfBirth)
    } else if mentions(IDENTIFICATION) {
        Some(ColumnRole::Identification)
    } else if mentions(NAME) {
        Some(ColumnRole::Name)
    } else {
        None
    }
}

fn is_entry(row: &[String], marker: &str) -> bool {
    row.iter().any(|cell| cell.contains(marker))
}

/// A qualifying row that is narrower than the resolved column map. The record
/// is still emitted with sentinel values; the anomaly points at a document
/// revision whose columns have moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAnomaly {
    pub page: u32,
    pub row: usize,
    pub reference_no: String,
    pub cell_count: usize,
    pub missing: Vec<ColumnRole>,
}

#[derive(Debug, Clone, Default)]
pub struct TabularExtraction {
    pub records: Vec<SanctionRecord>,
    pub anomalies: Vec<RowAnomaly>,
}

#[derive(Debug, Clone)]
pub struct TabularExtractor {
    pub resolver: ColumnResolver,
    pub marker: &'static str,
    pub designation: &'static str,
    pub nationality: &'static str,
}

impl Default for TabularExtractor {
    fn default() -> Self {
        Self {
            resolver: ColumnResolver::default(),
            marker: ENTRY_MARKER,
            designation: "Specified Entity (Domestic)",
            nationality: "Malaysia/Other",
        }
    }
}

impl TabularExtractor {
    pub fn extract(&self, tables: &[PdfTable]) -> TabularExtraction {
        let mut extraction = TabularExtraction::default();
        // Headers usually appear on the first page only; later pages keep the
        // last header-derived layout.
        let mut columns = self.resolver.fallback();

        for table in tables {
            if let Some(header) = self.resolver.header_map(table, self.marker) {
                columns = header;
            }
            for (row_index, row) in table.rows.iter().enumerate() {
                if !is_entry(row, self.marker) {
                    continue;
                }

                let record = self.record_from_row(row, &columns);
                let missing = ColumnRole::ALL
                    .into_iter()
                    .filter(|role| columns.index(*role) >= row.len())
                    .collect::<Vec<_>>();
                if !missing.is_empty() {
                    extraction.anomalies.push(RowAnomaly {
                        page: table.page,
                        row: row_index,
                        reference_no: record.reference_no.clone(),
                        cell_count: row.len(),
                        missing,
                    });
                }
                extraction.records.push(record);
            }
        }

        extraction
    }

    fn record_from_row(&self, row: &[String], columns: &ColumnMap) -> SanctionRecord {
        let reference_no = row
            .iter()
            .find(|cell| cell.contains(self.marker))
            .map(|cell| join_lines(cell, " | "))
            .unwrap_or_else(|| MISSING_CELL.to_string());
        let name = cell_text(row, columns.name, " ").unwrap_or_else(|| MISSING_CELL.to_string());
        let aliases = cell_text(row, columns.aliases, " ").into_iter().collect();
        let date_of_birth = cell_text(row, columns.date_of_birth, " | ").unwrap_or_default();
        let identification = cell_text(row, columns.identification, " | ").unwrap_or_default();

        SanctionRecord {
            source: SourceList::Moha,
            reference_no,
            name,
            aliases,
            date_of_birth,
            designation: self.designation.to_string(),
            nationality: self.nationality.to_string(),
            raw_excerpt: format!("ID: {identification}"),
        }
    }
}

fn cell_text(row: &[String], index: usize, separator: &str) -> Option<String> {
    row.get(index)
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(|cell| join_lines(cell, separator))
}

fn join_lines(cell: &str, separator: &str) -> String {
    cell.lines().collect::<Vec<_>>().join(separator)
}

/// Records from already-detected tables, resolving columns from headers
/// where present and from the default positions otherwise.
pub fn extract_tabular(tables: &[PdfTable]) -> Vec<SanctionRecord> {
    TabularExtractor::default().extract(tables).records
}

pub fn parse_tabular_pdf(pdf: &[u8]) -> Result<TabularExtraction, IngestError> {
    let tables = LopdfTableExtractor::default().extract_tables(pdf)?;
    Ok(TabularExtractor::default().extract(&tables))
}
