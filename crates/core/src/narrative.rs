//! Record extraction for lists published as running text with labelled
//! fields (the UN Security Council consolidated lists).
//!
//! A list format is described by a [`NarrativeLayout`]: the entry boundary
//! and one [`FieldRule`] per field, each naming the labels that open the field
//! and the labels that may close it. [`NarrativeExtractor`] compiles a layout
//! once and applies the same matcher to every rule.

use crate::chunking::{excerpt, normalize_whitespace, split_entries, REFERENCE_PATTERN};
use crate::error::IngestError;
use crate::extractor::{document_text, LopdfExtractor};
use crate::models::{SanctionRecord, SourceList, NOT_AVAILABLE, UNKNOWN_NAME};
use crate::traits::PdfExtractor;
use regex::Regex;

const FILLER_TOKEN: &str = "na";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeField {
    Name,
    Aliases,
    DateOfBirth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// The value stops at the end of its line.
    SingleLine,
    /// The value may wrap over several lines.
    MultiLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Drop `1:`..`4:` ordinal markers and `na` fillers, collapse whitespace.
    PersonName,
    /// Split on the `a)`, `b)`, ... enumeration and discard trivial fragments.
    AliasList,
    Trimmed,
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: NarrativeField,
    pub start_labels: &'static [&'static str],
    pub terminators: &'static [&'static str],
    pub span: Span,
    pub post: PostProcess,
}

#[derive(Debug, Clone)]
pub struct NarrativeLayout {
    pub reference_pattern: &'static str,
    pub rules: Vec<FieldRule>,
    pub designation: &'static str,
    pub nationality: &'static str,
    pub excerpt_chars: usize,
}

const ALIAS_TERMINATORS: &[&str] = &[
    "Nationality:",
    "Passport no:",
    "National identification",
    "Address:",
];

const GOOD_ALIAS_TERMINATORS: &[&str] = &[
    "Low quality a.k.a.:",
    "Nationality:",
    "Passport no:",
    "National identification",
    "Address:",
];

impl NarrativeLayout {
    pub fn un_consolidated() -> Self {
        Self {
            reference_pattern: REFERENCE_PATTERN,
            rules: vec![
                FieldRule {
                    field: NarrativeField::Name,
                    start_labels: &["Name:"],
                    terminators: &["Name (original script)", "Title:", "Designation:", "DOB:"],
                    span: Span::MultiLine,
                    post: PostProcess::PersonName,
                },
                FieldRule {
                    field: NarrativeField::Aliases,
                    start_labels: &["Good quality a.k.a.:"],
                    terminators: GOOD_ALIAS_TERMINATORS,
                    span: Span::MultiLine,
                    post: PostProcess::AliasList,
                },
                FieldRule {
                    field: NarrativeField::Aliases,
                    start_labels: &["Low quality a.k.a.:"],
                    terminators: ALIAS_TERMINATORS,
                    span: Span::MultiLine,
                    post: PostProcess::AliasList,
                },
                FieldRule {
                    field: NarrativeField::DateOfBirth,
                    start_labels: &["DOB:"],
                    terminators: &["POB:", "Good quality"],
                    span: Span::SingleLine,
                    post: PostProcess::Trimmed,
                },
            ],
            designation: "UN Sanctioned",
            nationality: "International",
            excerpt_chars: 300,
        }
    }
}

struct CompiledRule {
    rule: FieldRule,
    pattern: Regex,
}

pub struct NarrativeExtractor {
    layout: NarrativeLayout,
    boundary: Regex,
    reference: Regex,
    ordinal: Regex,
    enumeration: Regex,
    rules: Vec<CompiledRule>,
}

impl NarrativeExtractor {
    pub fn new(layout: NarrativeLayout) -> Result<Self, IngestError> {
        let boundary = Regex::new(&format!(r"\s*\b{}", layout.reference_pattern))?;
        let reference = Regex::new(layout.reference_pattern)?;
        let rules = layout
            .rules
            .iter()
            .map(|rule| -> Result<CompiledRule, IngestError> {
                Ok(CompiledRule {
                    rule: rule.clone(),
                    pattern: Regex::new(&field_pattern(rule))?,
                })
            })
            .collect::<Result<Vec<_>, IngestError>>()?;

        Ok(Self {
            layout,
            boundary,
            reference,
            ordinal: Regex::new(r"\d+:")?,
            enumeration: Regex::new(r"[a-z]\)")?,
            rules,
        })
    }

    pub fn un_consolidated() -> Result<Self, IngestError> {
        Self::new(NarrativeLayout::un_consolidated())
    }

    pub fn extract(&self, raw_text: &str, source: SourceList) -> Vec<SanctionRecord> {
        split_entries(raw_text, &self.boundary)
            .into_iter()
            .filter_map(|chunk| self.extract_entry(chunk, source))
            .collect()
    }

    /// Builds one record from one chunk. Returns `None` only when the chunk
    /// carries no reference number at all (page headers, footers, preamble).
    pub fn extract_entry(&self, chunk: &str, source: SourceList) -> Option<SanctionRecord> {
        let reference_no = self.reference.find(chunk)?.as_str().to_string();

        let mut name = None;
        let mut aliases = Vec::new();
        let mut date_of_birth = None;

        for compiled in &self.rules {
            let Some(raw) = capture_field(&compiled.pattern, chunk) else {
                continue;
            };

            match (compiled.rule.field, compiled.rule.post) {
                (NarrativeField::Aliases, _) | (_, PostProcess::AliasList) => {
                    aliases.extend(self.split_aliases(raw));
                }
                (field, post) => {
                    let value = match post {
                        PostProcess::PersonName => self.clean_name(raw),
                        _ => raw.trim().to_string(),
                    };
                    let slot = match field {
                        NarrativeField::Name => &mut name,
                        _ => &mut date_of_birth,
                    };
                    if slot.is_none() && !value.is_empty() {
                        *slot = Some(value);
                    }
                }
            }
        }

        Some(SanctionRecord {
            source,
            reference_no,
            name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            aliases,
            date_of_birth: date_of_birth.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            designation: self.layout.designation.to_string(),
            nationality: self.layout.nationality.to_string(),
            raw_excerpt: excerpt(chunk, self.layout.excerpt_chars),
        })
    }

    fn clean_name(&self, raw: &str) -> String {
        let without_ordinals = self.ordinal.replace_all(raw, " ");
        without_ordinals
            .split_whitespace()
            .filter(|token| *token != FILLER_TOKEN)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn split_aliases(&self, raw: &str) -> Vec<String> {
        self.enumeration
            .split(raw)
            .map(|fragment| {
                normalize_whitespace(fragment.trim_matches(|c: char| c.is_whitespace() || c == ';'))
            })
            .filter(|alias| alias.chars().count() > 1)
            .filter(|alias| !alias.eq_ignore_ascii_case(FILLER_TOKEN))
            .collect()
    }
}

fn field_pattern(rule: &FieldRule) -> String {
    let flags = match rule.span {
        Span::MultiLine => "(?s)",
        Span::SingleLine => "",
    };
    format!(
        r"{flags}(?:{})\s*(.*?)\s*(?:{})",
        alternation(rule.start_labels),
        alternation(rule.terminators)
    )
}

fn alternation(labels: &[&str]) -> String {
    labels
        .iter()
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|")
}

fn capture_field<'a>(pattern: &Regex, chunk: &'a str) -> Option<&'a str> {
    pattern
        .captures(chunk)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
}

/// Records from already-extracted list text, using the UN consolidated layout.
pub fn extract_narrative(raw_text: &str, source: SourceList) -> Vec<SanctionRecord> {
    NarrativeExtractor::un_consolidated()
        .map(|extractor| extractor.extract(raw_text, source))
        .unwrap_or_default()
}

pub fn parse_narrative_pdf(
    pdf: &[u8],
    source: SourceList,
) -> Result<Vec<SanctionRecord>, IngestError> {
    let pages = LopdfExtractor.extract_pages(pdf)?;
    let extractor = NarrativeExtractor::un_consolidated()?;
    Ok(extractor.extract(&document_text(&pages), source))
}
