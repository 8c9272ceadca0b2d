use crate::cache::{digest_bytes, CacheKey, ExtractionCache};
use crate::error::IngestError;
use crate::models::{DocumentFingerprint, ListFormat, SanctionRecord, SourceList, MISSING_CELL};
use crate::narrative::parse_narrative_pdf;
use crate::tabular::{parse_tabular_pdf, RowAnomaly};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One uploaded list document.
#[derive(Debug, Clone)]
pub struct ListDocument {
    pub source: SourceList,
    pub bytes: Vec<u8>,
    pub path: Option<PathBuf>,
}

impl ListDocument {
    pub fn from_bytes(source: SourceList, bytes: Vec<u8>) -> Self {
        Self {
            source,
            bytes,
            path: None,
        }
    }

    pub fn from_path(source: SourceList, path: &Path) -> Result<Self, IngestError> {
        Ok(Self {
            source,
            bytes: fs::read(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn fingerprint(&self) -> DocumentFingerprint {
        DocumentFingerprint {
            source: self.source,
            source_path: self
                .path
                .as_ref()
                .map(|path| path.to_string_lossy().to_string()),
            checksum: digest_bytes(&self.bytes),
            byte_len: self.bytes.len(),
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListExtraction {
    pub records: Vec<SanctionRecord>,
    pub anomalies: Vec<RowAnomaly>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Loaded,
    /// The document could not be opened or had no extractable text. The list
    /// contributes no records; this is "no data", not "no match".
    Unreadable { reason: String },
}

#[derive(Debug, Clone)]
pub struct ListLoad {
    pub fingerprint: DocumentFingerprint,
    pub status: LoadStatus,
    pub records: Vec<SanctionRecord>,
    pub anomalies: Vec<RowAnomaly>,
}

impl ListLoad {
    pub fn source(&self) -> SourceList {
        self.fingerprint.source
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self.status, LoadStatus::Unreadable { .. })
    }

    /// Reference numbers outside the list's own numbering scheme. A load full
    /// of these was most likely uploaded under the wrong list.
    pub fn foreign_references(&self) -> Vec<&str> {
        let prefix = self.source().reference_prefix();
        self.records
            .iter()
            .map(|record| record.reference_no.as_str())
            .filter(|reference| *reference != MISSING_CELL && !reference.starts_with(prefix))
            .collect()
    }
}

pub fn extract_list(document: &ListDocument) -> Result<ListExtraction, IngestError> {
    match document.source.format() {
        ListFormat::Narrative => Ok(ListExtraction {
            records: parse_narrative_pdf(&document.bytes, document.source)?,
            anomalies: Vec::new(),
        }),
        ListFormat::Tabular => {
            let extraction = parse_tabular_pdf(&document.bytes)?;
            Ok(ListExtraction {
                records: extraction.records,
                anomalies: extraction.anomalies,
            })
        }
    }
}

/// Extracts one document through the cache. Never fails: an unreadable
/// document yields an empty load carrying the reason.
pub fn load_list(document: &ListDocument, cache: &mut ExtractionCache) -> ListLoad {
    let fingerprint = document.fingerprint();
    let key = CacheKey::new(fingerprint.checksum.clone(), document.source);

    match cache.get_or_extract(key, || extract_list(document)) {
        Ok(extraction) => ListLoad {
            fingerprint,
            status: LoadStatus::Loaded,
            records: extraction.records,
            anomalies: extraction.anomalies,
        },
        Err(error) => ListLoad {
            fingerprint,
            status: LoadStatus::Unreadable {
                reason: error.to_string(),
            },
            records: Vec::new(),
            anomalies: Vec::new(),
        },
    }
}

pub fn load_lists(documents: &[ListDocument], cache: &mut ExtractionCache) -> Vec<ListLoad> {
    documents
        .iter()
        .map(|document| load_list(document, cache))
        .collect()
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Guesses the list a file holds from its name: `moha`, `kdn` or `domestic`
/// for the domestic list, otherwise the resolution number.
pub fn classify_list_file(path: &Path) -> Option<SourceList> {
    let stem = path.file_stem()?.to_str()?.to_lowercase();

    if ["moha", "kdn", "domestic"]
        .iter()
        .any(|marker| stem.contains(marker))
    {
        return Some(SourceList::Moha);
    }

    SourceList::ALL
        .into_iter()
        .filter(|list| list.format() == ListFormat::Narrative)
        .find(|list| stem.contains(list.key()))
}

#[derive(Debug)]
pub struct UnclassifiedPdf {
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct DiscoveryReport {
    pub documents: Vec<ListDocument>,
    pub unclassified: Vec<UnclassifiedPdf>,
}

pub fn discover_list_documents(folder: &Path) -> Result<DiscoveryReport, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut unclassified = Vec::new();
    for path in files {
        match classify_list_file(&path) {
            Some(source) => documents.push(ListDocument::from_path(source, &path)?),
            None => unclassified.push(UnclassifiedPdf { path }),
        }
    }

    // Domestic list first, then the UN lists in resolution order.
    documents.sort_by_key(|document| document.source);

    Ok(DiscoveryReport {
        documents,
        unclassified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn file_names_map_to_lists() {
        assert_eq!(
            classify_list_file(Path::new("lists/MOHA_Senarai_2024.pdf")),
            Some(SourceList::Moha)
        );
        assert_eq!(
            classify_list_file(Path::new("unscr-1988-taliban.pdf")),
            Some(SourceList::Unscr1988)
        );
        assert_eq!(
            classify_list_file(Path::new("consolidated_2231.pdf")),
            Some(SourceList::Unscr2231)
        );
        assert_eq!(classify_list_file(Path::new("minutes.pdf")), None);
    }

    #[test]
    fn discovery_fails_without_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(discover_list_documents(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn discovery_orders_lists_and_reports_strays() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a_1718.pdf"), b"%PDF-1.4")?;
        fs::write(dir.path().join("b_moha.pdf"), b"%PDF-1.4")?;
        fs::write(dir.path().join("c_minutes.pdf"), b"%PDF-1.4")?;

        let report = discover_list_documents(dir.path())?;
        let sources = report
            .documents
            .iter()
            .map(|document| document.source)
            .collect::<Vec<_>>();
        assert_eq!(sources, vec![SourceList::Moha, SourceList::Unscr1718]);
        assert_eq!(report.unclassified.len(), 1);
        Ok(())
    }

    #[test]
    fn unreadable_documents_load_empty_with_a_reason() {
        let mut cache = ExtractionCache::default();
        let documents = vec![
            ListDocument::from_bytes(SourceList::Moha, b"%PDF-1.4\n%broken".to_vec()),
            ListDocument::from_bytes(SourceList::Unscr1267, b"not a pdf".to_vec()),
        ];

        let loads = load_lists(&documents, &mut cache);

        assert_eq!(loads.len(), 2);
        assert!(loads.iter().all(|load| load.records.is_empty()));
        assert!(loads.iter().all(ListLoad::is_unreadable));
        assert_eq!(loads[1].source(), SourceList::Unscr1267);
    }

    #[test]
    fn misfiled_uploads_show_foreign_references() {
        let document = ListDocument::from_bytes(SourceList::Unscr1718, b"%PDF-1.4".to_vec());
        let records = crate::store::seed_records()
            .into_iter()
            .filter(|record| record.source != SourceList::Unscr1718)
            .take(2)
            .collect::<Vec<_>>();
        let load = ListLoad {
            fingerprint: document.fingerprint(),
            status: LoadStatus::Loaded,
            records,
            anomalies: Vec::new(),
        };

        assert_eq!(load.foreign_references(), vec!["KDN.1.08-2014", "KDN.1.04-2016"]);

        let own = ListLoad {
            records: crate::store::seed_records()
                .into_iter()
                .filter(|record| record.source == SourceList::Unscr1718)
                .collect(),
            ..load
        };
        assert!(own.foreign_references().is_empty());
    }
}
