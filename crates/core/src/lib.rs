pub mod cache;
pub mod chunking;
pub mod decision;
pub mod error;
pub mod extractor;
pub mod fonts;
pub mod ingest;
pub mod models;
pub mod narrative;
pub mod orchestrator;
pub mod screening;
pub mod store;
pub mod tables;
pub mod tabular;
pub mod traits;

pub use cache::{digest_bytes, CacheKey, ExtractionCache};
pub use chunking::{normalize_whitespace, split_entries, REFERENCE_PATTERN};
pub use decision::{
    format_decision, is_high_risk, ComplianceCase, Decision, MatchStatus, ReportExport,
    REGULATORY_CITATION,
};
pub use error::{IngestError, ScreeningError};
pub use extractor::{document_text, extract_page_texts, LopdfExtractor, PageText};
pub use fonts::{FontMetrics, PageFonts, ToUnicodeReader};
pub use ingest::{
    classify_list_file, discover_list_documents, discover_pdf_files, extract_list, load_list,
    load_lists, DiscoveryReport, ListDocument, ListExtraction, ListLoad, LoadStatus,
    UnclassifiedPdf,
};
pub use models::{
    DocumentFingerprint, ListFormat, SanctionRecord, ScreeningOptions, SourceList, MISSING_CELL,
    NOT_AVAILABLE, UNKNOWN_NAME,
};
pub use narrative::{extract_narrative, parse_narrative_pdf, NarrativeExtractor, NarrativeLayout};
pub use orchestrator::ScreeningCoordinator;
pub use screening::{rank_candidates, screen, token_set_ratio, ScreeningHit};
pub use store::{seed_records, RecordStore, StoreOrigin};
pub use tables::{
    extract_page_tables, page_fragments, LopdfTableExtractor, PdfTable, TableDetectionConfig,
    TextFragment,
};
pub use tabular::{
    extract_tabular, parse_tabular_pdf, ColumnMap, ColumnResolver, ColumnRole, RowAnomaly,
    TabularExtraction, TabularExtractor,
};
pub use traits::{PdfExtractor, TableExtractor};
