use crate::error::IngestError;
use crate::extractor::PageText;
use crate::tables::PdfTable;

pub trait PdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

pub trait TableExtractor {
    fn extract_tables(&self, pdf: &[u8]) -> Result<Vec<PdfTable>, IngestError>;
}
