use crate::error::IngestError;
use crate::traits::PdfExtractor;
use lopdf::Document;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load_mem(pdf).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(
                "pdf had no readable page text (scanned lists are not supported)".to_string(),
            ));
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(pdf: &[u8]) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(pdf)
}

/// Joins page texts with a newline so the last token of one page never merges
/// into the first token of the next.
pub fn document_text(pages: &[PageText]) -> String {
    let mut full_text = String::new();
    for page in pages {
        full_text.push_str(&page.text);
        full_text.push('\n');
    }
    full_text
}
