//! Page font metrics and string decoding for content-stream text.
//!
//! Simple fonts decode through `lopdf`'s named encodings. Composite (Type0)
//! fonts use two-byte codes and are only readable through their `ToUnicode`
//! CMap, which `lopdf` does not interpret, so the `bfchar`/`bfrange` blocks
//! are read here.

use crate::error::IngestError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Glyph width in thousandths of an em when a simple font has no `/Widths`.
const FALLBACK_WIDTH: f64 = 500.0;
const MONOSPACE_WIDTH: f64 = 600.0;
const CID_DEFAULT_WIDTH: f64 = 1000.0;
const MAX_RANGE_SPAN: u32 = 0xFFFF;

pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct FontMetrics {
    encoding: Option<String>,
    two_byte: bool,
    to_unicode: HashMap<u32, String>,
    widths: HashMap<u32, f64>,
    default_width: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            encoding: None,
            two_byte: false,
            to_unicode: HashMap::new(),
            widths: HashMap::new(),
            default_width: FALLBACK_WIDTH,
        }
    }
}

impl FontMetrics {
    fn load(font: &Dictionary, document: &Document, cmaps: &ToUnicodeReader) -> Self {
        let to_unicode = font
            .get_deref(b"ToUnicode", document)
            .and_then(Object::as_stream)
            .ok()
            .and_then(stream_bytes)
            .map(|bytes| cmaps.read(&String::from_utf8_lossy(&bytes)))
            .unwrap_or_default();

        let subtype = font.get(b"Subtype").and_then(Object::as_name).unwrap_or_default();
        if subtype == b"Type0" {
            let descendant = font
                .get_deref(b"DescendantFonts", document)
                .and_then(Object::as_array)
                .ok()
                .and_then(|fonts| fonts.first())
                .and_then(|first| document.dereference(first).ok())
                .and_then(|(_, object)| object.as_dict().ok());

            return Self {
                encoding: None,
                two_byte: true,
                to_unicode,
                widths: descendant
                    .map(|cid_font| cid_widths(cid_font, document))
                    .unwrap_or_default(),
                default_width: descendant
                    .and_then(|cid_font| cid_font.get(b"DW").ok())
                    .and_then(number)
                    .unwrap_or(CID_DEFAULT_WIDTH),
            };
        }

        let base_font = font.get(b"BaseFont").and_then(Object::as_name).unwrap_or_default();
        let default_width = if String::from_utf8_lossy(base_font).contains("Courier") {
            MONOSPACE_WIDTH
        } else {
            FALLBACK_WIDTH
        };

        Self {
            encoding: Some(font.get_font_encoding().to_string()),
            two_byte: false,
            to_unicode,
            widths: simple_widths(font, document),
            default_width,
        }
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0, |code, byte| (code << 8) | u32::from(*byte)))
                .collect()
        } else {
            bytes.iter().map(|byte| u32::from(*byte)).collect()
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.to_unicode.is_empty() {
            if self.two_byte {
                // CIDs without a ToUnicode map carry no recoverable text.
                return String::new();
            }
            return Document::decode_text(self.encoding.as_deref(), bytes);
        }

        let mut text = String::new();
        for code in self.codes(bytes) {
            match self.to_unicode.get(&code) {
                Some(mapped) => text.push_str(mapped),
                None if !self.two_byte => {
                    if let Ok(byte) = u8::try_from(code) {
                        text.push_str(&Document::decode_text(self.encoding.as_deref(), &[byte]));
                    }
                }
                None => {}
            }
        }
        text
    }

    /// Total advance of `bytes` in thousandths of an em.
    pub fn advance(&self, bytes: &[u8]) -> f64 {
        self.codes(bytes)
            .into_iter()
            .map(|code| self.widths.get(&code).copied().unwrap_or(self.default_width))
            .sum()
    }
}

fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

fn simple_widths(font: &Dictionary, document: &Document) -> HashMap<u32, f64> {
    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(number)
        .map_or(0, |first| first as u32);
    let Ok(widths) = font.get_deref(b"Widths", document).and_then(Object::as_array) else {
        return HashMap::new();
    };

    widths
        .iter()
        .enumerate()
        .filter_map(|(offset, width)| number(width).map(|width| (first_char + offset as u32, width)))
        .collect()
}

/// Reads a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` runs.
fn cid_widths(cid_font: &Dictionary, document: &Document) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let Ok(entries) = cid_font.get_deref(b"W", document).and_then(Object::as_array) else {
        return widths;
    };

    let mut index = 0;
    while let Some(first) = entries.get(index).and_then(number) {
        let first = first as u32;
        match entries.get(index + 1) {
            Some(Object::Array(run)) => {
                for (offset, width) in run.iter().enumerate() {
                    if let Some(width) = number(width) {
                        widths.insert(first + offset as u32, width);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) =
                    (number(last), entries.get(index + 2).and_then(number))
                else {
                    break;
                };
                let last = (last as u32).min(first.saturating_add(MAX_RANGE_SPAN));
                for code in first..=last {
                    widths.insert(code, width);
                }
                index += 3;
            }
            None => break,
        }
    }

    widths
}

/// Parser for the character-mapping blocks of a `ToUnicode` CMap.
#[derive(Debug)]
pub struct ToUnicodeReader {
    bfchar: Regex,
    bfrange: Regex,
    pair: Regex,
    range: Regex,
    hex: Regex,
}

impl ToUnicodeReader {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            bfchar: Regex::new(r"(?s)beginbfchar(.*?)endbfchar")?,
            bfrange: Regex::new(r"(?s)beginbfrange(.*?)endbfrange")?,
            pair: Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>")?,
            range: Regex::new(
                r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(<[0-9A-Fa-f]*>|\[[^\]]*\])",
            )?,
            hex: Regex::new(r"<([0-9A-Fa-f]*)>")?,
        })
    }

    pub fn read(&self, cmap: &str) -> HashMap<u32, String> {
        let mut mapping = HashMap::new();

        for section in self.bfchar.captures_iter(cmap) {
            for pair in self.pair.captures_iter(&section[1]) {
                if let Ok(code) = u32::from_str_radix(&pair[1], 16) {
                    mapping.insert(code, String::from_utf16_lossy(&utf16_units(&pair[2])));
                }
            }
        }

        for section in self.bfrange.captures_iter(cmap) {
            for range in self.range.captures_iter(&section[1]) {
                let (Ok(low), Ok(high)) = (
                    u32::from_str_radix(&range[1], 16),
                    u32::from_str_radix(&range[2], 16),
                ) else {
                    continue;
                };
                if high < low || high - low > MAX_RANGE_SPAN {
                    continue;
                }

                let target = &range[3];
                if target.starts_with('[') {
                    for (offset, item) in self.hex.captures_iter(target).enumerate() {
                        mapping.insert(
                            low + offset as u32,
                            String::from_utf16_lossy(&utf16_units(&item[1])),
                        );
                    }
                } else {
                    let base = utf16_units(target.trim_matches(|c: char| c == '<' || c == '>'));
                    for offset in 0..=(high - low) {
                        let mut units = base.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        mapping.insert(low + offset, String::from_utf16_lossy(&units));
                    }
                }
            }
        }

        mapping
    }
}

fn utf16_units(hex: &str) -> Vec<u16> {
    let bytes = (0..hex.len())
        .step_by(2)
        .filter_map(|start| hex.get(start..start + 2))
        .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
        .collect::<Vec<_>>();
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Metrics for every font resource of one page, keyed by resource name.
#[derive(Debug, Default)]
pub struct PageFonts {
    fonts: BTreeMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
}

impl PageFonts {
    pub fn load(document: &Document, page_id: ObjectId, cmaps: &ToUnicodeReader) -> Self {
        let fonts = document
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, FontMetrics::load(font, document, cmaps)))
            .collect();

        Self {
            fonts,
            fallback: FontMetrics::default(),
        }
    }

    pub fn get(&self, name: &[u8]) -> &FontMetrics {
        self.fonts.get(name).unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &str = "/CIDInit /ProcSet findresource begin\n\
        begincmap\n\
        1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
        3 beginbfchar\n<0001> <004B>\n<0002> <0044>\n<0003> <004E>\nendbfchar\n\
        2 beginbfrange\n<0010> <0019> <0030>\n<0020> <0021> [<0041> <00E9>]\nendbfrange\n\
        endcmap\n";

    #[test]
    fn cmap_chars_and_ranges_are_read() -> Result<(), IngestError> {
        let mapping = ToUnicodeReader::new()?.read(CMAP);

        assert_eq!(mapping.get(&0x0001).map(String::as_str), Some("K"));
        assert_eq!(mapping.get(&0x0003).map(String::as_str), Some("N"));
        assert_eq!(mapping.get(&0x0010).map(String::as_str), Some("0"));
        assert_eq!(mapping.get(&0x0019).map(String::as_str), Some("9"));
        assert_eq!(mapping.get(&0x0021).map(String::as_str), Some("é"));
        assert_eq!(mapping.len(), 3 + 10 + 2);
        Ok(())
    }

    #[test]
    fn two_byte_codes_decode_through_the_cmap() -> Result<(), IngestError> {
        let metrics = FontMetrics {
            encoding: None,
            two_byte: true,
            to_unicode: ToUnicodeReader::new()?.read(CMAP),
            widths: HashMap::from([(1, 600.0), (2, 700.0)]),
            default_width: CID_DEFAULT_WIDTH,
        };
        let bytes = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x11];

        assert_eq!(metrics.decode(&bytes), "KDN1");
        assert_eq!(metrics.advance(&bytes), 600.0 + 700.0 + 1000.0 + 1000.0);
        Ok(())
    }

    #[test]
    fn unmapped_cids_yield_no_text() {
        let metrics = FontMetrics {
            two_byte: true,
            ..FontMetrics::default()
        };
        assert_eq!(metrics.decode(&[0x00, 0x2E]), "");
    }

    #[test]
    fn simple_fonts_use_named_encodings() {
        let metrics = FontMetrics {
            encoding: Some("WinAnsiEncoding".to_string()),
            ..FontMetrics::default()
        };
        assert_eq!(metrics.decode(b"KDN.1.08-2014"), "KDN.1.08-2014");
        assert_eq!(metrics.advance(b"KDN"), 3.0 * FALLBACK_WIDTH);
    }
}
