//! Table detection over PDF content streams.
//!
//! `lopdf` only hands back flat page text, so tables are rebuilt from the
//! positioned text-show operators: each shown string is measured with the
//! page font's glyph widths, fragments on one baseline that sit closer than a
//! word gap are merged into phrases, column anchors come from the left edges
//! of multi-phrase lines, and lines with nothing in the first column are
//! folded into the row above as continuation lines (kept as embedded line
//! breaks).

use crate::error::IngestError;
use crate::fonts::{number, PageFonts, ToUnicodeReader};
use crate::traits::TableExtractor;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
}

/// One run of text drawn from `x` to `end_x` on baseline `y`, in a font of
/// effective size `size`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x: f64,
    pub end_x: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDetectionConfig {
    /// Maximum baseline difference for two fragments to share a line.
    pub line_tolerance: f64,
    /// Left edges closer than this collapse into one column anchor.
    pub column_tolerance: f64,
    /// Phrases a line needs before it counts as a table row.
    pub min_columns: usize,
    /// Gaps up to this many ems join fragments with no separator.
    pub glyph_gap_em: f64,
    /// Gaps up to this many ems join fragments with a space.
    pub word_gap_em: f64,
}

impl Default for TableDetectionConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 2.0,
            column_tolerance: 6.0,
            min_columns: 3,
            glyph_gap_em: 0.15,
            word_gap_em: 0.75,
        }
    }
}

#[derive(Default)]
pub struct LopdfTableExtractor {
    pub config: TableDetectionConfig,
}

impl TableExtractor for LopdfTableExtractor {
    fn extract_tables(&self, pdf: &[u8]) -> Result<Vec<PdfTable>, IngestError> {
        let document =
            Document::load_mem(pdf).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        let cmaps = ToUnicodeReader::new()?;

        let mut tables = Vec::new();
        for (page_no, page_id) in document.get_pages() {
            let fragments = page_fragments(&document, page_id, &cmaps)?;
            if let Some(table) = assemble_table(page_no, &fragments, &self.config) {
                tables.push(table);
            }
        }

        Ok(tables)
    }
}

pub fn extract_page_tables(pdf: &[u8]) -> Result<Vec<PdfTable>, IngestError> {
    LopdfTableExtractor::default().extract_tables(pdf)
}

/// Decodes one page's content stream into positioned text fragments.
pub fn page_fragments(
    document: &Document,
    page_id: ObjectId,
    cmaps: &ToUnicodeReader,
) -> Result<Vec<TextFragment>, IngestError> {
    let raw = document
        .get_page_content(page_id)
        .map_err(|error| IngestError::PdfParse(error.to_string()))?;
    let content = Content::decode(&raw).map_err(|error| IngestError::PdfParse(error.to_string()))?;
    let fonts = PageFonts::load(document, page_id, cmaps);

    Ok(position_fragments(&content.operations, &fonts))
}

// Kerning adjustments wider than this in a TJ array are treated as word gaps.
const TJ_SPACE_THRESHOLD: f64 = -200.0;

#[derive(Debug)]
struct TextState<'a> {
    fonts: &'a PageFonts,
    font: Vec<u8>,
    font_size: f64,
    scale_x: f64,
    scale_y: f64,
    line_x: f64,
    line_y: f64,
    pen_x: f64,
    leading: f64,
    moved: bool,
}

impl<'a> TextState<'a> {
    fn new(fonts: &'a PageFonts) -> Self {
        Self {
            fonts,
            font: Vec::new(),
            font_size: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            line_x: 0.0,
            line_y: 0.0,
            pen_x: 0.0,
            leading: 0.0,
            moved: true,
        }
    }

    /// Text objects reset the matrices; font and leading persist.
    fn begin_text(&mut self) {
        self.scale_x = 1.0;
        self.scale_y = 1.0;
        self.move_to(0.0, 0.0);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.line_x = x;
        self.line_y = y;
        self.pen_x = x;
        self.moved = true;
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.move_to(self.line_x + tx * self.scale_x, self.line_y + ty * self.scale_y);
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    /// Thousandths-of-an-em advance to page units.
    fn to_page(&self, thousandths: f64) -> f64 {
        thousandths / 1000.0 * self.font_size * self.scale_x
    }

    fn decode(&self, object: &Object) -> Option<(String, f64)> {
        let Object::String(bytes, _) = object else {
            return None;
        };
        let metrics = self.fonts.get(&self.font);
        Some((metrics.decode(bytes), self.to_page(metrics.advance(bytes))))
    }

    fn decode_array(&self, object: &Object) -> Option<(String, f64)> {
        let Object::Array(items) = object else {
            return self.decode(object);
        };

        let mut text = String::new();
        let mut advance = 0.0;
        for item in items {
            if let Some((piece, width)) = self.decode(item) {
                text.push_str(&piece);
                advance += width;
            } else if let Some(adjust) = number(item) {
                if adjust < TJ_SPACE_THRESHOLD {
                    text.push(' ');
                }
                advance -= self.to_page(adjust);
            }
        }
        Some((text, advance))
    }

    fn show(&mut self, shown: (String, f64), fragments: &mut Vec<TextFragment>) {
        let (text, advance) = shown;
        let start = self.pen_x;
        self.pen_x += advance;

        if !self.moved {
            if let Some(last) = fragments.last_mut() {
                last.text.push_str(&text);
                last.end_x = self.pen_x;
                return;
            }
        }
        if text.trim().is_empty() {
            return;
        }

        fragments.push(TextFragment {
            x: start,
            end_x: self.pen_x,
            y: self.line_y,
            size: self.font_size * self.scale_y,
            text,
        });
        self.moved = false;
    }
}

/// Walks text operators and returns each shown string at the position it was
/// drawn. Strings shown without an intervening move extend the previous fragment.
pub fn position_fragments(operations: &[Operation], fonts: &PageFonts) -> Vec<TextFragment> {
    let mut state = TextState::new(fonts);
    let mut fragments: Vec<TextFragment> = Vec::new();

    for operation in operations {
        let operands = operation.operands.as_slice();
        let shown = match operation.operator.as_str() {
            "BT" => {
                state.begin_text();
                None
            }
            "Tf" => {
                if let [name, size] = operands {
                    if let (Ok(name), Some(size)) = (name.as_name(), number(size)) {
                        state.font = name.to_vec();
                        state.font_size = size;
                    }
                }
                None
            }
            "Tm" => {
                if let [a, b, c, d, e, f] = operands {
                    let matrix = [a, b, c, d, e, f].map(number);
                    if let [Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)] = matrix {
                        state.scale_x = a.hypot(b);
                        state.scale_y = c.hypot(d);
                        state.move_to(e, f);
                    }
                }
                None
            }
            "Td" | "TD" => {
                if let [tx, ty] = operands {
                    if let (Some(tx), Some(ty)) = (number(tx), number(ty)) {
                        if operation.operator == "TD" {
                            state.leading = -ty;
                        }
                        state.translate(tx, ty);
                    }
                }
                None
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" => operands.first().and_then(|object| state.decode(object)),
            "TJ" => operands.first().and_then(|object| state.decode_array(object)),
            "'" => {
                state.next_line();
                operands.first().and_then(|object| state.decode(object))
            }
            "\"" => {
                state.next_line();
                operands.get(2).and_then(|object| state.decode(object))
            }
            _ => None,
        };

        if let Some(shown) = shown {
            state.show(shown, &mut fragments);
        }
    }

    fragments
}

pub fn assemble_table(
    page: u32,
    fragments: &[TextFragment],
    config: &TableDetectionConfig,
) -> Option<PdfTable> {
    let lines = group_lines(fragments, config);
    let anchors = column_anchors(&lines, config);
    if anchors.len() < config.min_columns {
        return None;
    }

    let first_row = lines
        .iter()
        .position(|line| line.len() >= config.min_columns)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in &lines[first_row..] {
        let mut cells = vec![String::new(); anchors.len()];
        for fragment in line {
            let column = column_for(fragment.x, &anchors, config.column_tolerance);
            append_with(&mut cells[column], fragment.text.trim(), " ");
        }

        let continuation = cells[0].is_empty() && !rows.is_empty();
        if continuation {
            if let Some(row) = rows.last_mut() {
                for (cell, piece) in row.iter_mut().zip(cells) {
                    append_with(cell, &piece, "\n");
                }
            }
        } else {
            rows.push(cells);
        }
    }

    Some(PdfTable { page, rows })
}

/// Groups fragments into baseline lines, top to bottom, each left to right
/// with word fragments merged into phrases.
fn group_lines(fragments: &[TextFragment], config: &TableDetectionConfig) -> Vec<Vec<TextFragment>> {
    let mut ordered = fragments.iter().collect::<Vec<_>>();
    ordered.sort_by(|left, right| match right.y.total_cmp(&left.y) {
        Ordering::Equal => left.x.total_cmp(&right.x),
        other => other,
    });

    let mut lines: Vec<Vec<TextFragment>> = Vec::new();
    let mut baseline = f64::NAN;
    for fragment in ordered {
        match lines.last_mut() {
            Some(line) if (baseline - fragment.y).abs() <= config.line_tolerance => {
                line.push(fragment.clone())
            }
            _ => {
                baseline = fragment.y;
                lines.push(vec![fragment.clone()]);
            }
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|left, right| left.x.total_cmp(&right.x));
            merge_words(line, config)
        })
        .collect()
}

fn merge_words(line: Vec<TextFragment>, config: &TableDetectionConfig) -> Vec<TextFragment> {
    let mut merged: Vec<TextFragment> = Vec::new();

    for fragment in line {
        let separator = merged
            .last()
            .and_then(|previous| word_separator(previous, &fragment, config));
        if let (Some(separator), Some(previous)) = (separator, merged.last_mut()) {
            previous.text.push_str(separator);
            previous.text.push_str(&fragment.text);
            previous.end_x = previous.end_x.max(fragment.end_x);
            continue;
        }
        merged.push(fragment);
    }

    merged
}

fn word_separator(
    previous: &TextFragment,
    next: &TextFragment,
    config: &TableDetectionConfig,
) -> Option<&'static str> {
    let em = previous.size.max(next.size);
    let gap = next.x - previous.end_x;
    if gap <= config.glyph_gap_em * em {
        Some("")
    } else if gap <= config.word_gap_em * em {
        Some(" ")
    } else {
        None
    }
}

fn column_anchors(lines: &[Vec<TextFragment>], config: &TableDetectionConfig) -> Vec<f64> {
    let mut edges = lines
        .iter()
        .filter(|line| line.len() >= config.min_columns)
        .flat_map(|line| line.iter().map(|fragment| fragment.x))
        .collect::<Vec<_>>();
    edges.sort_by(f64::total_cmp);

    let mut anchors: Vec<f64> = Vec::new();
    for edge in edges {
        if anchors
            .last()
            .map_or(true, |last| edge - last > config.column_tolerance)
        {
            anchors.push(edge);
        }
    }
    anchors
}

fn column_for(x: f64, anchors: &[f64], tolerance: f64) -> usize {
    anchors
        .iter()
        .rposition(|anchor| *anchor <= x + tolerance)
        .unwrap_or(0)
}

fn append_with(cell: &mut String, piece: &str, separator: &str) {
    if piece.is_empty() {
        return;
    }
    if !cell.is_empty() {
        cell.push_str(separator);
    }
    cell.push_str(piece);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::extract_tabular;
    use lopdf::dictionary;
    use lopdf::Stream;

    fn show_at(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Integer(x),
                    Object::Integer(y),
                ],
            ),
            Operation::new("Tj", vec![Object::string_literal(text)]),
        ]
    }

    /// One-page document whose page tree carries a Courier `F1` resource.
    fn build_pdf(
        font_size: i64,
        cells: &[(i64, i64, &str)],
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(font_size)],
            ),
        ];
        for (x, y, text) in cells {
            operations.extend(show_at(*x, *y, text));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn fragment(x: f64, end_x: f64, y: f64, text: &str) -> TextFragment {
        TextFragment {
            x,
            end_x,
            y,
            size: 10.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn rows_and_continuation_lines_are_rebuilt_from_a_pdf() -> Result<(), Box<dyn std::error::Error>>
    {
        let pdf = build_pdf(
            9,
            &[
                (50, 760, "SENARAI KEMENTERIAN DALAM NEGERI"),
                (50, 700, "Bil"),
                (150, 700, "Rujukan"),
                (250, 700, "Nama"),
                (50, 680, "1"),
                (150, 680, "KDN.1.08-2014"),
                (250, 680, "Halimah binti"),
                (250, 668, "Hussein"),
                (50, 650, "2"),
                (150, 650, "KDN.1.04-2016"),
                (250, 650, "Nor Mahmudah"),
            ],
        )?;

        let tables = extract_page_tables(&pdf)?;

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec!["Bil".to_string(), "Rujukan".to_string(), "Nama".to_string()],
                vec![
                    "1".to_string(),
                    "KDN.1.08-2014".to_string(),
                    "Halimah binti\nHussein".to_string(),
                ],
                vec![
                    "2".to_string(),
                    "KDN.1.04-2016".to_string(),
                    "Nor Mahmudah".to_string(),
                ],
            ]
        );
        Ok(())
    }

    #[test]
    fn words_placed_one_by_one_stay_in_their_cell() -> Result<(), Box<dyn std::error::Error>> {
        // Courier at 10pt advances 6 units per glyph; words sit one space apart.
        let pdf = build_pdf(
            10,
            &[
                (50, 700, "1"),
                (80, 700, "KDN.1.08-2014"),
                (170, 700, "Halimah"),
                (218, 700, "binti"),
                (254, 700, "Hussein"),
                (330, 700, "Individu"),
                (400, 700, "Johor"),
                (450, 700, "9.12.1961"),
            ],
        )?;

        let tables = extract_page_tables(&pdf)?;
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows[0],
            vec![
                "1",
                "KDN.1.08-2014",
                "Halimah binti Hussein",
                "Individu",
                "Johor",
                "9.12.1961"
            ]
        );

        let records = extract_tabular(&tables);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reference_no, "KDN.1.08-2014");
        assert_eq!(records[0].name, "Halimah binti Hussein");
        assert_eq!(records[0].date_of_birth, "9.12.1961");
        Ok(())
    }

    #[test]
    fn identity_h_fonts_decode_through_their_cmap() -> Result<(), Box<dyn std::error::Error>> {
        let cmap = "begincmap\n\
            3 beginbfchar\n<0001> <004B>\n<0002> <0044>\n<0003> <004E>\nendbfchar\n\
            1 beginbfrange\n<0010> <0019> <0030>\nendbfrange\nendcmap\n";

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, cmap.as_bytes().to_vec()));
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Arial",
            "DW" => 1000,
            "W" => vec![1.into(), vec![600.into(), 700.into(), 700.into()].into()],
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Arial",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![cid_font_id.into()],
            "ToUnicode" => to_unicode_id,
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x11],
                        lopdf::StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let fragments = page_fragments(&doc, page_id, &ToUnicodeReader::new()?)?;

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "KDN1");
        assert_eq!(fragments[0].x, 100.0);
        // (600 + 700 + 700 + 1000) / 1000 * 10
        assert!((fragments[0].end_x - 130.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn tj_arrays_split_words_on_wide_kerning() {
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(10), Object::Integer(20)]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("RI"),
                    Object::Integer(-250),
                    Object::string_literal("WON"),
                    Object::Integer(-12),
                    Object::string_literal("HO"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ];

        let fragments = position_fragments(&operations, &PageFonts::default());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "RI WONHO");
        assert_eq!((fragments[0].x, fragments[0].y), (10.0, 20.0));
        // 7 glyphs at 500/1000 em plus 262/1000 em of kerning, at 12pt.
        assert!((fragments[0].end_x - (10.0 + 42.0 + 3.144)).abs() < 1e-9);
    }

    #[test]
    fn shows_without_a_move_extend_the_previous_fragment() {
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("Td", vec![Object::Integer(5), Object::Integer(100)]),
            Operation::new("Tj", vec![Object::string_literal("KDN.1.")]),
            Operation::new("Tj", vec![Object::string_literal("08-2014")]),
            Operation::new("TL", vec![Object::Integer(12)]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![Object::string_literal("next")]),
            Operation::new("ET", vec![]),
        ];

        let fragments = position_fragments(&operations, &PageFonts::default());
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "KDN.1.08-2014");
        assert_eq!(fragments[0].end_x, 5.0 + 13.0 * 5.0);
        assert_eq!((fragments[1].x, fragments[1].y), (5.0, 88.0));
    }

    #[test]
    fn close_fragments_merge_before_columns_are_found() {
        let config = TableDetectionConfig::default();
        let fragments = vec![
            fragment(50.0, 56.0, 700.0, "1"),
            fragment(80.0, 110.0, 700.0, "KDN.1"),
            fragment(111.0, 150.0, 700.0, ".08-2014"),
            fragment(170.0, 212.0, 700.0, "Halimah"),
            fragment(218.0, 248.0, 700.0, "binti"),
            fragment(330.0, 378.0, 700.0, "Individu"),
        ];

        let lines = group_lines(&fragments, &config);
        let texts = lines[0]
            .iter()
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["1", "KDN.1.08-2014", "Halimah binti", "Individu"]);
        assert_eq!(lines[0][2].end_x, 248.0);
    }

    #[test]
    fn pages_without_enough_columns_have_no_table() {
        let fragments = vec![
            fragment(50.0, 75.0, 700.0, "Title"),
            fragment(50.0, 70.0, 680.0, "Body"),
        ];

        assert!(assemble_table(1, &fragments, &TableDetectionConfig::default()).is_none());
    }
}
