//! PDF rendering: lay the converted HTML out on A4 pages with `printpdf`.
//!
//! ## Approach
//!
//! The HTML produced by [`crate::pipeline::docx`] is well-formed XHTML, so it
//! is walked with the same pull parser used for the Word parts and flattened
//! into a list of [`FlowBlock`]s (headings, paragraphs, list items,
//! preformatted text, table rows). Each block is then word-wrapped against
//! the built-in Helvetica metrics and drawn line by line, starting a new
//! page whenever the next line would cross the bottom margin.
//!
//! ## Error reporting
//!
//! [`render_pdf`] never returns early with an error. Like a status flag, it
//! collects every problem in [`RenderReport::errors`] and keeps going where
//! it can. Callers decide whether a non-empty list is fatal.
//!
//! ## Limitations
//!
//! The built-in PDF fonts cover Latin-1 only: typographic quotes and dashes
//! are folded to ASCII and anything else outside Latin-1 becomes `?`.
//! Images are replaced by their alt text in brackets.

use once_cell::sync::Lazy;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::io::{BufWriter, Write};
use tracing::debug;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const INDENT_MM: f32 = 7.0;
const CELL_PADDING_MM: f32 = 1.5;
const PT_TO_MM: f32 = 25.4 / 72.0;
const LINE_SPACING: f32 = 1.35;

const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const CONTENT_TOP_MM: f32 = PAGE_HEIGHT_MM - MARGIN_MM;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Rendering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    /// Document title stored in the PDF metadata.
    pub title: String,
    /// Body text size in points; headings are scaled from it.
    pub base_font_size: f32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            base_font_size: 10.0,
        }
    }
}

/// Outcome of a render: how many pages were produced and what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub pages: usize,
    pub errors: Vec<String>,
}

impl RenderReport {
    /// True when the renderer raised its error flag.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Render `html` as a PDF document into `dest`.
pub fn render_pdf<W: Write>(html: &str, options: &PdfOptions, dest: &mut W) -> RenderReport {
    let mut report = RenderReport::default();

    let (blocks, parse_error) = parse_flow(html);
    if let Some(e) = parse_error {
        report.errors.push(e);
    }

    let (doc, page, layer) = PdfDocument::new(
        options.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let fonts = match Fonts::load(&doc) {
        Ok(fonts) => fonts,
        Err(e) => {
            report.errors.push(format!("font registration failed: {e:?}"));
            return report;
        }
    };

    {
        let mut writer = PageWriter {
            layer: doc.get_page(page).get_layer(layer),
            doc: &doc,
            fonts,
            y: CONTENT_TOP_MM,
            pages: 1,
        };
        for block in &blocks {
            writer.layout_block(block, options.base_font_size);
        }
        report.pages = writer.pages;
    }

    let mut out = BufWriter::new(dest);
    if let Err(e) = doc.save(&mut out) {
        report.errors.push(format!("PDF serialisation failed: {e:?}"));
    } else if let Err(e) = out.flush() {
        report.errors.push(format!("writing PDF failed: {e}"));
    }

    debug!(
        "Rendered {} blocks onto {} page(s), {} error(s)",
        blocks.len(),
        report.pages,
        report.errors.len()
    );
    report
}

// ── HTML → flow blocks ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Style {
    bold: bool,
    italic: bool,
    mono: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String, Style),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
enum FlowBlock {
    Heading { level: u8, pieces: Vec<Piece> },
    Paragraph { indent: usize, pieces: Vec<Piece> },
    ListItem { depth: usize, marker: String, pieces: Vec<Piece> },
    Preformatted { text: String },
    TableRow { cells: Vec<Vec<Piece>> },
}

impl FlowBlock {
    fn pieces_mut(&mut self) -> Option<&mut Vec<Piece>> {
        match self {
            FlowBlock::Heading { pieces, .. }
            | FlowBlock::Paragraph { pieces, .. }
            | FlowBlock::ListItem { pieces, .. } => Some(pieces),
            FlowBlock::Preformatted { .. } | FlowBlock::TableRow { .. } => None,
        }
    }

    fn has_text(&self) -> bool {
        match self {
            FlowBlock::Heading { pieces, .. }
            | FlowBlock::Paragraph { pieces, .. }
            | FlowBlock::ListItem { pieces, .. } => pieces_have_text(pieces),
            FlowBlock::Preformatted { text } => !text.trim().is_empty(),
            FlowBlock::TableRow { cells } => !cells.is_empty(),
        }
    }
}

fn pieces_have_text(pieces: &[Piece]) -> bool {
    pieces
        .iter()
        .any(|p| matches!(p, Piece::Text(t, _) if !t.trim().is_empty()))
}

struct ListState {
    ordered: bool,
    next: usize,
}

/// Turns the XHTML event stream into [`FlowBlock`]s.
#[derive(Default)]
struct FlowBuilder {
    blocks: Vec<FlowBlock>,
    current: Option<FlowBlock>,
    bold: usize,
    italic: usize,
    mono: usize,
    quote: usize,
    lists: Vec<ListState>,
    pre: Option<String>,
    table_depth: usize,
    row: Option<Vec<Vec<Piece>>>,
    cell: Option<Vec<Piece>>,
}

impl FlowBuilder {
    fn style(&self) -> Style {
        Style {
            bold: self.bold > 0,
            italic: self.italic > 0,
            mono: self.mono > 0,
        }
    }

    fn indent(&self) -> usize {
        self.quote + self.lists.len()
    }

    fn in_cell(&self) -> bool {
        self.cell.is_some()
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if block.has_text() {
                self.blocks.push(block);
            }
        }
    }

    fn start(&mut self, block: FlowBlock) {
        self.flush();
        self.current = Some(block);
    }

    fn push_piece(&mut self, piece: Piece) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push(piece);
            return;
        }
        let indent = self.indent();
        let block = self.current.get_or_insert_with(|| FlowBlock::Paragraph {
            indent,
            pieces: Vec::new(),
        });
        match block.pieces_mut() {
            Some(pieces) => pieces.push(piece),
            None => {
                self.start(FlowBlock::Paragraph {
                    indent,
                    pieces: vec![piece],
                });
            }
        }
    }

    fn open(&mut self, name: &str) {
        match name {
            "p" | "div" => {
                if self.in_cell() {
                    return;
                }
                // <li><p>..</p></li>: the first paragraph is the item itself.
                if let Some(FlowBlock::ListItem { pieces, .. }) = &self.current {
                    if pieces.is_empty() {
                        return;
                    }
                }
                let indent = self.indent();
                self.start(FlowBlock::Paragraph {
                    indent,
                    pieces: Vec::new(),
                });
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.bold += 1;
                if !self.in_cell() {
                    let level = name[1..].parse().unwrap_or(1);
                    self.start(FlowBlock::Heading {
                        level,
                        pieces: Vec::new(),
                    });
                }
            }
            "ul" | "ol" => {
                if !self.in_cell() {
                    self.flush();
                }
                self.lists.push(ListState {
                    ordered: name == "ol",
                    next: 1,
                });
            }
            "li" => {
                let depth = self.lists.len().max(1);
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let marker = format!("{}.", list.next);
                        list.next += 1;
                        marker
                    }
                    _ => "\u{b7}".to_string(),
                };
                if self.in_cell() {
                    let style = self.style();
                    self.push_piece(Piece::Text(format!("{marker} "), style));
                } else {
                    self.start(FlowBlock::ListItem {
                        depth,
                        marker,
                        pieces: Vec::new(),
                    });
                }
            }
            "table" => {
                if self.table_depth == 0 {
                    self.flush();
                }
                self.table_depth += 1;
            }
            "tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            "td" | "th" => {
                if self.table_depth == 1 {
                    self.cell = Some(Vec::new());
                }
                if name == "th" {
                    self.bold += 1;
                }
            }
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "code" | "tt" | "kbd" | "samp" => self.mono += 1,
            "pre" => {
                self.flush();
                self.mono += 1;
                self.pre = Some(String::new());
            }
            "blockquote" => {
                self.flush();
                self.quote += 1;
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "div" => {
                if self.in_cell() {
                    self.push_piece(Piece::Break);
                } else if !matches!(self.current, Some(FlowBlock::ListItem { .. })) {
                    self.flush();
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.bold = self.bold.saturating_sub(1);
                if !self.in_cell() {
                    self.flush();
                }
            }
            "li" => {
                if !self.in_cell() {
                    self.flush();
                }
            }
            "ul" | "ol" => {
                if !self.in_cell() {
                    self.flush();
                }
                self.lists.pop();
            }
            "td" | "th" => {
                if name == "th" {
                    self.bold = self.bold.saturating_sub(1);
                }
                if self.table_depth == 1 {
                    if let (Some(row), Some(mut cell)) = (self.row.as_mut(), self.cell.take()) {
                        while matches!(cell.last(), Some(Piece::Break)) {
                            cell.pop();
                        }
                        row.push(cell);
                    }
                } else {
                    self.push_piece(Piece::Text(" ".into(), Style::default()));
                }
            }
            "tr" => {
                if self.table_depth == 1 {
                    if let Some(cells) = self.row.take() {
                        if !cells.is_empty() {
                            self.blocks.push(FlowBlock::TableRow { cells });
                        }
                    }
                } else {
                    self.push_piece(Piece::Break);
                }
            }
            "table" => self.table_depth = self.table_depth.saturating_sub(1),
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            "code" | "tt" | "kbd" | "samp" => self.mono = self.mono.saturating_sub(1),
            "pre" => {
                self.mono = self.mono.saturating_sub(1);
                if let Some(text) = self.pre.take() {
                    let block = FlowBlock::Preformatted { text };
                    if block.has_text() {
                        self.blocks.push(block);
                    }
                }
            }
            "blockquote" => {
                self.flush();
                self.quote = self.quote.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn empty(&mut self, name: &str, e: &BytesStart<'_>) {
        match name {
            "br" => match self.pre.as_mut() {
                Some(pre) => pre.push('\n'),
                None => self.push_piece(Piece::Break),
            },
            "img" => {
                let alt = crate::pipeline::docx::attribute(e, b"alt").unwrap_or_default();
                if !alt.trim().is_empty() {
                    let style = self.style();
                    self.push_piece(Piece::Text(format!("[{}]", alt.trim()), style));
                }
            }
            "hr" => self.flush(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(pre) = self.pre.as_mut() {
            pre.push_str(text);
            return;
        }
        if text.trim().is_empty() && self.current.is_none() && !self.in_cell() {
            return;
        }
        let collapsed = RE_WHITESPACE.replace_all(text, " ").into_owned();
        let style = self.style();
        self.push_piece(Piece::Text(collapsed, style));
    }

    fn finish(mut self) -> Vec<FlowBlock> {
        self.flush();
        if let Some(text) = self.pre.take() {
            self.blocks.push(FlowBlock::Preformatted { text });
        }
        if let Some(cells) = self.row.take() {
            if !cells.is_empty() {
                self.blocks.push(FlowBlock::TableRow { cells });
            }
        }
        self.blocks
    }
}

/// Parse an HTML fragment into flow blocks. Markup errors stop the walk;
/// whatever was read before the error is still returned.
fn parse_flow(html: &str) -> (Vec<FlowBlock>, Option<String>) {
    let wrapped = format!("<root>{html}</root>");
    let mut reader = Reader::from_str(&wrapped);
    let mut builder = FlowBuilder::default();
    let mut error = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = lower_name(&e);
                if matches!(name.as_str(), "head" | "style" | "script" | "title") {
                    if let Err(err) = reader.read_to_end(e.name()) {
                        error = Some(format!("markup error: {err}"));
                        break;
                    }
                    continue;
                }
                builder.open(&name);
            }
            Ok(Event::Empty(e)) => {
                let name = lower_name(&e);
                builder.empty(&name, &e);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                builder.close(&name);
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    // Unknown entities: keep the raw text rather than fail.
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                builder.text(&text);
            }
            Ok(Event::CData(c)) => builder.text(&String::from_utf8_lossy(&c)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                error = Some(format!("markup error: {e}"));
                break;
            }
        }
    }

    (builder.finish(), error)
}

fn lower_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

// ── Text measurement and wrapping ────────────────────────────────────────────

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

fn char_width_units(c: char, style: Style) -> f32 {
    if style.mono {
        return 600.0;
    }
    let base = match c as u32 {
        code @ 32..=126 => f32::from(HELVETICA_WIDTHS[(code - 32) as usize]),
        _ => 556.0,
    };
    if style.bold {
        base * 1.06
    } else {
        base
    }
}

/// Width of `text` in millimetres at `size` points.
fn text_width(text: &str, style: Style, size: f32) -> f32 {
    let units: f32 = text.chars().map(|c| char_width_units(c, style)).sum();
    units / 1000.0 * size * PT_TO_MM
}

fn line_height(size: f32) -> f32 {
    size * LINE_SPACING * PT_TO_MM
}

/// Fold text into what the built-in (Latin-1) fonts can show.
fn pdf_safe_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' => out.push('\u{b7}'),
            '\u{2191}' => out.push('^'),
            '\u{a0}' => out.push(' '),
            c if (c as u32) < 0x20 => out.push(' '),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    style: Style,
    space_before: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(Word),
    Break,
}

fn tokenize(pieces: &[Piece]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_space = false;
    for piece in pieces {
        match piece {
            Piece::Break => {
                tokens.push(Token::Break);
                pending_space = false;
            }
            Piece::Text(text, style) => {
                let text = pdf_safe_text(text);
                if text.starts_with(char::is_whitespace) {
                    pending_space = true;
                }
                for (i, word) in text.split_whitespace().enumerate() {
                    tokens.push(Token::Word(Word {
                        text: word.to_string(),
                        style: *style,
                        space_before: pending_space || i > 0,
                    }));
                    pending_space = false;
                }
                if text.ends_with(char::is_whitespace) {
                    pending_space = true;
                }
            }
        }
    }
    tokens
}

#[derive(Debug, Clone, PartialEq)]
struct Placed {
    x: f32,
    text: String,
    style: Style,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    items: Vec<Placed>,
    width: f32,
}

/// Break a word that is wider than the line into line-sized chunks.
fn split_to_width(text: &str, style: Style, size: f32, max_width: f32) -> Vec<String> {
    if text_width(text, style, size) <= max_width {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = text_width(c.encode_utf8(&mut [0; 4]), style, size);
        if width + w > max_width && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(c);
        width += w;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Greedy line filling. `force_bold` renders every word bold (headings).
fn wrap(tokens: &[Token], max_width: f32, size: f32, force_bold: bool) -> Vec<Line> {
    let space = text_width(" ", Style::default(), size);
    let mut lines = Vec::new();
    let mut line = Line::default();

    for token in tokens {
        match token {
            Token::Break => lines.push(std::mem::take(&mut line)),
            Token::Word(word) => {
                let style = Style {
                    bold: word.style.bold || force_bold,
                    ..word.style
                };
                for (i, chunk) in split_to_width(&word.text, style, size, max_width)
                    .into_iter()
                    .enumerate()
                {
                    let width = text_width(&chunk, style, size);
                    let mut gap = if i == 0 && word.space_before && !line.items.is_empty() {
                        space
                    } else {
                        0.0
                    };
                    if !line.items.is_empty() && line.width + gap + width > max_width {
                        lines.push(std::mem::take(&mut line));
                        gap = 0.0;
                    }
                    line.items.push(Placed {
                        x: line.width + gap,
                        text: chunk,
                        style,
                    });
                    line.width += gap + width;
                }
            }
        }
    }
    if !line.items.is_empty() {
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.items.is_empty()) {
        lines.pop();
    }
    lines
}

fn heading_scale(level: u8) -> f32 {
    match level {
        1 => 2.0,
        2 => 1.6,
        3 => 1.3,
        4 => 1.15,
        5 => 1.0,
        _ => 0.9,
    }
}

// ── Drawing ──────────────────────────────────────────────────────────────────

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
    mono: IndirectFontRef,
    mono_bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, printpdf::Error> {
        Ok(Self {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
            bold_italic: doc.add_builtin_font(BuiltinFont::HelveticaBoldOblique)?,
            mono: doc.add_builtin_font(BuiltinFont::Courier)?,
            mono_bold: doc.add_builtin_font(BuiltinFont::CourierBold)?,
        })
    }

    fn get(&self, style: Style) -> &IndirectFontRef {
        match (style.mono, style.bold, style.italic) {
            (true, true, _) => &self.mono_bold,
            (true, false, _) => &self.mono,
            (false, true, true) => &self.bold_italic,
            (false, true, false) => &self.bold,
            (false, false, true) => &self.italic,
            (false, false, false) => &self.regular,
        }
    }
}

struct PageWriter<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    /// Top of the next line, in mm from the bottom edge.
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = CONTENT_TOP_MM;
        self.pages += 1;
    }

    /// Start a new page unless `height` still fits. A fresh page always
    /// accepts content, even content taller than the page.
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN_MM && self.y < CONTENT_TOP_MM {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn place_line(&mut self, line: &Line, x0: f32, size: f32) {
        let baseline = self.y - size * PT_TO_MM;
        for item in &line.items {
            self.layer.use_text(
                item.text.as_str(),
                size,
                Mm(x0 + item.x),
                Mm(baseline),
                self.fonts.get(item.style),
            );
        }
        self.y -= line_height(size);
    }

    fn draw_lines(&mut self, lines: &[Line], x0: f32, size: f32) {
        for line in lines {
            self.ensure_room(line_height(size));
            self.place_line(line, x0, size);
        }
    }

    fn layout_block(&mut self, block: &FlowBlock, base: f32) {
        match block {
            FlowBlock::Heading { level, pieces } => {
                let size = base * heading_scale(*level);
                let lines = wrap(&tokenize(pieces), CONTENT_WIDTH_MM, size, true);
                self.gap(size * PT_TO_MM * 0.5);
                // Keep a heading together with at least one following line.
                self.ensure_room(line_height(size) + line_height(base));
                self.draw_lines(&lines, MARGIN_MM, size);
                self.gap(size * PT_TO_MM * 0.3);
            }
            FlowBlock::Paragraph { indent, pieces } => {
                let inset = *indent as f32 * INDENT_MM;
                let lines = wrap(&tokenize(pieces), CONTENT_WIDTH_MM - inset, base, false);
                self.draw_lines(&lines, MARGIN_MM + inset, base);
                self.gap(base * PT_TO_MM * 0.6);
            }
            FlowBlock::ListItem {
                depth,
                marker,
                pieces,
            } => {
                let inset = *depth as f32 * INDENT_MM;
                let mut lines = wrap(&tokenize(pieces), CONTENT_WIDTH_MM - inset, base, false);
                if let Some(first) = lines.first_mut() {
                    let style = Style::default();
                    let marker = pdf_safe_text(marker);
                    let x = -(text_width(&marker, style, base) + 1.5);
                    first.items.insert(
                        0,
                        Placed {
                            x,
                            text: marker,
                            style,
                        },
                    );
                }
                self.draw_lines(&lines, MARGIN_MM + inset, base);
                self.gap(base * PT_TO_MM * 0.3);
            }
            FlowBlock::Preformatted { text } => {
                let style = Style {
                    mono: true,
                    ..Style::default()
                };
                let size = base * 0.9;
                let lines: Vec<Line> = text
                    .trim_matches('\n')
                    .lines()
                    .flat_map(|raw| {
                        let raw = pdf_safe_text(&raw.replace('\t', "    "));
                        split_to_width(&raw, style, size, CONTENT_WIDTH_MM)
                    })
                    .map(|chunk| Line {
                        width: text_width(&chunk, style, size),
                        items: vec![Placed {
                            x: 0.0,
                            text: chunk,
                            style,
                        }],
                    })
                    .collect();
                self.draw_lines(&lines, MARGIN_MM, size);
                self.gap(base * PT_TO_MM * 0.6);
            }
            FlowBlock::TableRow { cells } => {
                let columns = cells.len().max(1);
                let column_width = CONTENT_WIDTH_MM / columns as f32;
                let cell_lines: Vec<Vec<Line>> = cells
                    .iter()
                    .map(|cell| {
                        wrap(
                            &tokenize(cell),
                            column_width - 2.0 * CELL_PADDING_MM,
                            base,
                            false,
                        )
                    })
                    .collect();
                let rows = cell_lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
                let height = rows as f32 * line_height(base) + CELL_PADDING_MM;

                self.ensure_room(height);
                let top = self.y;
                for (i, lines) in cell_lines.iter().enumerate() {
                    self.y = top;
                    let x0 = MARGIN_MM + i as f32 * column_width + CELL_PADDING_MM;
                    for line in lines {
                        self.place_line(line, x0, base);
                    }
                }
                self.y = top - height;
            }
        }
    }
}
