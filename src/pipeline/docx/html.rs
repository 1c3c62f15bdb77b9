//! Model → HTML rendering.
//!
//! The output is an XHTML fragment: every element is closed, void elements
//! are self-closed and all text goes through [`escape_text`]. Lists are kept
//! on a stack so consecutive numbered paragraphs nest into `<ol>`/`<ul>`
//! trees; notes referenced from the body are appended as a final `<ol>`.

use super::model::{
    Block, Cell, Hyperlink, Inline, NoteKind, Paragraph, Row, RunContent, RunProps, Table,
    VerticalAlign,
};
use super::parse::{Numbering, Relationship};
use crate::pipeline::markup::{escape_attr, escape_text};
use base64::Engine as _;
use std::collections::{HashMap, HashSet};

/// An embedded image part, ready to be inlined.
pub(crate) struct ImagePart {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Everything the renderer needs besides the body itself.
#[derive(Default)]
pub(crate) struct RenderContext {
    pub styles: HashMap<String, String>,
    pub numbering: Numbering,
    pub rels: HashMap<String, Relationship>,
    /// Image parts keyed by relationship id.
    pub images: HashMap<String, ImagePart>,
    pub notes: HashMap<(NoteKind, String), Vec<Block>>,
    pub embed_images: bool,
}

#[derive(Debug, Clone, Copy)]
struct ListFrame {
    level: usize,
    ordered: bool,
}

/// Inline output before link grouping.
enum Segment {
    Text {
        href: Option<String>,
        props: RunProps,
        html: String,
    },
    Anchor(String),
}

pub(crate) struct Renderer<'a> {
    ctx: &'a RenderContext,
    out: String,
    lists: Vec<ListFrame>,
    /// Referenced notes in first-reference order; each appears once.
    note_refs: Vec<(NoteKind, String)>,
    /// Note number and how many times it has been referenced so far.
    note_numbers: HashMap<(NoteKind, String), (usize, usize)>,
    warnings: Vec<String>,
    seen_warnings: HashSet<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(ctx: &'a RenderContext) -> Self {
        Self {
            ctx,
            out: String::new(),
            lists: Vec::new(),
            note_refs: Vec::new(),
            note_numbers: HashMap::new(),
            warnings: Vec::new(),
            seen_warnings: HashSet::new(),
        }
    }

    /// Render the document body plus its notes. Returns `(html, warnings)`.
    pub fn render_document(mut self, body: &[Block]) -> (String, Vec<String>) {
        self.render_blocks(body);
        self.close_lists();
        self.render_notes();
        (self.out, self.warnings)
    }

    fn warn(&mut self, message: String) {
        if self.seen_warnings.insert(message.clone()) {
            self.warnings.push(message);
        }
    }

    fn render_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Paragraph(p) => self.render_paragraph(p),
                Block::Table(t) => {
                    self.close_lists();
                    self.render_table(t);
                }
            }
        }
    }

    // ── Paragraphs ───────────────────────────────────────────────────────────

    fn render_paragraph(&mut self, paragraph: &Paragraph) {
        let inner = self.render_inlines(&paragraph.children);
        if inner.is_empty() {
            return;
        }

        let tag = self.paragraph_tag(paragraph.style_id.as_deref());
        match (&paragraph.numbering, tag) {
            (Some(numbering), "p") => {
                let ordered = self
                    .ctx
                    .numbering
                    .is_ordered(&numbering.num_id, numbering.level);
                self.open_list_item(numbering.level, ordered);
                self.out.push_str(&inner);
            }
            _ => {
                self.close_lists();
                self.out.push_str(&format!("<{tag}>{inner}</{tag}>"));
            }
        }
    }

    /// Heading styles map to `h1`..`h6`; everything else is a paragraph.
    fn paragraph_tag(&mut self, style_id: Option<&str>) -> &'static str {
        const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

        let ctx = self.ctx;
        let Some(id) = style_id else { return "p" };
        let name = ctx.styles.get(id).map(String::as_str).unwrap_or(id);

        if let Some(level) = heading_level(name) {
            return HEADINGS[level - 1];
        }
        if !is_plain_style(name) {
            self.warn(format!(
                "Unrecognised paragraph style: '{name}' (Style ID: {id})"
            ));
        }
        "p"
    }

    // ── Lists ────────────────────────────────────────────────────────────────

    fn open_list_item(&mut self, level: usize, ordered: bool) {
        while self.lists.last().is_some_and(|f| f.level > level) {
            self.pop_list();
        }
        match self.lists.last().copied() {
            Some(top) if top.level == level && top.ordered == ordered => {
                self.out.push_str("</li><li>");
            }
            Some(top) if top.level == level => {
                self.pop_list();
                self.push_list(level, ordered);
            }
            _ => self.push_list(level, ordered),
        }
    }

    fn push_list(&mut self, level: usize, ordered: bool) {
        self.out
            .push_str(if ordered { "<ol><li>" } else { "<ul><li>" });
        self.lists.push(ListFrame { level, ordered });
    }

    fn pop_list(&mut self) {
        if let Some(frame) = self.lists.pop() {
            self.out
                .push_str(if frame.ordered { "</li></ol>" } else { "</li></ul>" });
        }
    }

    fn close_lists(&mut self) {
        while !self.lists.is_empty() {
            self.pop_list();
        }
    }

    // ── Tables ───────────────────────────────────────────────────────────────

    fn render_table(&mut self, table: &Table) {
        let header_rows = table.rows.iter().take_while(|r| r.is_header).count();
        self.out.push_str("<table>");
        if header_rows > 0 {
            self.out.push_str("<thead>");
            for row in &table.rows[..header_rows] {
                self.render_row(row, "th");
            }
            self.out.push_str("</thead>");
            if header_rows < table.rows.len() {
                self.out.push_str("<tbody>");
                for row in &table.rows[header_rows..] {
                    self.render_row(row, "td");
                }
                self.out.push_str("</tbody>");
            }
        } else {
            for row in &table.rows {
                self.render_row(row, "td");
            }
        }
        self.out.push_str("</table>");
    }

    fn render_row(&mut self, row: &Row, cell_tag: &str) {
        self.out.push_str("<tr>");
        for cell in &row.cells {
            self.render_cell(cell, cell_tag);
        }
        self.out.push_str("</tr>");
    }

    fn render_cell(&mut self, cell: &Cell, tag: &str) {
        self.out.push('<');
        self.out.push_str(tag);
        if cell.colspan > 1 {
            self.out.push_str(&format!(" colspan=\"{}\"", cell.colspan));
        }
        if cell.rowspan > 1 {
            self.out.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
        }
        self.out.push('>');

        // Lists inside a cell never continue lists outside it.
        let outer_lists = std::mem::take(&mut self.lists);
        self.render_blocks(&cell.blocks);
        self.close_lists();
        self.lists = outer_lists;

        self.out.push_str(&format!("</{tag}>"));
    }

    // ── Inline content ───────────────────────────────────────────────────────

    fn render_inlines(&mut self, children: &[Inline]) -> String {
        let mut segments: Vec<Segment> = Vec::new();
        for child in children {
            match child {
                Inline::Bookmark(name) => {
                    segments.push(Segment::Anchor(format!(
                        "<a id=\"{}\"></a>",
                        escape_attr(name)
                    )));
                }
                Inline::Run(run) => {
                    let html = self.render_run_content(&run.content);
                    if html.is_empty() {
                        continue;
                    }
                    let href = run.link.as_ref().and_then(|l| self.resolve_link(l));
                    match segments.last_mut() {
                        Some(Segment::Text {
                            href: last_href,
                            props,
                            html: last_html,
                        }) if *last_href == href && *props == run.props => {
                            last_html.push_str(&html);
                        }
                        _ => segments.push(Segment::Text {
                            href,
                            props: run.props,
                            html,
                        }),
                    }
                }
            }
        }

        let mut out = String::new();
        let mut open_href: Option<&str> = None;
        for segment in &segments {
            match segment {
                Segment::Anchor(anchor) => {
                    if open_href.take().is_some() {
                        out.push_str("</a>");
                    }
                    out.push_str(anchor);
                }
                Segment::Text { href, props, html } => {
                    if open_href != href.as_deref() {
                        if open_href.is_some() {
                            out.push_str("</a>");
                        }
                        if let Some(h) = href {
                            out.push_str(&format!("<a href=\"{}\">", escape_attr(h)));
                        }
                        open_href = href.as_deref();
                    }
                    out.push_str(&wrap_formatting(props, html));
                }
            }
        }
        if open_href.is_some() {
            out.push_str("</a>");
        }

        // A paragraph made only of bookmarks has no visible content.
        if segments.iter().all(|s| matches!(s, Segment::Anchor(_))) {
            return String::new();
        }
        out
    }

    fn resolve_link(&mut self, link: &Hyperlink) -> Option<String> {
        let ctx = self.ctx;
        let base = match &link.rel_id {
            Some(id) => match ctx.rels.get(id) {
                Some(rel) => Some(rel.target.clone()),
                None => {
                    self.warn(format!("Hyperlink relationship {id} not found"));
                    None
                }
            },
            None => None,
        };
        match (base, &link.anchor) {
            (Some(url), Some(anchor)) => Some(format!("{url}#{anchor}")),
            (Some(url), None) => Some(url),
            (None, Some(anchor)) => Some(format!("#{anchor}")),
            (None, None) => None,
        }
    }

    fn render_run_content(&mut self, content: &[RunContent]) -> String {
        let ctx = self.ctx;
        let mut html = String::new();
        for item in content {
            match item {
                RunContent::Text(text) => html.push_str(&escape_text(text)),
                RunContent::Tab => html.push('\t'),
                RunContent::Break => html.push_str("<br />"),
                RunContent::Image(image) => {
                    if !ctx.embed_images {
                        continue;
                    }
                    match ctx.images.get(&image.rel_id) {
                        Some(part) => {
                            let data =
                                base64::engine::general_purpose::STANDARD.encode(&part.bytes);
                            html.push_str(&format!("<img src=\"data:{};base64,{data}\"", part.mime));
                            if let Some(alt) = &image.alt {
                                html.push_str(&format!(" alt=\"{}\"", escape_attr(alt)));
                            }
                            html.push_str(" />");
                        }
                        None => self.warn(format!(
                            "Image relationship {} could not be resolved; image skipped",
                            image.rel_id
                        )),
                    }
                }
                RunContent::NoteReference(kind, id) => {
                    let (number, seen) = self.note_reference(*kind, id);
                    let prefix = kind.id_prefix();
                    let id = escape_attr(id);
                    let ref_id = match seen {
                        1 => format!("{prefix}-ref-{id}"),
                        n => format!("{prefix}-ref-{id}-{n}"),
                    };
                    html.push_str(&format!(
                        "<sup><a href=\"#{prefix}-{id}\" id=\"{ref_id}\">[{number}]</a></sup>"
                    ));
                }
            }
        }
        html
    }

    // ── Notes ────────────────────────────────────────────────────────────────

    /// Number a note on first reference. Returns `(number, occurrence)`,
    /// where `occurrence` counts this reference (1 for the first).
    fn note_reference(&mut self, kind: NoteKind, id: &str) -> (usize, usize) {
        let key = (kind, id.to_string());
        if let Some((number, seen)) = self.note_numbers.get_mut(&key) {
            *seen += 1;
            return (*number, *seen);
        }
        self.note_refs.push(key.clone());
        let number = self.note_refs.len();
        self.note_numbers.insert(key, (number, 1));
        (number, 1)
    }

    fn render_notes(&mut self) {
        if self.note_refs.is_empty() {
            return;
        }
        let ctx = self.ctx;
        self.out.push_str("<ol>");
        // Indexed loop: a note may reference notes not numbered yet. Each
        // note is queued once, so this ends even when notes reference
        // each other.
        let mut i = 0;
        while i < self.note_refs.len() {
            let (kind, id) = self.note_refs[i].clone();
            i += 1;

            let saved = std::mem::take(&mut self.out);
            match ctx.notes.get(&(kind, id.clone())) {
                Some(blocks) => self.render_blocks(blocks),
                None => self.warn(format!("{} {id} not found", kind.id_prefix())),
            }
            self.close_lists();
            let mut body = std::mem::replace(&mut self.out, saved);

            let prefix = kind.id_prefix();
            let id = escape_attr(&id);
            let back_link = format!("<a href=\"#{prefix}-ref-{id}\">↑</a>");
            if body.ends_with("</p>") {
                body.insert_str(body.len() - "</p>".len(), &format!(" {back_link}"));
            } else {
                body.push_str(&format!("<p>{back_link}</p>"));
            }
            self.out
                .push_str(&format!("<li id=\"{prefix}-{id}\">{body}</li>"));
        }
        self.out.push_str("</ol>");
    }
}

fn wrap_formatting(props: &RunProps, html: &str) -> String {
    let mut html = html.to_string();
    match props.vertical {
        VerticalAlign::Superscript => html = format!("<sup>{html}</sup>"),
        VerticalAlign::Subscript => html = format!("<sub>{html}</sub>"),
        VerticalAlign::Baseline => {}
    }
    if props.strike {
        html = format!("<s>{html}</s>");
    }
    if props.italic {
        html = format!("<em>{html}</em>");
    }
    if props.bold {
        html = format!("<strong>{html}</strong>");
    }
    html
}

/// `heading 1`..`heading 6` by name, or `Heading1`..`Heading6` by id.
fn heading_level(style: &str) -> Option<usize> {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let level: usize = compact.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Styles that render as a plain `<p>` without a warning.
fn is_plain_style(style: &str) -> bool {
    matches!(
        style.to_ascii_lowercase().as_str(),
        "normal"
            | "list paragraph"
            | "listparagraph"
            | "footnote text"
            | "footnotetext"
            | "endnote text"
            | "endnotetext"
            | "annotation text"
            | "comment text"
    )
}
