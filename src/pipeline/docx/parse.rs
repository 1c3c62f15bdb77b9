//! Streaming readers for the WordprocessingML parts of a package.
//!
//! Every reader is a `quick-xml` pull loop matching on local names, so the
//! `w:`/`r:`/`a:` prefixes a producer picked do not matter. Elements we do
//! not understand are descended into transparently; elements whose content
//! must not appear in the output are skipped wholesale.

use super::model::{
    Block, Cell, Hyperlink, ImageRef, Inline, Note, NoteKind, NumberingRef, Paragraph, Row, Run,
    RunContent, RunProps, Table, VMerge, VerticalAlign,
};
use crate::error::ConvertError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

type ParseResult<T> = Result<T, ConvertError>;

/// Deepest table-in-table nesting accepted before the part is rejected.
pub(crate) const MAX_TABLE_DEPTH: usize = 32;

/// Elements whose whole subtree is ignored.
const SKIPPED: &[&[u8]] = &[
    b"sectPr",
    b"del",
    b"moveFrom",
    b"instrText",
    b"delInstrText",
    b"pict",
    b"Fallback",
    b"object",
    b"txbxContent",
    b"commentRangeStart",
    b"customXmlPr",
];

fn xml_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::malformed(format!("XML error: {e}"))
}

/// Value of the attribute with local name `name`, unescaped.
pub(crate) fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// On/off properties like `<w:b/>` or `<w:b w:val="false"/>`.
fn toggle(e: &BytesStart<'_>) -> bool {
    match attr(e, b"val") {
        None => true,
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "none"),
    }
}

// ── Body ─────────────────────────────────────────────────────────────────────

struct BodyParser<'a> {
    reader: Reader<&'a [u8]>,
    table_depth: usize,
}

impl<'a> BodyParser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
            table_depth: 0,
        }
    }

    fn next(&mut self) -> ParseResult<Event<'a>> {
        self.reader.read_event().map_err(xml_err)
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> ParseResult<()> {
        self.reader
            .read_to_end(start.name())
            .map(|_| ())
            .map_err(xml_err)
    }

    /// Read paragraphs and tables until the end tag `end`.
    fn read_blocks(&mut self, end: &[u8]) -> ParseResult<Vec<Block>> {
        let mut blocks = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) => self.read_block_start(&e, &mut blocks)?,
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(blocks)
    }

    fn read_block_start(&mut self, e: &BytesStart<'a>, blocks: &mut Vec<Block>) -> ParseResult<()> {
        match e.local_name().as_ref() {
            b"p" => blocks.push(Block::Paragraph(self.read_paragraph()?)),
            b"tbl" => blocks.push(Block::Table(self.read_table()?)),
            name if SKIPPED.contains(&name) => self.skip(e)?,
            _ => {}
        }
        Ok(())
    }

    fn read_paragraph(&mut self) -> ParseResult<Paragraph> {
        let mut paragraph = Paragraph::default();
        // Hyperlinks can nest in malformed producers; the innermost wins.
        let mut links: Vec<Hyperlink> = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"pPr" => self.read_paragraph_props(&mut paragraph)?,
                    b"r" => {
                        let run = self.read_run(links.last().cloned())?;
                        paragraph.children.push(Inline::Run(run));
                    }
                    b"hyperlink" => links.push(Hyperlink {
                        rel_id: attr(&e, b"id"),
                        anchor: attr(&e, b"anchor"),
                    }),
                    b"bookmarkStart" => push_bookmark(&e, &mut paragraph),
                    name if SKIPPED.contains(&name) => self.skip(&e)?,
                    _ => {}
                },
                Event::Empty(e) if e.local_name().as_ref() == b"bookmarkStart" => {
                    push_bookmark(&e, &mut paragraph)
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"p" => break,
                    b"hyperlink" => {
                        links.pop();
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(paragraph)
    }

    fn read_paragraph_props(&mut self, paragraph: &mut Paragraph) -> ParseResult<()> {
        let mut num_id: Option<String> = None;
        let mut level = 0;
        loop {
            match self.next()? {
                Event::Start(e)
                    if matches!(e.local_name().as_ref(), b"rPr" | b"sectPr" | b"pPrChange") =>
                {
                    self.skip(&e)?
                }
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"pStyle" => paragraph.style_id = attr(&e, b"val"),
                    b"ilvl" => {
                        level = attr(&e, b"val")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0)
                    }
                    b"numId" => num_id = attr(&e, b"val"),
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"pPr" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        // numId 0 explicitly removes numbering inherited from the style.
        paragraph.numbering = num_id
            .filter(|id| id != "0")
            .map(|num_id| NumberingRef { num_id, level });
        Ok(())
    }

    fn read_run(&mut self, link: Option<Hyperlink>) -> ParseResult<Run> {
        let mut run = Run {
            link,
            ..Run::default()
        };
        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"rPr" => run.props = self.read_run_props()?,
                    b"t" => {
                        let text = self.read_text(b"t")?;
                        if !text.is_empty() {
                            run.content.push(RunContent::Text(text));
                        }
                    }
                    b"drawing" => {
                        if let Some(image) = self.read_drawing()? {
                            run.content.push(RunContent::Image(image));
                        }
                    }
                    // Deleted text only ever appears inside w:del, but some
                    // producers emit it loose.
                    b"delText" => self.skip(&e)?,
                    name if SKIPPED.contains(&name) => self.skip(&e)?,
                    _ => {}
                },
                Event::Empty(e) => {
                    if let Some(content) = empty_run_content(&e) {
                        run.content.push(content);
                    }
                }
                Event::End(e) if e.local_name().as_ref() == b"r" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(run)
    }

    fn read_run_props(&mut self) -> ParseResult<RunProps> {
        let mut props = RunProps::default();
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"rPrChange" => self.skip(&e)?,
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"b" => props.bold = toggle(&e),
                    b"i" => props.italic = toggle(&e),
                    b"strike" | b"dstrike" => props.strike = props.strike || toggle(&e),
                    b"vertAlign" => {
                        props.vertical = match attr(&e, b"val").as_deref() {
                            Some("superscript") => VerticalAlign::Superscript,
                            Some("subscript") => VerticalAlign::Subscript,
                            _ => VerticalAlign::Baseline,
                        }
                    }
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"rPr" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(props)
    }

    fn read_text(&mut self, end: &[u8]) -> ParseResult<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape().map_err(xml_err)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(text)
    }

    fn read_drawing(&mut self) -> ParseResult<Option<ImageRef>> {
        let mut alt = None;
        let mut rel_id = None;
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"txbxContent" => self.skip(&e)?,
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"docPr" => {
                        alt = attr(&e, b"descr")
                            .filter(|s| !s.trim().is_empty())
                            .or_else(|| attr(&e, b"title").filter(|s| !s.trim().is_empty()))
                    }
                    b"blip" => rel_id = attr(&e, b"embed"),
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"drawing" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(rel_id.map(|rel_id| ImageRef { rel_id, alt }))
    }

    fn read_table(&mut self) -> ParseResult<Table> {
        if self.table_depth >= MAX_TABLE_DEPTH {
            return Err(ConvertError::malformed(format!(
                "tables nested more than {MAX_TABLE_DEPTH} levels deep"
            )));
        }
        self.table_depth += 1;
        let table = self.read_table_rows();
        self.table_depth -= 1;
        table
    }

    fn read_table_rows(&mut self) -> ParseResult<Table> {
        let mut rows = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tr" => rows.push(self.read_row()?),
                    b"tblPr" | b"tblGrid" => self.skip(&e)?,
                    name if SKIPPED.contains(&name) => self.skip(&e)?,
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"tbl" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Table::from_rows(rows))
    }

    fn read_row(&mut self) -> ParseResult<Row> {
        let mut row = Row::default();
        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"trPr" => row.is_header = self.read_row_props()?,
                    b"tc" => row.cells.push(self.read_cell()?),
                    b"tblPrEx" => self.skip(&e)?,
                    name if SKIPPED.contains(&name) => self.skip(&e)?,
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"tr" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(row)
    }

    fn read_row_props(&mut self) -> ParseResult<bool> {
        let mut header = false;
        loop {
            match self.next()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"tblHeader" => {
                    header = toggle(&e)
                }
                Event::End(e) if e.local_name().as_ref() == b"trPr" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(header)
    }

    fn read_cell(&mut self) -> ParseResult<Cell> {
        let mut cell = Cell::default();
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"tcPr" => {
                    self.read_cell_props(&mut cell)?
                }
                Event::Start(e) => self.read_block_start(&e, &mut cell.blocks)?,
                Event::End(e) if e.local_name().as_ref() == b"tc" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(cell)
    }

    fn read_cell_props(&mut self, cell: &mut Cell) -> ParseResult<()> {
        loop {
            match self.next()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"gridSpan" => {
                        cell.colspan = attr(&e, b"val")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(1usize)
                            .max(1)
                    }
                    b"vMerge" => {
                        cell.vmerge = match attr(&e, b"val").as_deref() {
                            Some("restart") => VMerge::Restart,
                            _ => VMerge::Continue,
                        }
                    }
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"tcPr" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }
}

fn push_bookmark(e: &BytesStart<'_>, paragraph: &mut Paragraph) {
    if let Some(name) = attr(e, b"name") {
        if name != "_GoBack" {
            paragraph.children.push(Inline::Bookmark(name));
        }
    }
}

/// Content carried by self-closing run children.
fn empty_run_content(e: &BytesStart<'_>) -> Option<RunContent> {
    match e.local_name().as_ref() {
        b"tab" => Some(RunContent::Tab),
        b"cr" => Some(RunContent::Break),
        b"br" => match attr(e, b"type").as_deref() {
            None | Some("textWrapping") => Some(RunContent::Break),
            // Page and column breaks have no HTML counterpart.
            _ => None,
        },
        b"noBreakHyphen" => Some(RunContent::Text("-".to_string())),
        b"footnoteReference" => {
            attr(e, b"id").map(|id| RunContent::NoteReference(NoteKind::Footnote, id))
        }
        b"endnoteReference" => {
            attr(e, b"id").map(|id| RunContent::NoteReference(NoteKind::Endnote, id))
        }
        _ => None,
    }
}

/// Parse `word/document.xml` into its body blocks.
pub(crate) fn parse_document(xml: &str) -> ParseResult<Vec<Block>> {
    let mut parser = BodyParser::new(xml);
    let mut saw_body = false;
    let mut blocks = Vec::new();
    loop {
        match parser.next()? {
            Event::Start(e) if e.local_name().as_ref() == b"body" => {
                saw_body = true;
                blocks = parser.read_blocks(b"body")?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !saw_body {
        return Err(ConvertError::malformed("document part has no body element"));
    }
    Ok(blocks)
}

/// Parse a footnotes or endnotes part. Separator notes are dropped.
pub(crate) fn parse_notes(xml: &str, kind: NoteKind) -> ParseResult<Vec<Note>> {
    let element: &[u8] = match kind {
        NoteKind::Footnote => b"footnote",
        NoteKind::Endnote => b"endnote",
    };
    let mut parser = BodyParser::new(xml);
    let mut notes = Vec::new();
    loop {
        match parser.next()? {
            Event::Start(e) if e.local_name().as_ref() == element => {
                let id = attr(&e, b"id").unwrap_or_default();
                let separator = attr(&e, b"type").is_some_and(|t| t != "normal");
                let blocks = parser.read_blocks(element)?;
                if !separator {
                    notes.push(Note { kind, id, blocks });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(notes)
}

// ── Auxiliary parts ──────────────────────────────────────────────────────────

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub kind: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.kind.ends_with("/image")
    }
}

pub(crate) fn parse_relationships(xml: &str) -> ParseResult<HashMap<String, Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    let external = attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                    let kind = attr(&e, b"Type").unwrap_or_default();
                    rels.insert(
                        id,
                        Relationship {
                            kind,
                            target,
                            external,
                        },
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Map of style id → display name from `word/styles.xml`.
pub(crate) fn parse_styles(xml: &str) -> ParseResult<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut styles = HashMap::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current = attr(&e, b"styleId");
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current.clone(), attr(&e, b"val")) {
                    styles.insert(id, name);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(styles)
}

/// List definitions from `word/numbering.xml`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Numbering {
    /// numId → abstractNumId
    abstract_of: HashMap<String, String>,
    /// (abstractNumId, level) → numFmt
    formats: HashMap<(String, usize), String>,
}

impl Numbering {
    /// True when the level uses a counter; bullets and unknown lists are not.
    pub fn is_ordered(&self, num_id: &str, level: usize) -> bool {
        self.abstract_of
            .get(num_id)
            .and_then(|a| self.formats.get(&(a.clone(), level)))
            .is_some_and(|fmt| fmt != "bullet" && fmt != "none")
    }
}

pub(crate) fn parse_numbering(xml: &str) -> ParseResult<Numbering> {
    let mut reader = Reader::from_str(xml);
    let mut numbering = Numbering::default();
    let mut current_abstract: Option<String> = None;
    let mut current_level: Option<usize> = None;
    let mut current_num: Option<String> = None;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"abstractNum" => current_abstract = attr(&e, b"abstractNumId"),
                b"lvl" => current_level = attr(&e, b"ilvl").and_then(|v| v.parse().ok()),
                b"numFmt" => {
                    if let (Some(a), Some(level), Some(fmt)) =
                        (current_abstract.clone(), current_level, attr(&e, b"val"))
                    {
                        numbering.formats.insert((a, level), fmt);
                    }
                }
                b"num" => current_num = attr(&e, b"numId"),
                b"abstractNumId" => {
                    if let (Some(num), Some(a)) = (current_num.clone(), attr(&e, b"val")) {
                        numbering.abstract_of.insert(num, a);
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"abstractNum" => current_abstract = None,
                b"lvl" => current_level = None,
                b"num" => current_num = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(numbering)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
 xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<w:body>{inner}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
        )
    }

    fn only_paragraph(blocks: &[Block]) -> &Paragraph {
        match blocks {
            [Block::Paragraph(p)] => p,
            other => panic!("expected one paragraph, got {other:?}"),
        }
    }

    #[test]
    fn reads_runs_and_properties() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>
               <w:r><w:rPr><w:b/><w:i w:val="0"/></w:rPr><w:t xml:space="preserve">Hello </w:t></w:r>
               <w:r><w:t>a &amp; b</w:t><w:tab/><w:br/><w:br w:type="page"/></w:r></w:p>"#,
        );
        let blocks = parse_document(&xml).unwrap();
        let p = only_paragraph(&blocks);
        assert_eq!(p.style_id.as_deref(), Some("Heading1"));
        let Inline::Run(first) = &p.children[0] else {
            panic!("expected run")
        };
        assert!(first.props.bold);
        assert!(!first.props.italic);
        assert_eq!(first.content, vec![RunContent::Text("Hello ".into())]);
        let Inline::Run(second) = &p.children[1] else {
            panic!("expected run")
        };
        assert_eq!(
            second.content,
            vec![
                RunContent::Text("a & b".into()),
                RunContent::Tab,
                RunContent::Break
            ]
        );
    }

    #[test]
    fn skips_deleted_text_and_field_codes() {
        let xml = body(
            r#"<w:p><w:del w:id="1"><w:r><w:delText>gone</w:delText></w:r></w:del>
               <w:r><w:instrText> PAGE </w:instrText></w:r>
               <w:ins w:id="2"><w:r><w:t>kept</w:t></w:r></w:ins></w:p>"#,
        );
        let blocks = parse_document(&xml).unwrap();
        let p = only_paragraph(&blocks);
        let texts: Vec<_> = p
            .children
            .iter()
            .filter_map(|i| match i {
                Inline::Run(r) => Some(r.content.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(texts, vec![RunContent::Text("kept".into())]);
    }

    #[test]
    fn reads_hyperlinks_bookmarks_and_numbering() {
        let xml = body(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr></w:pPr>
               <w:bookmarkStart w:id="0" w:name="_GoBack"/><w:bookmarkStart w:id="1" w:name="intro"/>
               <w:hyperlink r:id="rId9"><w:r><w:t>link</w:t></w:r></w:hyperlink>
               <w:r><w:t>plain</w:t></w:r></w:p>"#,
        );
        let blocks = parse_document(&xml).unwrap();
        let p = only_paragraph(&blocks);
        assert_eq!(
            p.numbering,
            Some(NumberingRef {
                num_id: "3".into(),
                level: 1
            })
        );
        assert_eq!(p.children[0], Inline::Bookmark("intro".into()));
        let Inline::Run(linked) = &p.children[1] else {
            panic!("expected run")
        };
        assert_eq!(linked.link.as_ref().unwrap().rel_id.as_deref(), Some("rId9"));
        let Inline::Run(plain) = &p.children[2] else {
            panic!("expected run")
        };
        assert!(plain.link.is_none());
    }

    #[test]
    fn reads_tables_with_spans() {
        let xml = body(
            r#"<w:tbl><w:tblPr/><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid>
               <w:tr><w:trPr><w:tblHeader/></w:trPr>
                 <w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>H</w:t></w:r></w:p></w:tc></w:tr>
               <w:tr><w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
               <w:tr><w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
               </w:tbl>"#,
        );
        let blocks = parse_document(&xml).unwrap();
        let [Block::Table(table)] = blocks.as_slice() else {
            panic!("expected table, got {blocks:?}")
        };
        assert!(table.rows[0].is_header);
        assert_eq!(table.rows[0].cells[0].colspan, 2);
        assert_eq!(table.rows[1].cells[0].rowspan, 2);
        assert_eq!(table.rows[2].cells.len(), 1);
    }

    fn nested_tables(depth: usize) -> String {
        let mut xml = String::new();
        for _ in 0..depth {
            xml.push_str("<w:tbl><w:tr><w:tc>");
        }
        xml.push_str("<w:p><w:r><w:t>deep</w:t></w:r></w:p>");
        for _ in 0..depth {
            xml.push_str("</w:tc></w:tr></w:tbl>");
        }
        body(&xml)
    }

    #[test]
    fn accepts_tables_nested_up_to_the_limit() {
        let blocks = parse_document(&nested_tables(MAX_TABLE_DEPTH)).unwrap();
        let mut depth = 0;
        let mut current = blocks.as_slice();
        while let [Block::Table(table)] = current {
            depth += 1;
            current = table.rows[0].cells[0].blocks.as_slice();
        }
        assert_eq!(depth, MAX_TABLE_DEPTH);
    }

    #[test]
    fn rejects_runaway_table_nesting() {
        let err = parse_document(&nested_tables(MAX_TABLE_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedDocument { .. }), "{err:?}");

        // Deep enough to exhaust a blocking-pool thread's stack if unbounded.
        let xml = nested_tables(20_000);
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || parse_document(&xml).is_err())
            .unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn reads_drawing_alt_text() {
        let xml = body(
            r#"<w:p><w:r><w:drawing><wp:inline xmlns:wp="wp" xmlns:a="a" xmlns:pic="pic">
               <wp:docPr id="1" name="Picture 1" descr="A cat"/>
               <a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId5"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>
               </wp:inline></w:drawing></w:r></w:p>"#,
        );
        let blocks = parse_document(&xml).unwrap();
        let p = only_paragraph(&blocks);
        let Inline::Run(run) = &p.children[0] else {
            panic!("expected run")
        };
        assert_eq!(
            run.content,
            vec![RunContent::Image(ImageRef {
                rel_id: "rId5".into(),
                alt: Some("A cat".into())
            })]
        );
    }

    #[test]
    fn missing_body_is_malformed() {
        let err = parse_document("<w:document xmlns:w=\"w\"/>").unwrap_err();
        assert!(matches!(err, ConvertError::MalformedDocument { .. }));
    }

    #[test]
    fn broken_xml_is_malformed() {
        let err = parse_document("<w:document><w:body><w:p></w:body>").unwrap_err();
        assert!(matches!(err, ConvertError::MalformedDocument { .. }));
    }

    #[test]
    fn notes_skip_separators() {
        let xml = r#"<w:footnotes xmlns:w="w">
            <w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote>
            <w:footnote w:id="1"><w:p><w:r><w:t>Note text</w:t></w:r></w:p></w:footnote>
        </w:footnotes>"#;
        let notes = parse_notes(xml, NoteKind::Footnote).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "1");
    }

    #[test]
    fn styles_and_numbering() {
        let styles = parse_styles(
            r#"<w:styles xmlns:w="w"><w:style w:type="paragraph" w:styleId="Heading2">
               <w:name w:val="heading 2"/></w:style></w:styles>"#,
        )
        .unwrap();
        assert_eq!(styles.get("Heading2").map(String::as_str), Some("heading 2"));

        let numbering = parse_numbering(
            r#"<w:numbering xmlns:w="w">
               <w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl>
                 <w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
               <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#,
        )
        .unwrap();
        assert!(numbering.is_ordered("1", 0));
        assert!(!numbering.is_ordered("1", 1));
        assert!(!numbering.is_ordered("7", 0));
    }

    #[test]
    fn relationships_flag_external_targets() {
        let rels = parse_relationships(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
               <Relationship Id="rId1" Type="http://x/hyperlink" Target="https://example.com/" TargetMode="External"/>
               <Relationship Id="rId2" Type="http://x/image" Target="media/image1.png"/></Relationships>"#,
        )
        .unwrap();
        assert!(rels["rId1"].external);
        assert!(rels["rId2"].is_image());
        assert_eq!(rels["rId2"].target, "media/image1.png");
    }
}
