//! Synthesised `.docx` packages for unit tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const IMAGE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

struct Media {
    rel_id: String,
    target: String,
    bytes: Vec<u8>,
}

/// Builds a minimal but valid Word package, one body element at a time.
pub(crate) struct DocxBuilder {
    body: String,
    footnotes: Vec<(String, String)>,
    media: Vec<Media>,
    with_document: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            body: String::new(),
            footnotes: Vec::new(),
            media: Vec::new(),
            with_document: true,
        }
    }

    pub fn heading(mut self, level: u8, text: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading{level}\"/></w:pPr>{}</w:p>",
            run(text)
        ));
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        if text.is_empty() {
            self.body.push_str("<w:p/>");
        } else {
            self.body.push_str(&format!("<w:p>{}</w:p>", run(text)));
        }
        self
    }

    /// Item of the decimal list (`numId` 1 in the numbering part).
    pub fn numbered_item(self, level: u32, text: &str) -> Self {
        self.list_item(1, level, text)
    }

    /// Item of the bullet list (`numId` 2 in the numbering part).
    pub fn bullet_item(self, level: u32, text: &str) -> Self {
        self.list_item(2, level, text)
    }

    fn list_item(mut self, num_id: u32, level: u32, text: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"{level}\"/><w:numId w:val=\"{num_id}\"/></w:numPr></w:pPr>{}</w:p>",
            run(text)
        ));
        self
    }

    pub fn image(mut self, rel_id: &str, target: &str, bytes: &[u8], alt: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:r><w:drawing><wp:inline>\
             <wp:docPr id=\"1\" name=\"Picture\" descr=\"{alt}\"/>\
             <a:graphic><a:graphicData><pic:pic><pic:blipFill>\
             <a:blip r:embed=\"{rel_id}\"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>\
             </wp:inline></w:drawing></w:r></w:p>"
        ));
        self.media.push(Media {
            rel_id: rel_id.to_string(),
            target: target.to_string(),
            bytes: bytes.to_vec(),
        });
        self
    }

    pub fn paragraph_with_footnote(mut self, text: &str, id: &str, note: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p>{}<w:r><w:rPr><w:rStyle w:val=\"FootnoteReference\"/></w:rPr>\
             <w:footnoteReference w:id=\"{id}\"/></w:r></w:p>",
            run(text)
        ));
        self.footnotes.push((id.to_string(), note.to_string()));
        self
    }

    /// Append raw WordprocessingML to the body.
    pub fn raw_body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub fn without_document(mut self) -> Self {
        self.with_document = false;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let mut add = |name: &str, content: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content).unwrap();
        };

        add("[Content_Types].xml", CONTENT_TYPES.as_bytes());
        add("_rels/.rels", ROOT_RELS.as_bytes());
        if self.with_document {
            let document = format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\" \
                 xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
                 xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
                 xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
                 <w:body>{}<w:sectPr/></w:body></w:document>",
                self.body
            );
            add("word/document.xml", document.as_bytes());
        }
        add("word/styles.xml", styles().as_bytes());
        add("word/numbering.xml", NUMBERING.as_bytes());

        let mut rels = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for m in &self.media {
            rels.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{IMAGE_REL}\" Target=\"{}\"/>",
                m.rel_id, m.target
            ));
        }
        rels.push_str("</Relationships>");
        add("word/_rels/document.xml.rels", rels.as_bytes());

        for m in &self.media {
            add(&format!("word/{}", m.target), &m.bytes);
        }

        if !self.footnotes.is_empty() {
            let mut notes = format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?><w:footnotes xmlns:w=\"{W_NS}\">\
                 <w:footnote w:type=\"separator\" w:id=\"-1\"><w:p><w:r><w:separator/></w:r></w:p></w:footnote>"
            );
            for (id, text) in &self.footnotes {
                notes.push_str(&format!(
                    "<w:footnote w:id=\"{id}\"><w:p><w:pPr><w:pStyle w:val=\"FootnoteText\"/></w:pPr>{}</w:p></w:footnote>",
                    run(text)
                ));
            }
            notes.push_str("</w:footnotes>");
            add("word/footnotes.xml", notes.as_bytes());
        }

        zip.finish().unwrap().into_inner()
    }
}

fn run(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<w:r><w:t xml:space=\"preserve\">{escaped}</w:t></w:r>")
}

fn styles() -> String {
    let mut xml = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><w:styles xmlns:w=\"{W_NS}\">");
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>",
    );
    for level in 1..=6 {
        xml.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"Heading{level}\"><w:name w:val=\"heading {level}\"/></w:style>"
        ));
    }
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:styleId=\"FootnoteText\"><w:name w:val=\"footnote text\"/></w:style>\
         <w:style w:type=\"paragraph\" w:styleId=\"Quote\"><w:name w:val=\"Quote\"/></w:style>\
         </w:styles>",
    );
    xml
}

const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" \
ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
</Types>";

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" \
Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
Target=\"word/document.xml\"/></Relationships>";

const NUMBERING: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<w:numbering xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:abstractNum w:abstractNumId=\"0\">\
<w:lvl w:ilvl=\"0\"><w:numFmt w:val=\"decimal\"/></w:lvl>\
<w:lvl w:ilvl=\"1\"><w:numFmt w:val=\"lowerLetter\"/></w:lvl></w:abstractNum>\
<w:abstractNum w:abstractNumId=\"1\">\
<w:lvl w:ilvl=\"0\"><w:numFmt w:val=\"bullet\"/></w:lvl>\
<w:lvl w:ilvl=\"1\"><w:numFmt w:val=\"bullet\"/></w:lvl></w:abstractNum>\
<w:num w:numId=\"1\"><w:abstractNumId w:val=\"0\"/></w:num>\
<w:num w:numId=\"2\"><w:abstractNumId w:val=\"1\"/></w:num>\
</w:numbering>";
