//! Document → HTML: open a Word package and render its body as HTML.
//!
//! ## Parts read
//!
//! | Part                              | Required | Used for                    |
//! |-----------------------------------|----------|-----------------------------|
//! | `word/document.xml`               | yes      | body blocks                 |
//! | `word/_rels/document.xml.rels`    | no       | hyperlink and image targets |
//! | `word/styles.xml`                 | no       | style id → display name     |
//! | `word/numbering.xml`              | no       | ordered vs. bullet lists    |
//! | `word/footnotes.xml`, `endnotes`  | no       | appended note list          |
//!
//! A missing optional part degrades output quality but never fails the
//! conversion. A package that is not a zip, lacks the main part, or whose
//! main part is not well-formed XML is a [`ConvertError::MalformedDocument`].

mod html;
mod model;
mod parse;

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::pipeline::markup::clean_html;
use html::{ImagePart, RenderContext, Renderer};
use model::NoteKind;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) use parse::attr as attribute;

const DOCUMENT_PART: &str = "word/document.xml";

/// HTML produced from one document, plus non-fatal converter messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedMarkup {
    pub html: String,
    pub warnings: Vec<String>,
}

/// Convert the raw bytes of a `.docx` package to an HTML fragment.
pub fn convert_to_html(
    docx: &[u8],
    config: &ConversionConfig,
) -> Result<ConvertedMarkup, ConvertError> {
    let mut package = Package::open(docx)?;

    let document = package
        .read_text(DOCUMENT_PART)?
        .ok_or_else(|| ConvertError::malformed(format!("package has no {DOCUMENT_PART}")))?;
    let body = parse::parse_document(&document)?;

    let mut ctx = RenderContext {
        embed_images: config.embed_images,
        ..RenderContext::default()
    };
    let mut warnings = Vec::new();

    // Optional parts: a broken one costs fidelity, not the conversion.
    if let Some(xml) = package.read_text("word/_rels/document.xml.rels")? {
        match parse::parse_relationships(&xml) {
            Ok(rels) => ctx.rels = rels,
            Err(e) => warnings.push(format!("Ignoring document relationships: {e}")),
        }
    }
    if let Some(xml) = package.read_text("word/styles.xml")? {
        match parse::parse_styles(&xml) {
            Ok(styles) => ctx.styles = styles,
            Err(e) => warnings.push(format!("Ignoring styles: {e}")),
        }
    }
    if let Some(xml) = package.read_text("word/numbering.xml")? {
        match parse::parse_numbering(&xml) {
            Ok(numbering) => ctx.numbering = numbering,
            Err(e) => warnings.push(format!("Ignoring numbering: {e}")),
        }
    }
    for (part, kind) in [
        ("word/footnotes.xml", NoteKind::Footnote),
        ("word/endnotes.xml", NoteKind::Endnote),
    ] {
        if let Some(xml) = package.read_text(part)? {
            match parse::parse_notes(&xml, kind) {
                Ok(notes) => {
                    for note in notes {
                        ctx.notes.insert((note.kind, note.id), note.blocks);
                    }
                }
                Err(e) => warnings.push(format!("Ignoring {part}: {e}")),
            }
        }
    }

    if config.embed_images {
        let image_rels: Vec<(String, String)> = ctx
            .rels
            .iter()
            .filter(|(_, rel)| rel.is_image() && !rel.external)
            .map(|(id, rel)| (id.clone(), resolve_part_name("word", &rel.target)))
            .collect();
        for (id, part) in image_rels {
            if let Some(bytes) = package.read_binary(&part)? {
                ctx.images.insert(
                    id,
                    ImagePart {
                        mime: mime_for(&part),
                        bytes,
                    },
                );
            }
        }
    }

    let (html, render_warnings) = Renderer::new(&ctx).render_document(&body);
    warnings.extend(render_warnings);
    for w in &warnings {
        warn!("{}", w);
    }

    let html = clean_html(&html);
    debug!(
        "Converted document: {} blocks → {} bytes of HTML, {} warnings",
        body.len(),
        html.len(),
        warnings.len()
    );
    Ok(ConvertedMarkup { html, warnings })
}

/// The zip container of a Word document.
struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, ConvertError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ConvertError::malformed(format!("not a zip package: {e}")))?;
        Ok(Self { archive })
    }

    /// Bytes of a part, or `None` when the package lacks it.
    fn read_binary(&mut self, name: &str) -> Result<Option<Vec<u8>>, ConvertError> {
        let mut file = match self.archive.by_name(name) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(ConvertError::malformed(format!("cannot open {name}: {e}"))),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| ConvertError::malformed(format!("cannot read {name}: {e}")))?;
        Ok(Some(bytes))
    }

    /// A part decoded as UTF-8, with any byte-order mark removed.
    fn read_text(&mut self, name: &str) -> Result<Option<String>, ConvertError> {
        let Some(bytes) = self.read_binary(name)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)
            .map_err(|_| ConvertError::malformed(format!("{name} is not valid UTF-8")))?;
        Ok(Some(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        }))
    }
}

/// Resolve a relationship target relative to the directory of its source
/// part. Absolute targets (`/word/media/x.png`) are package-rooted.
fn resolve_part_name(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn mime_for(part: &str) -> &'static str {
    let ext = part
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}
