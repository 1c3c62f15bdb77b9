//! E-book packaging: wrap converted HTML into a single-chapter EPUB 3.
//!
//! ## Container layout
//!
//! ```text
//! mimetype                 stored, first entry, no extra fields
//! META-INF/container.xml   points at EPUB/content.opf
//! EPUB/content.opf         metadata, manifest, spine
//! EPUB/nav.xhtml           EPUB 3 navigation document (first in spine)
//! EPUB/toc.ncx             EPUB 2 table of contents for older readers
//! EPUB/chap1.xhtml         the whole document
//! ```
//!
//! Every entry carries the same fixed timestamp, so identical inputs and
//! metadata give byte-identical archives. `dcterms:modified` is the only
//! time-dependent value and is supplied by the caller.

use crate::error::ConvertError;
use crate::pipeline::markup::{escape_attr, escape_text, xhtml_document};
use std::io::{Cursor, Seek, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const MIMETYPE: &str = "application/epub+zip";

/// Manifest id of the single chapter.
pub const CHAPTER_ID: &str = "chap1";

/// Archive path of the single chapter.
pub const CHAPTER_PATH: &str = "EPUB/chap1.xhtml";

/// Metadata written into the package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    /// `dc:identifier`, typically `urn:uuid:...`.
    pub identifier: String,
    /// `dcterms:modified`, `YYYY-MM-DDThh:mm:ssZ`.
    pub modified: String,
    /// Title of the chapter and its TOC entry.
    pub chapter_title: String,
}

/// Build the EPUB archive in memory.
pub fn build_epub(html: &str, meta: &EpubMetadata) -> Result<Vec<u8>, ConvertError> {
    let cursor = write_epub(html, meta, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// Write the EPUB archive to `writer`, returning it once finished.
pub fn write_epub<W: Write + Seek>(
    html: &str,
    meta: &EpubMetadata,
    writer: W,
) -> Result<W, ConvertError> {
    let mut zip = ZipWriter::new(writer);

    let stored = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let entries: [(&str, String, FileOptions); 6] = [
        ("mimetype", MIMETYPE.to_string(), stored),
        ("META-INF/container.xml", CONTAINER_XML.to_string(), deflated),
        ("EPUB/content.opf", package_document(meta), deflated),
        ("EPUB/nav.xhtml", nav_document(meta), deflated),
        ("EPUB/toc.ncx", ncx_document(meta), deflated),
        (
            CHAPTER_PATH,
            xhtml_document(&meta.chapter_title, &meta.language, html),
            deflated,
        ),
    ];

    for (name, content, options) in entries {
        zip.start_file(name, options).map_err(packaging_err)?;
        zip.write_all(content.as_bytes()).map_err(packaging_err)?;
    }

    let writer = zip.finish().map_err(packaging_err)?;
    debug!("Packaged EPUB '{}' ({} bytes of chapter HTML)", meta.title, html.len());
    Ok(writer)
}

fn packaging_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::EpubPackagingFailed {
        detail: e.to_string(),
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="EPUB/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn package_document(meta: &EpubMetadata) -> String {
    let lang = escape_attr(&meta.language);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="id" version="3.0" xml:lang="{lang}" prefix="rendition: http://www.idpf.org/vocab/rendition/#">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <meta property="dcterms:modified">{modified}</meta>
    <dc:identifier id="id">{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>{language}</dc:language>
    <dc:creator id="creator">{author}</dc:creator>
  </metadata>
  <manifest>
    <item href="chap1.xhtml" id="{CHAPTER_ID}" media-type="application/xhtml+xml"/>
    <item href="toc.ncx" id="ncx" media-type="application/x-dtbncx+xml"/>
    <item href="nav.xhtml" id="nav" media-type="application/xhtml+xml" properties="nav"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="nav"/>
    <itemref idref="{CHAPTER_ID}"/>
  </spine>
</package>
"#,
        modified = escape_text(&meta.modified),
        identifier = escape_text(&meta.identifier),
        title = escape_text(&meta.title),
        language = escape_text(&meta.language),
        author = escape_text(&meta.author),
    )
}

fn nav_document(meta: &EpubMetadata) -> String {
    let lang = escape_attr(&meta.language);
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
  <head>
    <title>{title}</title>
  </head>
  <body>
    <nav epub:type="toc" id="id" role="doc-toc">
      <h2>{title}</h2>
      <ol>
        <li>
          <a href="chap1.xhtml">{chapter}</a>
        </li>
      </ol>
    </nav>
  </body>
</html>
"#,
        title = escape_text(&meta.title),
        chapter = escape_text(&meta.chapter_title),
    )
}

fn ncx_document(meta: &EpubMetadata) -> String {
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta content="{identifier}" name="dtb:uid"/>
    <meta content="0" name="dtb:depth"/>
    <meta content="0" name="dtb:totalPageCount"/>
    <meta content="0" name="dtb:maxPageNumber"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
    <navPoint id="{CHAPTER_ID}">
      <navLabel>
        <text>{chapter}</text>
      </navLabel>
      <content src="chap1.xhtml"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        identifier = escape_attr(&meta.identifier),
        title = escape_text(&meta.title),
        chapter = escape_text(&meta.chapter_title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn meta() -> EpubMetadata {
        EpubMetadata {
            title: "Relatório & Notas".into(),
            author: "Ana <Autora>".into(),
            language: "pt".into(),
            identifier: "urn:uuid:00000000-0000-4000-8000-000000000000".into(),
            modified: "2024-01-01T00:00:00Z".into(),
            chapter_title: "Conteúdo".into(),
        }
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut s = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let bytes = build_epub("<p>x</p>", &meta()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        drop(first);
        assert_eq!(read_entry(&mut archive, "mimetype"), MIMETYPE);
    }

    #[test]
    fn contains_all_parts() {
        let bytes = build_epub("<p>x</p>", &meta()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "META-INF/container.xml",
            "EPUB/content.opf",
            "EPUB/nav.xhtml",
            "EPUB/toc.ncx",
            CHAPTER_PATH,
        ] {
            assert!(names.contains(&part), "missing {part}: {names:?}");
        }
    }

    #[test]
    fn metadata_is_escaped() {
        let bytes = build_epub("<p>x</p>", &meta()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let opf = read_entry(&mut archive, "EPUB/content.opf");
        assert!(opf.contains("<dc:title>Relatório &amp; Notas</dc:title>"));
        assert!(opf.contains("<dc:creator id=\"creator\">Ana &lt;Autora&gt;</dc:creator>"));
        assert!(opf.contains("<dc:language>pt</dc:language>"));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
        assert!(opf.contains("<itemref idref=\"nav\"/>\n    <itemref idref=\"chap1\"/>"));
    }

    #[test]
    fn chapter_body_is_the_html() {
        let html = "<h1>T</h1><p>a &amp; b<br />c</p>";
        let bytes = build_epub(html, &meta()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let chapter = read_entry(&mut archive, CHAPTER_PATH);
        assert!(chapter.contains(&format!("<body>{html}</body>")));
        assert!(chapter.contains("<title>Conteúdo</title>"));
    }

    #[test]
    fn output_is_reproducible() {
        let a = build_epub("<p>same</p>", &meta()).unwrap();
        let b = build_epub("<p>same</p>", &meta()).unwrap();
        assert_eq!(a, b);
    }
}
