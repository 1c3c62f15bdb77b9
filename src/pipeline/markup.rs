//! HTML markup helpers shared by the converter and the packagers.
//!
//! The converter builds its HTML by hand, so escaping lives here. The EPUB
//! packager embeds that HTML verbatim inside an XHTML document, which means
//! anything XML 1.0 forbids (C0 controls, noncharacters, a stray BOM) must
//! be removed before it reaches the packagers.

use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use std::borrow::Cow;

static RE_XML_ILLEGAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x{FEFF}\x{FFFE}\x{FFFF}]").unwrap()
});

/// Remove characters that may not appear in an XML 1.0 document.
///
/// Tab, LF and CR are kept. Everything else is left untouched.
pub fn clean_html(input: &str) -> String {
    match RE_XML_ILLEGAL.replace_all(input, "") {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Escape `&`, `<` and `>` for use in element content.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

/// Escape for use inside a double-quoted attribute value.
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    escape(value)
}

/// Wrap a body fragment into a complete XHTML 1.1 document.
pub fn xhtml_document(title: &str, lang: &str, body: &str) -> String {
    let title = escape_text(title);
    let lang = escape_attr(lang);
    format!(
        "<?xml version='1.0' encoding='utf-8'?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" \
         xmlns:epub=\"http://www.idpf.org/2007/ops\" \
         epub:prefix=\"z3998: http://www.daisy.org/z3998/2012/vocab/structure/#\" \
         lang=\"{lang}\" xml:lang=\"{lang}\">\n\
         <head>\n  <title>{title}</title>\n</head>\n\
         <body>{body}</body>\n\
         </html>\n"
    )
}
