//! Filename handling for uploads and downloads.
//!
//! Uploaded filenames are only ever used to build the name the requester
//! sees on download. Storage keys are generated separately (see
//! [`crate::storage`]), so nothing here has to be collision-free.

use crate::format::OutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Used when sanitising leaves nothing behind.
pub const FALLBACK_FILENAME: &str = "document.docx";

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce a client-supplied filename to a safe ASCII basename.
///
/// Accented Latin letters are folded to their base letter, other non-ASCII
/// characters are dropped, path separators and whitespace runs become `_`,
/// anything outside `[A-Za-z0-9_.-]` is removed and leading/trailing dots
/// and underscores are stripped. The result can never contain a path
/// separator or start with `..`.
///
/// ```
/// use docx2ebook::naming::secure_filename;
///
/// assert_eq!(secure_filename("My cool report.docx"), "My_cool_report.docx");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("Relatório Anual.docx"), "Relatorio_Anual.docx");
/// ```
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter_map(fold_to_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = RE_UNSAFE_CHARS.replace_all(&joined, "");
    stripped.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Like [`secure_filename`] but never returns an empty string.
pub fn secure_filename_or_default(filename: Option<&str>) -> String {
    let name = filename.map(secure_filename).unwrap_or_default();
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name
    }
}

/// Name of the generated artifact for a given (sanitised) upload name.
///
/// A trailing `.docx` (any case) is replaced by the output extension;
/// a name without it gets the extension appended.
///
/// ```
/// use docx2ebook::{naming::output_filename, OutputFormat};
///
/// assert_eq!(output_filename("report.docx", OutputFormat::Epub), "report.epub");
/// assert_eq!(output_filename("report.docx", OutputFormat::Pdf), "report.pdf");
/// assert_eq!(output_filename("notes.doc", OutputFormat::Pdf), "notes.doc.pdf");
/// ```
pub fn output_filename(upload_name: &str, format: OutputFormat) -> String {
    let stem = match upload_name.len().checked_sub(5) {
        Some(cut)
            if upload_name.is_char_boundary(cut)
                && upload_name[cut..].eq_ignore_ascii_case(".docx") =>
        {
            &upload_name[..cut]
        }
        _ => upload_name,
    };
    format!("{}.{}", stem, format.extension())
}

fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        c if c.is_whitespace() => ' ',
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(secure_filename("sample.docx"), "sample.docx");
        assert_eq!(secure_filename("a-b_c.1.docx"), "a-b_c.1.docx");
    }

    #[test]
    fn strips_traversal() {
        assert_eq!(secure_filename("../../../x.docx"), "x.docx");
        assert_eq!(secure_filename("..\\..\\win.docx"), "win.docx");
        assert_eq!(secure_filename("/abs/path/doc.docx"), "abs_path_doc.docx");
        assert!(!secure_filename("..").contains(".."));
    }

    #[test]
    fn drops_unsafe_characters() {
        assert_eq!(secure_filename("what?*<>|.docx"), "what.docx");
        assert_eq!(secure_filename("日本語.docx"), "docx");
    }

    #[test]
    fn empty_falls_back() {
        assert_eq!(secure_filename_or_default(Some("???")), FALLBACK_FILENAME);
        assert_eq!(secure_filename_or_default(None), FALLBACK_FILENAME);
        assert_eq!(secure_filename_or_default(Some("ok.docx")), "ok.docx");
    }

    #[test]
    fn output_name_substitutes_extension() {
        assert_eq!(output_filename("sample.docx", OutputFormat::Epub), "sample.epub");
        assert_eq!(output_filename("SAMPLE.DOCX", OutputFormat::Pdf), "SAMPLE.pdf");
        assert_eq!(output_filename("docx", OutputFormat::Epub), "docx.epub");
    }
}
