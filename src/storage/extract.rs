//! Plain-text extraction for the accepted document formats.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StorageError;

static PARAGRAPH_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:p>|<w:br\s*/>").unwrap());
static XML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Turn a fetched object into text, one source line per output line.
pub fn extract_text(key: &str, bytes: &[u8]) -> Result<String, StorageError> {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext {
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            StorageError::ExtractError {
                key: key.to_string(),
                message: e.to_string(),
            }
        }),
        "docx" => extract_docx(key, bytes),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn extract_docx(key: &str, bytes: &[u8]) -> Result<String, StorageError> {
    let extract_err = |message: String| StorageError::ExtractError {
        key: key.to_string(),
        message,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| extract_err(e.to_string()))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| extract_err(e.to_string()))?;
    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| extract_err(e.to_string()))?;

    let with_breaks = PARAGRAPH_END.replace_all(&xml, "\n");
    let text = XML_TAG.replace_all(&with_breaks, "");
    Ok(unescape_xml(text.trim_end_matches('\n')))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
