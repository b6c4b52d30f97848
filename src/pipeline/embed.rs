//! Self-contained output: embedded document media rewritten as data URIs.
//!
//! A DOCX is a zip whose images live under `word/media/`. Typesetter output
//! refers to those images by relative path, which nothing downstream can
//! resolve. This module builds a path → data-URI map (each image keyed under
//! several equivalent spellings) and rewrites every reference in HTML
//! `src` attributes or Markdown image syntax.

use crate::pipeline::css::DOCUMENT_FULL_CSS;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

/// Resource path (several spellings) → `data:` URI.
pub type MediaMap = HashMap<String, String>;

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_ENTRY_PREALLOC: u64 = 4 * 1024 * 1024;

static MEDIA_ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^word/media/").expect("valid regex"));
static HTML_SRC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src=["']([^"']+)["']"#).expect("valid regex"));
static MD_IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));
static HEAD_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</head>").expect("valid regex"));

/// Which reference syntax to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFlavor {
    Html,
    Markdown,
    Plain,
}

/// MIME type for an image file extension.
pub fn image_mime(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => return None,
    };
    Some(mime)
}

pub fn to_data_uri(data: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn mime_for_path(path: &str) -> &'static str {
    let name = file_name(path);
    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    image_mime(ext).unwrap_or("application/octet-stream")
}

/// Data URIs for every non-empty `word/media/*` entry of a DOCX.
///
/// Each image is keyed as `image1.png`, `media/image1.png` and
/// `./media/image1.png`. An unreadable archive yields an empty map.
pub fn extract_docx_media(docx: &[u8]) -> MediaMap {
    match read_media_entries(docx) {
        Ok(map) => {
            debug!("Extracted {} media keys from container", map.len());
            map
        }
        Err(e) => {
            warn!("Failed to extract media from document container: {}", e);
            MediaMap::new()
        }
    }
}

/// Initial buffer size for an entry. The declared size comes from the
/// archive header and is not trusted beyond [`MAX_ENTRY_PREALLOC`].
fn entry_capacity(declared: u64) -> usize {
    declared.min(MAX_ENTRY_PREALLOC) as usize
}

fn read_media_entries(docx: &[u8]) -> Result<MediaMap, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx))?;
    let mut map = MediaMap::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let path = entry.name().to_string();
        if entry.is_dir() || !MEDIA_ENTRY_RE.is_match(&path) {
            continue;
        }
        let mut data = Vec::with_capacity(entry_capacity(entry.size()));
        entry.read_to_end(&mut data)?;
        if data.is_empty() {
            continue;
        }

        let name = file_name(&path).to_string();
        let uri = to_data_uri(&data, mime_for_path(&name));
        map.insert(format!("media/{name}"), uri.clone());
        map.insert(format!("./media/{name}"), uri.clone());
        map.insert(name, uri);
    }

    Ok(map)
}

/// Add media reported by the typesetter, keeping entries already present.
pub fn merge_engine_media(map: &mut MediaMap, media: &HashMap<String, Vec<u8>>) {
    for (raw, data) in media {
        if map.contains_key(raw) {
            continue;
        }
        let uri = to_data_uri(data, mime_for_path(raw));
        let normalized = raw.strip_prefix("./").unwrap_or(raw);
        map.insert(normalized.to_string(), uri.clone());
        map.insert(file_name(raw).to_string(), uri.clone());
        map.insert(raw.clone(), uri);
    }
}

/// Exact path, then without `./` or `/` prefix, then bare file name.
fn resolve<'m>(map: &'m MediaMap, src: &str) -> Option<&'m String> {
    if let Some(uri) = map.get(src) {
        return Some(uri);
    }
    let cleaned = src.strip_prefix("./").unwrap_or(src);
    let cleaned = cleaned.strip_prefix('/').unwrap_or(cleaned);
    map.get(cleaned).or_else(|| map.get(file_name(cleaned)))
}

/// Rewrite resource references in `text` to data URIs. Unresolved
/// references are left untouched.
pub fn embed_media(text: &str, map: &MediaMap, flavor: TextFlavor) -> String {
    if map.is_empty() {
        return text.to_string();
    }

    match flavor {
        TextFlavor::Html => HTML_SRC_RE
            .replace_all(text, |caps: &Captures| match resolve(map, &caps[1]) {
                Some(uri) => format!("src=\"{uri}\""),
                None => caps[0].to_string(),
            })
            .into_owned(),
        TextFlavor::Markdown => MD_IMAGE_RE
            .replace_all(text, |caps: &Captures| match resolve(map, &caps[2]) {
                Some(uri) => format!("![{}]({uri})", &caps[1]),
                None => caps[0].to_string(),
            })
            .into_owned(),
        TextFlavor::Plain => text.to_string(),
    }
}

/// Insert the document stylesheet before `</head>`, or prepend it.
pub fn inject_stylesheet(html: &str) -> String {
    let block = format!("<style>\n{DOCUMENT_FULL_CSS}\n</style>");
    match HEAD_CLOSE_RE.find(html) {
        Some(m) => format!("{}{block}\n{}", &html[..m.start()], &html[m.start()..]),
        None => format!("{block}\n{html}"),
    }
}
