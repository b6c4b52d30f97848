//! Format registry: categories, format tokens and the static catalog.
//!
//! Every conversion is expressed in terms of two closed enums, [`Category`]
//! and [`FormatToken`]. The router matches on them exhaustively, so a newly
//! added token that no engine handles is a compile error rather than a
//! runtime fallthrough.
//!
//! The helpers at the bottom ([`detect_format`], [`detect_category`],
//! [`human_file_size`], [`generate_id`]) are pure and never fail.

use crate::error::{ParseCategoryError, ParseFormatError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Category ─────────────────────────────────────────────────────────────

/// Which engine family handles a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Document,
    Media,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Image, Category::Document, Category::Media];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Document => "document",
            Category::Media => "media",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Category::Image),
            "document" => Ok(Category::Document),
            "media" => Ok(Category::Media),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

// ── FormatToken ──────────────────────────────────────────────────────────

/// Canonical internal format token.
///
/// `*Pages` tokens mean "render the document visually and rasterise it"
/// rather than a structural conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatToken {
    // Raster images
    Png,
    Jpeg,
    Webp,
    Bmp,
    Gif,
    // Documents
    Pdf,
    Docx,
    Txt,
    Html,
    Md,
    Odt,
    Epub,
    Rtf,
    // Page-image targets
    JpgPages,
    PngPages,
    WebpPages,
    // Audio / video
    Mp3,
    Wav,
    Ogg,
    Mp4,
    Webm,
}

impl FormatToken {
    pub const ALL: [FormatToken; 21] = [
        FormatToken::Png,
        FormatToken::Jpeg,
        FormatToken::Webp,
        FormatToken::Bmp,
        FormatToken::Gif,
        FormatToken::Pdf,
        FormatToken::Docx,
        FormatToken::Txt,
        FormatToken::Html,
        FormatToken::Md,
        FormatToken::Odt,
        FormatToken::Epub,
        FormatToken::Rtf,
        FormatToken::JpgPages,
        FormatToken::PngPages,
        FormatToken::WebpPages,
        FormatToken::Mp3,
        FormatToken::Wav,
        FormatToken::Ogg,
        FormatToken::Mp4,
        FormatToken::Webm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatToken::Png => "png",
            FormatToken::Jpeg => "jpeg",
            FormatToken::Webp => "webp",
            FormatToken::Bmp => "bmp",
            FormatToken::Gif => "gif",
            FormatToken::Pdf => "pdf",
            FormatToken::Docx => "docx",
            FormatToken::Txt => "txt",
            FormatToken::Html => "html",
            FormatToken::Md => "md",
            FormatToken::Odt => "odt",
            FormatToken::Epub => "epub",
            FormatToken::Rtf => "rtf",
            FormatToken::JpgPages => "jpg-pages",
            FormatToken::PngPages => "png-pages",
            FormatToken::WebpPages => "webp-pages",
            FormatToken::Mp3 => "mp3",
            FormatToken::Wav => "wav",
            FormatToken::Ogg => "ogg",
            FormatToken::Mp4 => "mp4",
            FormatToken::Webm => "webm",
        }
    }

    /// `true` for the screenshot-style page-image targets.
    pub fn is_page_image(self) -> bool {
        matches!(
            self,
            FormatToken::JpgPages | FormatToken::PngPages | FormatToken::WebpPages
        )
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatToken {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FormatToken::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────

/// Static catalog entry shown to users when picking a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    pub value: FormatToken,
    pub label: &'static str,
    pub mime: &'static str,
    pub ext: &'static str,
}

const fn opt(
    value: FormatToken,
    label: &'static str,
    mime: &'static str,
    ext: &'static str,
) -> FormatOption {
    FormatOption {
        value,
        label,
        mime,
        ext,
    }
}

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub static IMAGE_FORMATS: [FormatOption; 4] = [
    opt(FormatToken::Png, "PNG", "image/png", "png"),
    opt(FormatToken::Jpeg, "JPG", "image/jpeg", "jpg"),
    opt(FormatToken::Webp, "WEBP", "image/webp", "webp"),
    opt(FormatToken::Bmp, "BMP", "image/bmp", "bmp"),
];

pub static DOCUMENT_FORMATS: [FormatOption; 11] = [
    opt(FormatToken::Docx, "DOCX", DOCX_MIME, "docx"),
    opt(FormatToken::Txt, "TXT", "text/plain", "txt"),
    opt(FormatToken::Html, "HTML", "text/html", "html"),
    opt(FormatToken::Md, "Markdown", "text/markdown", "md"),
    opt(FormatToken::Pdf, "PDF", "application/pdf", "pdf"),
    opt(FormatToken::JpgPages, "JPG (screenshot)", "image/jpeg", "jpg"),
    opt(FormatToken::PngPages, "PNG (screenshot)", "image/png", "png"),
    opt(FormatToken::WebpPages, "WEBP (screenshot)", "image/webp", "webp"),
    opt(FormatToken::Odt, "ODT", "application/vnd.oasis.opendocument.text", "odt"),
    opt(FormatToken::Epub, "EPUB", "application/epub+zip", "epub"),
    opt(FormatToken::Rtf, "RTF", "application/rtf", "rtf"),
];

pub static MEDIA_FORMATS: [FormatOption; 6] = [
    opt(FormatToken::Mp3, "MP3", "audio/mpeg", "mp3"),
    opt(FormatToken::Wav, "WAV", "audio/wav", "wav"),
    opt(FormatToken::Ogg, "OGG", "audio/ogg", "ogg"),
    opt(FormatToken::Mp4, "MP4", "video/mp4", "mp4"),
    opt(FormatToken::Webm, "WEBM", "video/webm", "webm"),
    opt(FormatToken::Gif, "GIF", "image/gif", "gif"),
];

/// Target formats offered for a category.
pub fn formats_for_category(category: Category) -> &'static [FormatOption] {
    match category {
        Category::Image => &IMAGE_FORMATS,
        Category::Document => &DOCUMENT_FORMATS,
        Category::Media => &MEDIA_FORMATS,
    }
}

/// Catalog entry for `token` within `category`, if offered there.
pub fn find_option(category: Category, token: FormatToken) -> Option<&'static FormatOption> {
    formats_for_category(category)
        .iter()
        .find(|o| o.value == token)
}

// ── Accepted upload types ────────────────────────────────────────────────

/// MIME type → accepted extensions, per category, for upload pickers.
pub type AcceptTable = &'static [(&'static str, &'static [&'static str])];

static IMAGE_ACCEPT: [(&str, &[&str]); 5] = [
    ("image/png", &[".png"]),
    ("image/jpeg", &[".jpg", ".jpeg"]),
    ("image/webp", &[".webp"]),
    ("image/bmp", &[".bmp"]),
    ("image/gif", &[".gif"]),
];

static DOCUMENT_ACCEPT: [(&str, &[&str]); 6] = [
    ("application/pdf", &[".pdf"]),
    (DOCX_MIME, &[".docx"]),
    ("application/msword", &[".doc"]),
    ("text/plain", &[".txt"]),
    ("text/html", &[".html", ".htm"]),
    ("text/markdown", &[".md", ".markdown"]),
];

static MEDIA_ACCEPT: [(&str, &[&str]); 11] = [
    ("audio/mpeg", &[".mp3"]),
    ("audio/wav", &[".wav"]),
    ("audio/ogg", &[".ogg"]),
    ("audio/flac", &[".flac"]),
    ("audio/aac", &[".aac"]),
    ("audio/mp4", &[".m4a"]),
    ("video/mp4", &[".mp4"]),
    ("video/webm", &[".webm"]),
    ("video/x-msvideo", &[".avi"]),
    ("video/quicktime", &[".mov"]),
    ("video/x-matroska", &[".mkv"]),
];

/// Static accept table for `category`.
pub fn accept_table(category: Category) -> AcceptTable {
    match category {
        Category::Image => &IMAGE_ACCEPT,
        Category::Document => &DOCUMENT_ACCEPT,
        Category::Media => &MEDIA_ACCEPT,
    }
}

/// MIME type for a file extension, looked up in the accept tables.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let dotted = format!(".{}", ext.to_ascii_lowercase());
    Category::ALL.into_iter().find_map(|c| {
        accept_table(c)
            .iter()
            .find(|(_, exts)| exts.contains(&dotted.as_str()))
            .map(|(mime, _)| *mime)
    })
}

// ── Detection ────────────────────────────────────────────────────────────

/// Lower-cased text after the last `.` in `name`, or `""` when there is none.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Canonical token for an extension, normalising legacy aliases.
pub fn format_from_extension(ext: &str) -> Option<FormatToken> {
    let token = match ext.to_ascii_lowercase().as_str() {
        "png" => FormatToken::Png,
        "jpg" | "jpeg" => FormatToken::Jpeg,
        "webp" => FormatToken::Webp,
        "bmp" => FormatToken::Bmp,
        "gif" => FormatToken::Gif,
        "pdf" => FormatToken::Pdf,
        "docx" | "doc" => FormatToken::Docx,
        "txt" => FormatToken::Txt,
        "html" | "htm" => FormatToken::Html,
        "md" | "markdown" => FormatToken::Md,
        "odt" => FormatToken::Odt,
        "epub" => FormatToken::Epub,
        "rtf" => FormatToken::Rtf,
        "mp3" | "aac" | "m4a" => FormatToken::Mp3,
        "wav" | "flac" => FormatToken::Wav,
        "ogg" => FormatToken::Ogg,
        "mp4" | "avi" | "mov" | "mkv" => FormatToken::Mp4,
        "webm" => FormatToken::Webm,
        _ => return None,
    };
    Some(token)
}

/// Canonical token for a declared MIME type (parameters ignored).
pub fn format_from_mime(mime: &str) -> Option<FormatToken> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let token = match essence.as_str() {
        "image/png" => FormatToken::Png,
        "image/jpeg" | "image/jpg" => FormatToken::Jpeg,
        "image/webp" => FormatToken::Webp,
        "image/bmp" => FormatToken::Bmp,
        "image/gif" => FormatToken::Gif,
        "application/pdf" => FormatToken::Pdf,
        DOCX_MIME | "application/msword" => FormatToken::Docx,
        "text/plain" => FormatToken::Txt,
        "text/html" => FormatToken::Html,
        "text/markdown" => FormatToken::Md,
        "application/vnd.oasis.opendocument.text" => FormatToken::Odt,
        "application/epub+zip" => FormatToken::Epub,
        "application/rtf" | "text/rtf" => FormatToken::Rtf,
        "audio/mpeg" | "audio/aac" | "audio/mp4" => FormatToken::Mp3,
        "audio/wav" | "audio/x-wav" | "audio/flac" => FormatToken::Wav,
        "audio/ogg" => FormatToken::Ogg,
        "video/mp4" | "video/x-msvideo" | "video/quicktime" | "video/x-matroska" => {
            FormatToken::Mp4
        }
        "video/webm" => FormatToken::Webm,
        _ => return None,
    };
    Some(token)
}

/// Detect the canonical format of a file: extension first, then MIME.
pub fn detect_format(name: &str, mime: &str) -> Option<FormatToken> {
    format_from_extension(&extension_of(name)).or_else(|| format_from_mime(mime))
}

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "svg", "avif", "heic"];
const MEDIA_EXTS: &[&str] = &[
    "mp4", "webm", "avi", "mov", "mkv", "mp3", "wav", "ogg", "flac", "aac", "m4a",
];

/// Classify a file. Unknown files default to [`Category::Document`].
pub fn detect_category(name: &str, mime: &str) -> Category {
    let mime = mime.to_ascii_lowercase();
    let ext = extension_of(name);

    if mime.starts_with("image/") || IMAGE_EXTS.contains(&ext.as_str()) {
        return Category::Image;
    }
    if mime.starts_with("video/")
        || mime.starts_with("audio/")
        || MEDIA_EXTS.contains(&ext.as_str())
    {
        return Category::Media;
    }
    Category::Document
}

// ── Small helpers ────────────────────────────────────────────────────────

/// Format a byte count with base-1024 units: `0 B`, `1 KB`, `1.5 KB`, `1 MB`.
pub fn human_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.1}");
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{rendered} {}", UNITS[unit])
}

/// Short random job identifier: eight lower-case base-36 characters.
pub fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
