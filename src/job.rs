//! Per-file job model consumed by batch runners and UIs.
//!
//! A [`ConversionJob`] moves `pending → processing → done | error` and never
//! backwards; every transition goes through a checked method that returns a
//! [`JobStateError`] on an illegal move.

use crate::error::JobStateError;
use crate::format::{self, Category, FormatToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// An input file held entirely in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = format::mime_for_extension(&format::extension_of(&name))
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self { name, mime, bytes })
    }

    /// Lower-cased extension of the file name (`""` if none).
    pub fn extension(&self) -> String {
        format::extension_of(&self.name)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Terminal success value of a conversion.
#[derive(Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Output payload.
    pub bytes: Vec<u8>,
    /// MIME type of the payload.
    pub mime: String,
    /// Definitive output extension (may differ from the target token,
    /// e.g. `jpeg` → `jpg`).
    pub ext: String,
}

impl ConversionResult {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            ext: ext.into(),
        }
    }
}

impl fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionResult")
            .field("mime", &self.mime)
            .field("ext", &self.ext)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    fn can_move_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Error)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        })
    }
}

/// One conversion request and its mutable outcome.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: String,
    pub file: InputFile,
    /// Detected source format; `None` for unrecognised files.
    pub source: Option<FormatToken>,
    pub target: FormatToken,
    pub category: Category,
    status: JobStatus,
    progress: u8,
    result: Option<ConversionResult>,
    result_name: Option<String>,
    error: Option<String>,
}

impl ConversionJob {
    /// New pending job with an explicit category.
    pub fn new(file: InputFile, target: FormatToken, category: Category) -> Self {
        let source = format::detect_format(&file.name, &file.mime);
        Self {
            id: format::generate_id(),
            file,
            source,
            target,
            category,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            result_name: None,
            error: None,
        }
    }

    /// New pending job whose category is detected from the file.
    pub fn detect(file: InputFile, target: FormatToken) -> Self {
        let category = format::detect_category(&file.name, &file.mime);
        Self::new(file, target, category)
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn result_name(&self) -> Option<&str> {
        self.result_name.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Take the result payload out of a finished job.
    pub fn take_result(&mut self) -> Option<ConversionResult> {
        self.result.take()
    }

    /// `pending → processing`.
    pub fn start(&mut self) -> Result<(), JobStateError> {
        self.transition(JobStatus::Processing)?;
        self.progress = 0;
        Ok(())
    }

    /// Record a progress value while processing; ignored otherwise.
    pub fn set_progress(&mut self, percent: u8) {
        if self.status == JobStatus::Processing {
            self.progress = percent.min(100);
        }
    }

    /// `processing → done`, naming the output `<stem>.<ext>`.
    pub fn complete(&mut self, result: ConversionResult) -> Result<(), JobStateError> {
        self.transition(JobStatus::Done)?;
        self.progress = 100;
        self.result_name = Some(format!("{}.{}", self.file.stem(), result.ext));
        self.result = Some(result);
        Ok(())
    }

    /// `pending | processing → error`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobStateError> {
        self.transition(JobStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobStateError> {
        if !self.status.can_move_to(next) {
            return Err(JobStateError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ConversionJob {
        ConversionJob::new(
            InputFile::new("report.docx", format::DOCX_MIME, b"PK".to_vec()),
            FormatToken::Pdf,
            Category::Document,
        )
    }

    #[test]
    fn new_job_is_pending_with_detected_source() {
        let j = job();
        assert_eq!(j.status(), JobStatus::Pending);
        assert_eq!(j.source, Some(FormatToken::Docx));
        assert_eq!(j.id.len(), 8);
    }

    #[test]
    fn happy_path_names_result_from_stem() {
        let mut j = job();
        j.start().unwrap();
        j.set_progress(40);
        assert_eq!(j.progress(), 40);
        j.complete(ConversionResult::new(b"%PDF".to_vec(), "application/pdf", "pdf"))
            .unwrap();
        assert_eq!(j.status(), JobStatus::Done);
        assert_eq!(j.result_name(), Some("report.pdf"));
        assert_eq!(j.progress(), 100);
    }

    #[test]
    fn done_cannot_go_back_to_processing() {
        let mut j = job();
        j.start().unwrap();
        j.complete(ConversionResult::new(vec![1], "x/y", "bin")).unwrap();
        let err = j.start().unwrap_err();
        assert_eq!(err.from, JobStatus::Done);
        assert_eq!(err.to, JobStatus::Processing);
        assert!(j.fail("late").is_err());
    }

    #[test]
    fn pending_can_fail_directly() {
        let mut j = job();
        j.fail("validation").unwrap();
        assert_eq!(j.error(), Some("validation"));
        assert!(j.status().is_terminal());
    }

    #[test]
    fn progress_is_ignored_outside_processing() {
        let mut j = job();
        j.set_progress(50);
        assert_eq!(j.progress(), 0);
    }

    #[test]
    fn detect_uses_file_category() {
        let j = ConversionJob::detect(
            InputFile::new("song.flac", "", vec![0]),
            FormatToken::Mp3,
        );
        assert_eq!(j.category, Category::Media);
        assert_eq!(j.source, Some(FormatToken::Wav));
    }

    #[test]
    fn stem_handles_dotfiles_and_plain_names() {
        assert_eq!(InputFile::new("a.b.txt", "", vec![]).stem(), "a.b");
        assert_eq!(InputFile::new("README", "", vec![]).stem(), "README");
        assert_eq!(InputFile::new(".env", "", vec![]).stem(), ".env");
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# hi").unwrap();
        let f = InputFile::from_path(&path).await.unwrap();
        assert_eq!(f.name, "note.md");
        assert_eq!(f.mime, "text/markdown");
        assert_eq!(f.bytes, b"# hi");
    }
}
