// Text Extraction Service
// Turns a submission source (local path or URL) into one plain-text string.
// Remote bodies are staged in a temp file that is removed on every exit path.

use crate::models::{DocumentFormat, SubmissionSource};
use crate::services::config_store::FetchConfig;
use docx_rs::{DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild};
use pdf_extract::{Document, OutputError, PlainTextOutput};
use regex::Regex;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Largest remote body accepted (200 MiB).
pub const MAX_DOWNLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("download exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("temporary file error: {0}")]
    TempFile(std::io::Error),
    #[error("invalid docx document: {0}")]
    Docx(String),
    #[error("invalid pdf document: {0}")]
    Pdf(String),
}

fn io_error(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// A downloaded body on disk. The file is deleted when the guard drops; a guard
/// only exists once the file was actually created.
pub struct TempDownload {
    path: PathBuf,
}

impl TempDownload {
    pub fn create_in(dir: &Path, suffix: &str) -> Result<Self, ExtractError> {
        let path = dir.join(format!("submission_{}{}", Uuid::new_v4().simple(), suffix));
        fs::File::create_new(&path).map_err(ExtractError::TempFile)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, bytes: &[u8]) -> Result<(), ExtractError> {
        fs::write(&self.path, bytes).map_err(ExtractError::TempFile)
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "[EXTRACT] temp file removed"),
            Err(e) => warn!(path = %self.path.display(), "[EXTRACT] temp file cleanup failed: {}", e),
        }
    }
}

/// Extraction front door: one strategy per source kind.
pub struct Extractor {
    client: reqwest::Client,
    temp_dir: PathBuf,
}

impl Extractor {
    pub fn new(config: &FetchConfig) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(proxy) = config.proxy.as_deref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            temp_dir: std::env::temp_dir(),
        })
    }

    /// Stage downloads in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub async fn extract(&self, source: &SubmissionSource) -> Result<String, ExtractError> {
        let format = source.format();
        let text = match source {
            SubmissionSource::LocalPath(path) => extract_file(path, format)?,
            SubmissionSource::RemoteUrl(url) => self.extract_remote(url, format).await?,
        };
        info!(
            source = %source,
            remote = source.is_remote(),
            format = ?format,
            chars = text.chars().count(),
            "[EXTRACT] text extracted"
        );
        Ok(text)
    }

    async fn extract_remote(&self, url: &str, format: DocumentFormat) -> Result<String, ExtractError> {
        let body = self.download(url).await?;

        let staged = TempDownload::create_in(&self.temp_dir, format.temp_suffix())?;
        staged.write(&body)?;
        debug!(path = %staged.path().display(), bytes = body.len(), "[EXTRACT] body staged");

        extract_file(staged.path(), format)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        if response
            .content_length()
            .is_some_and(|len| len > MAX_DOWNLOAD_BYTES as u64)
        {
            return Err(ExtractError::TooLarge {
                limit: MAX_DOWNLOAD_BYTES,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_DOWNLOAD_BYTES {
                return Err(ExtractError::TooLarge {
                    limit: MAX_DOWNLOAD_BYTES,
                });
            }
        }
        Ok(body)
    }
}

/// Extract text from a file on disk. Unknown formats yield an empty string.
pub fn extract_file(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::Txt => fs::read_to_string(path).map_err(|e| io_error(path, e)),
        DocumentFormat::Docx => {
            let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
            docx_text(&bytes)
        }
        DocumentFormat::Pdf => {
            let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
            pdf_text(&bytes)
        }
        DocumentFormat::Unknown => {
            info!(path = %path.display(), "[EXTRACT] unsupported format, using empty text");
            Ok(String::new())
        }
    }
}

/// Top-level body paragraphs joined with newlines.
pub fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx: Docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        push_paragraph_child(child, &mut out);
    }
    out
}

fn push_paragraph_child(child: &ParagraphChild, out: &mut String) {
    match child {
        ParagraphChild::Run(run) => push_run(run, out),
        ParagraphChild::Hyperlink(link) => {
            for inner in &link.children {
                push_paragraph_child(inner, out);
            }
        }
        _ => {}
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Page texts joined with newlines. Only a document that cannot be loaded is an
/// error: a page that fails or panics in `pdf-extract` contributes an empty
/// string and the remaining pages are still read.
pub fn pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = match catch_unwind(|| Document::load_mem(bytes)) {
        Ok(Ok(doc)) => doc,
        Ok(Err(e)) => return Err(ExtractError::Pdf(e.to_string())),
        Err(_) => return Err(ExtractError::Pdf("parser panicked".to_string())),
    };
    let doc = decrypt_if_needed(doc)?;

    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|&page_num| page_text(&doc, page_num))
        .collect();
    debug!(pages = pages.len(), "[EXTRACT] pdf pages extracted");

    Ok(pages.join("\n"))
}

fn decrypt_if_needed(mut doc: Document) -> Result<Document, ExtractError> {
    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| ExtractError::Pdf(format!("encrypted document: {}", e)))?;
    }
    Ok(doc)
}

fn page_text(doc: &Document, page_num: u32) -> String {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut raw = String::new();
        {
            let mut output = PlainTextOutput::new(&mut raw);
            pdf_extract::output_doc_page(doc, &mut output, page_num)?;
        }
        Ok::<_, OutputError>(raw)
    }));

    match result {
        Ok(Ok(raw)) => normalize_pdf_text(&raw),
        Ok(Err(e)) => {
            warn!(page = page_num, "[EXTRACT] pdf page skipped: {}", e);
            String::new()
        }
        Err(_) => {
            warn!(page = page_num, "[EXTRACT] pdf page skipped: parser panicked");
            String::new()
        }
    }
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("blank run regex"))
}

fn paragraph_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("paragraph gap regex"))
}

/// Clean common PDF encoding artifacts: typographic quotes and dashes become
/// ASCII, non-breaking spaces become spaces, space runs collapse, and more than
/// one blank line collapses to one. Line breaks are kept.
pub fn normalize_pdf_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\u{00A0}' => text.push(' '),
            '\u{2018}' | '\u{2019}' => text.push('\''),
            '\u{201C}' | '\u{201D}' => text.push('"'),
            '\u{2013}' => text.push('-'),
            '\u{2014}' => text.push_str("--"),
            _ => text.push(c),
        }
    }

    let text = blank_run_re().replace_all(&text, " ");
    let text = paragraph_gap_re().replace_all(&text, "\n\n");
    text.trim().to_string()
}
