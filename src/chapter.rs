//! Chapters as plain paragraphs, loaded from JSON or from FTML/Markdown.

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tdoc::{Document, ParagraphType, markdown};

use crate::error::ChapterError;
use crate::surface::TextSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChapterFormat {
    Json,
    Markdown,
    Ftml,
}

impl ChapterFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => ChapterFormat::Json,
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                ChapterFormat::Markdown
            }
            _ => ChapterFormat::Ftml,
        }
    }
}

#[derive(Deserialize)]
struct ChapterFile {
    #[serde(default)]
    title: Option<String>,
    paragraphs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub paragraphs: Vec<String>,
}

impl Chapter {
    pub fn load(path: &Path) -> Result<Self, ChapterError> {
        let content = fs::read_to_string(path).map_err(|source| ChapterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback_title = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();

        let chapter = match ChapterFormat::from_path(path) {
            ChapterFormat::Json => Self::from_json(&content, fallback_title).map_err(|source| {
                ChapterError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            ChapterFormat::Markdown => {
                let document = markdown::parse(Cursor::new(content)).map_err(|err| {
                    ChapterError::Document {
                        path: path.to_path_buf(),
                        message: err.to_string(),
                    }
                })?;
                Self::from_document(&document, fallback_title)
            }
            ChapterFormat::Ftml => {
                let document =
                    tdoc::parse(Cursor::new(content)).map_err(|err| ChapterError::Document {
                        path: path.to_path_buf(),
                        message: err.to_string(),
                    })?;
                Self::from_document(&document, fallback_title)
            }
        };

        if chapter.paragraphs.is_empty() {
            return Err(ChapterError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(chapter)
    }

    pub fn from_json(content: &str, fallback_title: &str) -> Result<Self, serde_json::Error> {
        let file: ChapterFile = serde_json::from_str(content)?;
        Ok(Self {
            title: file
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| fallback_title.to_string()),
            paragraphs: file
                .paragraphs
                .iter()
                .filter_map(|text| normalize_paragraph(text))
                .collect(),
        })
    }

    /// Flattens a document into paragraphs. The first heading becomes the
    /// title; later headings stay in the text.
    pub fn from_document(document: &Document, fallback_title: &str) -> Self {
        let mut title = None;
        let mut paragraphs = Vec::new();
        for paragraph in &document.paragraphs {
            collect_paragraph(paragraph, &mut title, &mut paragraphs);
        }
        Self {
            title: title.unwrap_or_else(|| fallback_title.to_string()),
            paragraphs,
        }
    }

    pub fn surface(&self) -> TextSurface {
        TextSurface::new(self.paragraphs.iter().cloned())
    }
}

fn collect_paragraph(
    paragraph: &tdoc::Paragraph,
    title: &mut Option<String>,
    out: &mut Vec<String>,
) {
    let is_heading = matches!(
        paragraph.paragraph_type(),
        ParagraphType::Header1 | ParagraphType::Header2 | ParagraphType::Header3
    );
    if let Some(text) = normalize_paragraph(&spans_text(paragraph.content())) {
        if is_heading && title.is_none() {
            *title = Some(text);
        } else {
            out.push(text);
        }
    }

    for child in paragraph.children() {
        collect_paragraph(child, title, out);
    }
    for entry in paragraph.entries() {
        for item in entry.iter() {
            collect_paragraph(item, title, out);
        }
    }
    for item in paragraph.checklist_items() {
        out.extend(normalize_paragraph(&spans_text(&item.content)));
        for nested in &item.children {
            out.extend(normalize_paragraph(&spans_text(&nested.content)));
        }
    }
}

fn spans_text(spans: &[tdoc::Span]) -> String {
    let mut text = String::new();
    for span in spans {
        text.push_str(&span.text);
        text.push_str(&spans_text(&span.children));
    }
    text
}

/// Soft line breaks become spaces; blank paragraphs are dropped.
fn normalize_paragraph(text: &str) -> Option<String> {
    let text: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The book being read: identity for the gloss service and persisted
/// position, plus its chapter files in reading order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub chapters: Vec<PathBuf>,
}

impl Book {
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn load_chapter(&self, index: usize) -> Option<Result<Chapter, ChapterError>> {
        self.chapters.get(index).map(|path| Chapter::load(path))
    }
}
