//! The read-only text of one chapter as the resolver sees it.
//!
//! Offsets are counted in `char`s, never bytes, so that positions coming from
//! the renderer (one glyph per char) line up with the paragraph text.

use std::ops::Range;

/// A caret position inside a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPosition {
    pub paragraph: usize,
    pub offset: usize,
}

impl TextPosition {
    pub const fn new(paragraph: usize, offset: usize) -> Self {
        Self { paragraph, offset }
    }
}

/// A normalized range between two positions, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub fn new(a: TextPosition, b: TextPosition) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn within_paragraph(paragraph: usize, range: Range<usize>) -> Self {
        Self::new(
            TextPosition::new(paragraph, range.start),
            TextPosition::new(paragraph, range.end),
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// True when the char at `position` lies inside the range.
    pub fn contains(&self, position: TextPosition) -> bool {
        self.start <= position && position < self.end
    }
}

/// A maximal run of non-whitespace characters, `[start, end)` in chars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Clone, Debug)]
pub struct SurfaceParagraph {
    text: String,
    chars: Vec<char>,
    tokens: Vec<TokenSpan>,
}

impl SurfaceParagraph {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let chars: Vec<char> = text.chars().collect();
        let tokens = tokenize(&chars);
        Self {
            text,
            chars,
            tokens,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_len(&self) -> usize {
        self.chars.len()
    }

    pub fn tokens(&self) -> &[TokenSpan] {
        &self.tokens
    }

    pub fn token_at(&self, offset: usize) -> Option<&TokenSpan> {
        self.tokens.iter().find(|token| token.contains(offset))
    }

    pub fn slice(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        self.chars[start..end].iter().collect()
    }
}

fn tokenize(chars: &[char]) -> Vec<TokenSpan> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, ch) in chars.iter().enumerate() {
        match (ch.is_whitespace(), start) {
            (false, None) => start = Some(idx),
            (true, Some(begin)) => {
                tokens.push(TokenSpan {
                    start: begin,
                    end: idx,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push(TokenSpan {
            start: begin,
            end: chars.len(),
        });
    }
    tokens
}

/// Ordered paragraphs of a displayed chapter. Built once per chapter and never
/// mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct TextSurface {
    paragraphs: Vec<SurfaceParagraph>,
}

impl TextSurface {
    pub fn new<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs.into_iter().map(SurfaceParagraph::new).collect(),
        }
    }

    pub fn paragraphs(&self) -> &[SurfaceParagraph] {
        &self.paragraphs
    }

    pub fn paragraph(&self, index: usize) -> Option<&SurfaceParagraph> {
        self.paragraphs.get(index)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn contains(&self, position: TextPosition) -> bool {
        self.paragraph(position.paragraph)
            .is_some_and(|paragraph| position.offset <= paragraph.char_len())
    }

    fn char_at(&self, position: TextPosition) -> Option<char> {
        self.paragraph(position.paragraph)?
            .chars()
            .get(position.offset)
            .copied()
    }

    /// Plain text covered by `range`. Paragraph boundaries become `'\n'`.
    pub fn text_in_range(&self, range: TextRange) -> String {
        let mut text = String::new();
        let last = range.end.paragraph.min(self.paragraphs.len().saturating_sub(1));
        for index in range.start.paragraph..=last {
            let Some(paragraph) = self.paragraph(index) else {
                break;
            };
            if index > range.start.paragraph {
                text.push('\n');
            }
            let from = if index == range.start.paragraph {
                range.start.offset
            } else {
                0
            };
            let to = if index == range.end.paragraph {
                range.end.offset
            } else {
                paragraph.char_len()
            };
            text.push_str(&paragraph.slice(from..to));
        }
        text
    }

    /// Shrinks `range` past surrounding whitespace and paragraph breaks.
    /// Returns `None` when nothing but whitespace is covered.
    pub fn trim_range(&self, range: TextRange) -> Option<TextRange> {
        let mut start = range.start;
        let mut end = range.end;

        while start < end {
            let paragraph = self.paragraph(start.paragraph)?;
            if start.offset >= paragraph.char_len() {
                start = TextPosition::new(start.paragraph + 1, 0);
                continue;
            }
            match self.char_at(start) {
                Some(ch) if ch.is_whitespace() => start.offset += 1,
                _ => break,
            }
        }

        while start < end {
            if end.offset == 0 {
                let previous = end.paragraph.checked_sub(1)?;
                let len = self.paragraph(previous)?.char_len();
                end = TextPosition::new(previous, len);
                continue;
            }
            let before = TextPosition::new(end.paragraph, end.offset - 1);
            match self.char_at(before) {
                Some(ch) if ch.is_whitespace() => end = before,
                _ => break,
            }
        }

        if start < end {
            Some(TextRange { start, end })
        } else {
            None
        }
    }
}
