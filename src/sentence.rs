//! Sentence and word boundary scanning over a paragraph's chars.

use std::ops::Range;

/// Two-char sequences that close a sentence when looking backwards.
const SENTENCE_BREAKS: [[char; 2]; 3] = [['.', ' '], ['!', ' '], ['?', ' ']];

/// Spanish inverted marks always open a new clause.
const SENTENCE_OPENERS: [char; 2] = ['¿', '¡'];

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Marks stripped from both ends of a tapped token.
pub const DEFAULT_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '¡', '?', '¿', '"', '\'', '«', '»', '“', '”', '‘', '’', '—', '–',
    '-', '…', '(', ')', '[', ']',
];

/// Returns the sentence around `offset`, trimmed of surrounding whitespace.
pub fn extract_sentence(chars: &[char], offset: usize) -> String {
    let bounds = sentence_bounds(chars, offset);
    let sentence: String = chars[bounds].iter().collect();
    sentence.trim().to_string()
}

/// Untrimmed sentence bounds around `offset`.
pub fn sentence_bounds(chars: &[char], offset: usize) -> Range<usize> {
    let offset = offset.min(chars.len());
    sentence_start(chars, offset)..sentence_end(chars, offset)
}

fn sentence_start(chars: &[char], offset: usize) -> usize {
    let after_break = chars[..offset]
        .windows(2)
        .rposition(|pair| SENTENCE_BREAKS.iter().any(|brk| pair == brk))
        .map(|idx| idx + 1);
    let opener = chars[..offset]
        .iter()
        .rposition(|ch| SENTENCE_OPENERS.contains(ch));
    after_break.max(opener).unwrap_or(0)
}

fn sentence_end(chars: &[char], offset: usize) -> usize {
    (offset..chars.len())
        .find(|&idx| {
            SENTENCE_TERMINATORS.contains(&chars[idx])
                && chars.get(idx + 1).is_none_or(|next| next.is_whitespace())
        })
        .map(|idx| idx + 1)
        .unwrap_or(chars.len())
}

/// Maximal non-whitespace run touching `offset`.
///
/// A caret sitting right after a word (on the following space) still picks
/// that word, the same way a caret between two glyphs belongs to both.
pub fn token_bounds(chars: &[char], offset: usize) -> Range<usize> {
    let offset = offset.min(chars.len());
    let mut start = offset;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    let mut end = offset;
    while end < chars.len() && !chars[end].is_whitespace() {
        end += 1;
    }
    start..end
}

/// Narrows `range` past leading and trailing `punctuation`.
pub fn strip_punctuation(chars: &[char], range: Range<usize>, punctuation: &[char]) -> Range<usize> {
    let mut start = range.start;
    let mut end = range.end.min(chars.len());
    while start < end && punctuation.contains(&chars[start]) {
        start += 1;
    }
    while end > start && punctuation.contains(&chars[end - 1]) {
        end -= 1;
    }
    start..end
}

/// True when `text` has at least one letter or digit not listed in
/// `punctuation`.
pub fn has_content(text: &str, punctuation: &[char]) -> bool {
    text.chars()
        .any(|ch| ch.is_alphanumeric() && !punctuation.contains(&ch))
}
