//! Sentence-boundary text chunker.
//!
//! Combined input (typed text, extracted file contents and the link) can be
//! arbitrarily long. It is cut into pieces no longer than `max_chars`
//! characters, packing whole sentences greedily so that every chunk stays
//! readable on its own. A single sentence longer than the budget is kept
//! intact as an oversized chunk.

/// Sentence terminals: period, question mark, exclamation mark, Arabic question mark.
const SENTENCE_TERMINALS: [char; 4] = ['.', '?', '!', '؟'];

/// Separator placed between sentences packed into the same chunk.
pub const SENTENCE_SEPARATOR: &str = " ";

/// Split text after sentence-terminal punctuation that is followed by whitespace.
///
/// Returned sentences are trimmed; empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !SENTENCE_TERMINALS.contains(&ch) {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                push_sentence(&mut sentences, &text[start..next_idx]);
                start = next_idx;
            }
        }
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        sentences.push(piece);
    }
}

/// Split text into ordered chunks of at most `max_chars` characters.
///
/// Blank input yields no chunks. Input that already fits is returned trimmed
/// as a single chunk.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.chars().count() <= max_chars {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(trimmed) {
        let len = sentence.chars().count();
        let would_be = if current.is_empty() {
            len
        } else {
            current_len + SENTENCE_SEPARATOR.len() + len
        };

        if would_be > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str(SENTENCE_SEPARATOR);
            current_len += SENTENCE_SEPARATOR.len();
        }
        current.push_str(sentence);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
