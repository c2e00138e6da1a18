//! Paragraph-aligned text chunking.
//!
//! A transcript is split on blank lines and paragraphs are packed greedily
//! into chunks of at most `max_chars` characters. A paragraph is never split;
//! one that alone exceeds the budget becomes its own oversized chunk.

/// Paragraph separator inside a chunk.
const PARAGRAPH_SEP: &str = "\n\n";

/// One slice of a transcript, sent in a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into paragraphs separated by one or more blank lines.
///
/// Whitespace-only lines count as blank; `\r\n` line endings are accepted.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

/// Greedily pack paragraphs into chunks of at most `max_chars` characters.
pub fn chunk_paragraphs(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let sep_len = PARAGRAPH_SEP.chars().count();
    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for para in paragraphs(text) {
        let para_len = para.chars().count();
        let joined_len = if current.is_empty() {
            para_len
        } else {
            current_len + sep_len + para_len
        };

        if !current.is_empty() && joined_len > max_chars {
            chunks.push(TextChunk {
                index: chunks.len(),
                text: std::mem::take(&mut current),
            });
            current_len = 0;
        }

        if current.is_empty() {
            if para_len > max_chars {
                log::warn!(
                    "summary: paragraph of {para_len} chars exceeds the {max_chars} char budget, \
                     sending it unsplit"
                );
            }
            current = para;
            current_len = para_len;
        } else {
            current.push_str(PARAGRAPH_SEP);
            current.push_str(&para);
            current_len += sep_len + para_len;
        }
    }

    if !current.is_empty() {
        chunks.push(TextChunk {
            index: chunks.len(),
            text: current,
        });
    }
    chunks
}
