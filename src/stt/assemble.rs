//! Transcript fragments and their assembly into one document.

/// Text produced for one media chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    /// Index of the chunk this text came from.
    pub chunk_index: usize,
    pub text: String,
}

/// Join fragment texts in the order given, separated by one space.
///
/// No attempt is made to repair a sentence that was cut at a chunk
/// boundary.
///
/// ```
/// use meeting_protocol::stt::{assemble, TranscriptFragment};
///
/// let parts = vec![
///     TranscriptFragment { chunk_index: 0, text: "Good morning.".into() },
///     TranscriptFragment { chunk_index: 1, text: "Let's start.".into() },
/// ];
/// assert_eq!(assemble(&parts), "Good morning. Let's start.");
/// ```
pub fn assemble(fragments: &[TranscriptFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(chunk_index: usize, text: &str) -> TranscriptFragment {
        TranscriptFragment {
            chunk_index,
            text: text.into(),
        }
    }

    #[test]
    fn joins_with_single_spaces() {
        let parts = [frag(0, "A"), frag(1, "B"), frag(2, "C")];
        assert_eq!(assemble(&parts), "A B C");
    }

    #[test]
    fn order_of_input_is_preserved() {
        let forward = [frag(0, "A"), frag(1, "B"), frag(2, "C")];
        let shuffled = [frag(2, "C"), frag(0, "A"), frag(1, "B")];
        assert_eq!(assemble(&shuffled), "C A B");
        assert_ne!(assemble(&forward), assemble(&shuffled));
    }

    #[test]
    fn split_words_are_not_repaired() {
        let parts = [frag(0, "the bud"), frag(1, "get is approved")];
        assert_eq!(assemble(&parts), "the bud get is approved");
    }

    #[test]
    fn edge_cases() {
        assert_eq!(assemble(&[]), "");
        assert_eq!(assemble(&[frag(0, "only")]), "only");
    }
}
