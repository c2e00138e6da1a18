//! Prompt construction for protocol generation.
//!
//! [`PromptBuilder`] wraps the user's protocol instruction and derives the
//! two extra prompts the hierarchical summarizer needs:
//! * a **part** prompt ("this is part k of n, summarize only this section"),
//! * a **consolidation** prompt that merges the partial protocols.

/// Default protocol instruction.
pub const DEFAULT_PROMPT: &str = "\
You are an experienced minute taker. Turn the following meeting transcript \
into a structured meeting protocol.

Structure:
1. Topic and date (if mentioned)
2. Participants (if mentioned)
3. Summary of the discussion, grouped by agenda item
4. Decisions
5. Action items with owner and due date (if mentioned)
6. Open questions

Write concisely and factually. Do not invent information that is not in the transcript.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds part and consolidation instructions from a protocol template.
///
/// # Example
/// ```rust
/// use meeting_protocol::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new("Write minutes.");
/// let part = builder.part_instruction(2, 3);
/// assert!(part.starts_with("Write minutes."));
/// assert!(part.contains("part 2 of 3"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new(template: &str) -> Self {
        let template = if template.trim().is_empty() {
            DEFAULT_PROMPT
        } else {
            template
        };
        Self {
            template: template.to_string(),
        }
    }

    /// Instruction for a transcript that fits in one request.
    pub fn instruction(&self) -> &str {
        &self.template
    }

    /// Instruction for section `part` (1-based) of `total`.
    pub fn part_instruction(&self, part: usize, total: usize) -> String {
        format!(
            "{}\n\nNOTE: The transcript was split because of its length. This is part \
             {part} of {total}. Create a partial protocol for this section only. Do not \
             add an introduction or a closing summary for the whole meeting.",
            self.template
        )
    }

    /// Instruction for merging `total` partial protocols into one document.
    pub fn consolidation_instruction(&self, total: usize) -> String {
        format!(
            "You receive {total} partial protocols of one meeting, each created from a \
             consecutive section of the transcript and separated by section markers. \
             Merge them into a single coherent protocol. Remove repetitions, resolve \
             formatting inconsistencies and drop the section markers. Do not add \
             information that is not in the partial protocols.\n\n\
             The final protocol must follow these instructions:\n{}",
            self.template
        )
    }

    /// Concatenate partial protocols, each preceded by a section marker.
    pub fn join_partials(partials: &[String]) -> String {
        let total = partials.len();
        partials
            .iter()
            .enumerate()
            .map(|(i, text)| format!("=== PART {} OF {total} ===\n\n{}", i + 1, text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
