//! Hierarchical summarizer: transcript in, protocol text out.
//!
//! ```text
//! transcript ≤ budget ──▶ generate(prompt, transcript) ──▶ protocol
//!
//! transcript > budget ──▶ chunk_paragraphs ──▶ part 1 … part n   (sequential)
//!                                                 │
//!                              n == 1 ────────────┴──▶ protocol
//!                              n  > 1 ──▶ join_partials ──▶ consolidate ──▶ protocol
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cancel::or_cancel;
use crate::config::SummaryConfig;
use crate::llm::chunker::chunk_paragraphs;
use crate::llm::client::{LlmError, TextGenerator};
use crate::llm::prompt::PromptBuilder;
use crate::pipeline::{ProgressReporter, Stage};

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    max_input_chars: usize,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, max_input_chars: usize) -> Self {
        Self {
            generator,
            max_input_chars: max_input_chars.max(1),
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &SummaryConfig) -> Self {
        Self::new(generator, config.max_input_chars)
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Produce a protocol for `transcript` following `prompt`.
    pub async fn summarize(
        &self,
        transcript: &str,
        prompt: &str,
        progress: &ProgressReporter<'_>,
    ) -> Result<String, LlmError> {
        self.summarize_with_cancel(transcript, prompt, progress, &CancellationToken::new())
            .await
    }

    pub async fn summarize_with_cancel(
        &self,
        transcript: &str,
        prompt: &str,
        progress: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let prompts = PromptBuilder::new(prompt);
        let length = transcript.chars().count();

        if length <= self.max_input_chars {
            log::info!("summary: single request ({length} chars)");
            progress.stage(Stage::Summarizing, 0, 1, Stage::Summarizing.label());
            return self.call(prompts.instruction(), transcript, cancel).await;
        }

        let chunks = chunk_paragraphs(transcript, self.max_input_chars);
        let parts = chunks.len();
        if parts == 0 {
            // Nothing but whitespace: no paragraph to split on.
            log::info!("summary: blank transcript of {length} chars, single request");
            progress.stage(Stage::Summarizing, 0, 1, Stage::Summarizing.label());
            return self.call(prompts.instruction(), transcript, cancel).await;
        }
        // One extra step for the consolidation request.
        let steps = if parts > 1 { parts + 1 } else { parts };
        log::info!(
            "summary: {length} chars exceed the {} char budget, splitting into {parts} part(s)",
            self.max_input_chars
        );

        let mut partials = Vec::with_capacity(parts);
        for chunk in &chunks {
            let k = chunk.index + 1;
            progress.stage(
                Stage::Summarizing,
                chunk.index,
                steps,
                format!("Generating protocol part {k} of {parts}"),
            );
            let instruction = prompts.part_instruction(k, parts);
            let partial = self.call(&instruction, &chunk.text, cancel).await?;
            log::info!("summary: part {k}/{parts} done ({} chars)", partial.len());
            partials.push(partial);
        }

        if partials.len() == 1 {
            return Ok(partials.remove(0));
        }

        progress.stage(Stage::Summarizing, parts, steps, "Consolidating protocol");
        let merged = PromptBuilder::join_partials(&partials);
        self.call(&prompts.consolidation_instruction(parts), &merged, cancel)
            .await
    }

    async fn call(
        &self,
        instruction: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        or_cancel(cancel, self.generator.generate(instruction, content))
            .await
            .ok_or(LlmError::Cancelled)?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::llm::client::ScriptedGenerator;
    use crate::pipeline::progress::tests::CollectingSink;

    const MAX: usize = 100;

    fn setup(script: Vec<Result<String, LlmError>>) -> (Summarizer, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(script));
        (Summarizer::new(generator.clone(), MAX), generator)
    }

    /// Three 60-char paragraphs; no two fit together under `MAX`.
    fn three_part_transcript() -> String {
        ["a".repeat(60), "b".repeat(60), "c".repeat(60)].join("\n\n")
    }

    #[tokio::test]
    async fn under_budget_is_one_verbatim_call() {
        let (summarizer, generator) = setup(vec![Ok("  raw protocol \n".into())]);
        let sink = CollectingSink::default();
        let progress = ProgressReporter::new(&sink);
        let transcript = "x".repeat(MAX - 1);

        let out = summarizer
            .summarize(&transcript, "Write minutes.", &progress)
            .await
            .unwrap();

        assert_eq!(out, "  raw protocol \n");
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "Write minutes.");
        assert_eq!(requests[0].1, transcript);
    }

    #[tokio::test]
    async fn exactly_at_budget_is_still_one_call() {
        let (summarizer, generator) = setup(vec![]);
        let progress = ProgressReporter::new(&crate::pipeline::NoProgress);

        summarizer
            .summarize(&"x".repeat(MAX), "p", &progress)
            .await
            .unwrap();

        assert_eq!(generator.requests().len(), 1);
    }

    #[tokio::test]
    async fn three_parts_then_consolidation() {
        let (summarizer, generator) = setup(vec![
            Ok("partial A".into()),
            Ok("partial B".into()),
            Ok("partial C".into()),
            Ok("final protocol".into()),
        ]);
        let sink = CollectingSink::default();
        let progress = ProgressReporter::new(&sink);

        let out = summarizer
            .summarize(&three_part_transcript(), "Write minutes.", &progress)
            .await
            .unwrap();

        assert_eq!(out, "final protocol");
        let requests = generator.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].0.contains("part 1 of 3"));
        assert_eq!(requests[0].1, "a".repeat(60));
        assert!(requests[2].0.contains("part 3 of 3"));

        let (instruction, content) = &requests[3];
        assert!(instruction.contains("3 partial protocols"));
        assert!(instruction.ends_with("Write minutes."));
        let a = content.find("partial A").unwrap();
        let b = content.find("partial B").unwrap();
        let c = content.find("partial C").unwrap();
        assert!(a < b && b < c);
        assert!(content.contains("=== PART 2 OF 3 ==="));

        assert_eq!(sink.percents(), vec![90, 92, 95, 97]);
    }

    #[tokio::test]
    async fn single_oversized_paragraph_skips_consolidation() {
        let (summarizer, generator) = setup(vec![Ok("only part".into())]);
        let progress = ProgressReporter::new(&crate::pipeline::NoProgress);

        let out = summarizer
            .summarize(&"z".repeat(MAX * 2), "p", &progress)
            .await
            .unwrap();

        assert_eq!(out, "only part");
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].0.contains("part 1 of 1"));
    }

    #[tokio::test]
    async fn blank_transcript_over_budget_is_one_verbatim_call() {
        let (summarizer, generator) = setup(vec![Ok("nothing discussed".into())]);
        let progress = ProgressReporter::new(&crate::pipeline::NoProgress);
        let transcript = " \n\n\t".repeat(MAX);

        let out = summarizer
            .summarize(&transcript, "Write minutes.", &progress)
            .await
            .unwrap();

        assert_eq!(out, "nothing discussed");
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "Write minutes.");
        assert_eq!(requests[0].1, transcript);
    }

    #[tokio::test]
    async fn part_failure_aborts_without_consolidation() {
        let (summarizer, generator) = setup(vec![
            Ok("partial A".into()),
            Err(LlmError::Api {
                status: 500,
                message: "overloaded".into(),
            }),
        ]);
        let progress = ProgressReporter::new(&crate::pipeline::NoProgress);

        let err = summarizer
            .summarize(&three_part_transcript(), "p", &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 500, .. }));
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_makes_no_request() {
        let (summarizer, generator) = setup(vec![]);
        let progress = ProgressReporter::new(&crate::pipeline::NoProgress);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = summarizer
            .summarize_with_cancel("short", "p", &progress, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Cancelled));
        assert!(generator.requests().is_empty());
    }
}
