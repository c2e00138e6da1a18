//! Pipeline stages and their fixed progress bands.

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Stage of a single pipeline run.
///
/// Every stage owns a fixed slice of the 0–100 % progress range, so the
/// overall percentage keeps rising even though each stage advances on its
/// own schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Splitting the recording into upload-sized chunks.
    Segmenting,
    /// Sending chunks to the transcription endpoint.
    Transcribing,
    /// Assembling the transcript and generating the protocol.
    Summarizing,
    /// Protocol ready.
    Done,
}

impl Stage {
    /// `(start, end)` percentages reserved for this stage.
    ///
    /// ```
    /// use meeting_protocol::pipeline::Stage;
    ///
    /// assert_eq!(Stage::Segmenting.band(), (0, 12));
    /// assert_eq!(Stage::Transcribing.band(), (12, 90));
    /// assert_eq!(Stage::Summarizing.band(), (90, 100));
    /// ```
    pub fn band(&self) -> (u8, u8) {
        match self {
            Stage::Segmenting => (0, 12),
            Stage::Transcribing => (12, 90),
            Stage::Summarizing => (90, 100),
            Stage::Done => (100, 100),
        }
    }

    /// Percentage for `done` of `total` units of work inside this stage.
    ///
    /// `total == 0` maps to the start of the band.
    pub fn percent_at(&self, done: usize, total: usize) -> u8 {
        let (start, end) = self.band();
        if total == 0 {
            return start;
        }
        let done = done.min(total);
        let span = usize::from(end - start);
        // Bounded by `end`, so the cast back to u8 cannot truncate.
        (usize::from(start) + span * done / total) as u8
    }

    /// A short human-readable label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Segmenting => "Preparing audio",
            Stage::Transcribing => "Transcribing",
            Stage::Summarizing => "Generating protocol",
            Stage::Done => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
