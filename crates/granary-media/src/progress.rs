//! Monotonic progress mapping
//!
//! Progress is derived from the current stage and an optional `(i, n)` work
//! tuple, never stored. A clamp filters out any computed value lower than
//! the last reported one; unknown stages keep the last value.

/// Stage labels written to the document row
pub mod stages {
    pub const DOWNLOADING: &str = "downloading";
    pub const CLASSIFYING: &str = "classifying";
    pub const EXTRACTING: &str = "extracting";
    pub const DESCRIBING_IMAGE: &str = "describing_image";
    pub const TRANSCRIBING_AUDIO: &str = "transcribing_audio";
    pub const TRANSCRIBING_VIDEO: &str = "transcribing_video";
    pub const GENERATING_EMBEDDINGS: &str = "generating_embeddings";
    pub const STORING: &str = "storing";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";

    /// Per-chunk stage label (`processing_chunk_{i}_of_{n}`)
    pub fn processing_chunk(i: usize, n: usize) -> String {
        format!("processing_chunk_{i}_of_{n}")
    }
}

/// Base percent and band width for a stage
#[derive(Debug, Clone, Copy)]
struct Anchor {
    base: u8,
    band: u8,
}

fn anchor_for(stage: &str) -> Option<Anchor> {
    match stage {
        stages::DOWNLOADING => Some(Anchor { base: 5, band: 0 }),
        stages::CLASSIFYING => Some(Anchor { base: 8, band: 0 }),
        stages::EXTRACTING => Some(Anchor { base: 10, band: 60 }),
        stages::DESCRIBING_IMAGE => Some(Anchor { base: 20, band: 50 }),
        stages::TRANSCRIBING_AUDIO => Some(Anchor { base: 20, band: 50 }),
        stages::TRANSCRIBING_VIDEO => Some(Anchor { base: 15, band: 75 }),
        stages::GENERATING_EMBEDDINGS => Some(Anchor { base: 70, band: 20 }),
        stages::STORING => Some(Anchor { base: 95, band: 0 }),
        stages::COMPLETED => Some(Anchor { base: 100, band: 0 }),
        _ => {
            if stage.starts_with("processing_chunk_") {
                Some(Anchor { base: 15, band: 75 })
            } else {
                None
            }
        }
    }
}

/// Monotonic progress tracker for one job
#[derive(Debug)]
pub struct Progress {
    percent: u8,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Start at zero percent
    pub const fn new() -> Self {
        Self { percent: 0 }
    }

    /// Current percent
    pub const fn percent(&self) -> u8 {
        self.percent
    }

    /// Report a stage transition, optionally with `(done, total)` work
    ///
    /// Chunked work interpolates linearly within the stage's band, rounded
    /// to integer percent. Values lower than the last report are clamped;
    /// unknown stages keep the previous percent.
    pub fn report(&mut self, stage: &str, work: Option<(usize, usize)>) -> u8 {
        let Some(anchor) = anchor_for(stage) else {
            tracing::debug!(stage, "Unknown progress stage, keeping previous percent");
            return self.percent;
        };

        let computed = match work {
            Some((done, total)) if total > 0 => {
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let interpolated = f64::from(anchor.base)
                    + f64::from(anchor.band) * (done.min(total) as f64 / total as f64);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rounded = interpolated.round() as u8;
                rounded
            }
            _ => anchor.base,
        };

        if computed > self.percent {
            self.percent = computed.min(100);
        }
        self.percent
    }

    /// The single reset to zero on the `failed` transition
    pub const fn fail(&mut self) -> u8 {
        self.percent = 0;
        0
    }
}
