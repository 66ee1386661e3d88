//! # Field Sequencer
//!
//! Pull-based driver that turns a list of frame dumps into the ordered
//! stream of RGB pictures a display or writer consumes:
//!
//! ```text
//! progressive:  f0  f1  f2  ...  f0  f1  (wraps)
//! bob/adaptive: f0.top f0.bottom f1.top f1.bottom ...
//! ```
//!
//! The previous frame used by the adaptive strategy is replaced only after
//! both fields of a frame have been handed out, so frame N is always scored
//! against the complete frame N-1. Wrapping back to the first source index
//! drops it, and the first frame after a wrap is treated like the very
//! first frame.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deinterlace::{
    deinterlace_adaptive, deinterlace_bob, DeinterlaceMode, Parity, DEFAULT_BLOCK_SIZE,
    DEFAULT_THRESHOLD,
};
use crate::frame::{RgbFrame, YuvFrame};
use crate::pgm_yuv::{decode_file, decode_frame, FormatError};
use crate::pixel_convert::to_rgb;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Error decoding {label}: {source}")]
    Format {
        index: usize,
        label: String,
        #[source]
        source: FormatError,
    },
    #[error("No frames to play")]
    EmptySource,
}

// ============================================================================
// Frame Sources
// ============================================================================

/// Indexed supply of frame dumps
pub trait FrameSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of an entry (file path, ...)
    fn label(&self, index: usize) -> String;

    /// Decode entry `index`. Called once per source frame per pass.
    fn load(&mut self, index: usize) -> Result<YuvFrame, FormatError>;
}

/// Frame dumps on disk, read on demand
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for FileSource {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn label(&self, index: usize) -> String {
        self.paths[index].display().to_string()
    }

    fn load(&mut self, index: usize) -> Result<YuvFrame, FormatError> {
        decode_file(&self.paths[index])
    }
}

/// Frame dumps already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<Vec<u8>>,
}

impl MemorySource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.frames.push(data);
    }
}

impl FrameSource for MemorySource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn label(&self, index: usize) -> String {
        format!("frame {}", index)
    }

    fn load(&mut self, index: usize) -> Result<YuvFrame, FormatError> {
        decode_frame(&self.frames[index])
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub mode: DeinterlaceMode,
    /// SAD above which an adaptive block counts as moving
    pub threshold: u64,
    /// Adaptive block edge length in field pixels
    pub block_size: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            mode: DeinterlaceMode::Progressive,
            threshold: DEFAULT_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// One picture handed to the consumer
#[derive(Debug, Clone)]
pub struct FieldOutput {
    pub frame: RgbFrame,
    /// Source index the picture came from
    pub index: usize,
    /// Field shown, `None` in progressive mode
    pub field: Option<Parity>,
}

enum Step {
    AwaitingFrame,
    /// Top field returned; bottom waits together with its source frame.
    EmittingBottom { frame: YuvFrame, bottom: RgbFrame },
}

pub struct Sequencer<S: FrameSource> {
    source: S,
    config: SequencerConfig,
    index: usize,
    step: Step,
    previous: Option<YuvFrame>,
}

impl<S: FrameSource> Sequencer<S> {
    pub fn new(source: S, config: SequencerConfig) -> Self {
        Self {
            source,
            config,
            index: 0,
            step: Step::AwaitingFrame,
            previous: None,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Source index of the next frame to decode (or being emitted)
    pub fn position(&self) -> usize {
        self.index
    }

    /// 0 before a frame's first field, 1 while its second field is pending
    pub fn field_index(&self) -> usize {
        match self.step {
            Step::AwaitingFrame => 0,
            Step::EmittingBottom { .. } => 1,
        }
    }

    /// Reference the adaptive strategy compares the next frame against
    pub fn previous(&self) -> Option<&YuvFrame> {
        self.previous.as_ref()
    }

    /// Restart at the first source frame with no temporal history.
    pub fn reset(&mut self) {
        self.index = 0;
        self.step = Step::AwaitingFrame;
        self.previous = None;
    }

    /// Produce the next picture.
    ///
    /// A frame that fails to decode is reported and skipped: the next call
    /// continues with the following source index.
    pub fn next(&mut self) -> Result<FieldOutput, SequenceError> {
        if self.source.is_empty() {
            return Err(SequenceError::EmptySource);
        }

        if let Step::EmittingBottom { frame, bottom } =
            std::mem::replace(&mut self.step, Step::AwaitingFrame)
        {
            let index = self.index;
            self.index += 1;
            self.previous = Some(frame);
            return Ok(FieldOutput {
                frame: bottom,
                index,
                field: Some(Parity::Bottom),
            });
        }

        if self.index >= self.source.len() {
            tracing::info!("Reached end of {} frames, restarting", self.source.len());
            self.index = 0;
            self.previous = None;
        }

        let index = self.index;
        let frame = match self.source.load(index) {
            Ok(frame) => frame,
            Err(source) => {
                let label = self.source.label(index);
                tracing::warn!("Skipping {}: {}", label, source);
                self.index += 1;
                return Err(SequenceError::Format {
                    index,
                    label,
                    source,
                });
            }
        };

        let (top, bottom) = match self.config.mode {
            DeinterlaceMode::Progressive => {
                let rgb = to_rgb(&frame);
                self.index += 1;
                self.previous = Some(frame);
                return Ok(FieldOutput {
                    frame: rgb,
                    index,
                    field: None,
                });
            }
            DeinterlaceMode::Bob => deinterlace_bob(&frame),
            DeinterlaceMode::Adaptive => deinterlace_adaptive(
                &frame,
                self.previous.as_ref(),
                self.config.threshold,
                self.config.block_size,
            ),
        };

        self.step = Step::EmittingBottom { frame, bottom };
        Ok(FieldOutput {
            frame: top,
            index,
            field: Some(Parity::Top),
        })
    }
}
