//! # yuvview core
//!
//! Turns raw interlaced YUV 4:2:0 frame dumps (PGM-packed, as written by
//! mpeg2dec) into displayable RGB frames, optionally deinterlaced.
//!
//! ```text
//! bytes ─► pgm_yuv ─► YuvFrame ─► pixel_convert / deinterlace ─► RgbFrame(s)
//!                                         ▲
//!                              sequencer (previous frame, field order)
//! ```

// ============================================================================
// Frames & Containers
// ============================================================================
pub mod frame;
pub mod pgm_yuv;
pub mod output;

// ============================================================================
// Processing
// ============================================================================
pub mod pixel_convert;
pub mod deinterlace;
pub mod sequencer;

pub use deinterlace::{deinterlace_adaptive, deinterlace_bob, DeinterlaceMode, Parity};
pub use frame::{RgbFrame, YuvFrame};
pub use pgm_yuv::{decode_file, decode_frame, FormatError};
pub use pixel_convert::to_rgb;
pub use sequencer::{FieldOutput, FileSource, FrameSource, SequenceError, Sequencer, SequencerConfig};

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
