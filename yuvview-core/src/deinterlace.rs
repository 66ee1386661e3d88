//! CPU deinterlacing for planar YUV 4:2:0 frames.
//!
//! Every strategy turns one interlaced frame into a field pair: the top
//! field (even rows) and the bottom field (odd rows), each reconstructed
//! at full height and converted to RGB.
//!
//! - **Bob** doubles each field row.
//! - **Adaptive** scores luma motion against the previous frame per block
//!   and only bobs the blocks that move; static blocks keep the woven
//!   frame (both fields verbatim).

use serde::{Deserialize, Serialize};

use crate::frame::{Plane, RgbFrame, YuvFrame};
use crate::pixel_convert::to_rgb;

/// Default SAD threshold per block
pub const DEFAULT_THRESHOLD: u64 = 3000;
/// Default block edge length, in field pixels
pub const DEFAULT_BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeinterlaceMode {
    /// Convert the frame as-is, one output per frame
    #[default]
    Progressive,
    Bob,
    Adaptive,
}

impl DeinterlaceMode {
    /// Output frames per source frame
    pub fn outputs_per_frame(&self) -> usize {
        match self {
            Self::Progressive => 1,
            Self::Bob | Self::Adaptive => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Progressive => "progressive",
            Self::Bob => "bob",
            Self::Adaptive => "adaptive",
        }
    }
}

impl std::str::FromStr for DeinterlaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "progressive" | "none" => Ok(Self::Progressive),
            "bob" => Ok(Self::Bob),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("Unknown deinterlace mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Even rows, displayed first
    Top,
    /// Odd rows
    Bottom,
}

impl Parity {
    pub const BOTH: [Parity; 2] = [Parity::Top, Parity::Bottom];

    pub fn offset(&self) -> usize {
        match self {
            Self::Top => 0,
            Self::Bottom => 1,
        }
    }
}

/// Plane row that supplies output row `row` when doubling the field of
/// `parity`. Planes with an odd row count (4:2:0 chroma of a 6-line
/// picture, say) lack the last bottom-field row; the previous row of the
/// same parity is repeated instead.
fn field_source_row(row: usize, parity: Parity, plane_height: usize) -> usize {
    let src = (row & !1) + parity.offset();
    if src < plane_height {
        src
    } else if src >= 2 {
        src - 2
    } else {
        plane_height - 1
    }
}

// ============================================================================
// Bob
// ============================================================================

fn bob_plane(src: &[u8], width: usize, height: usize, parity: Parity) -> Vec<u8> {
    assert_eq!(src.len(), width * height, "plane size");
    let mut out = vec![0u8; width * height];

    for row in 0..height {
        let src_row = field_source_row(row, parity, height);
        out[row * width..(row + 1) * width]
            .copy_from_slice(&src[src_row * width..(src_row + 1) * width]);
    }

    out
}

/// One field of `frame`, row-doubled back to full height.
pub fn bob_field(frame: &YuvFrame, parity: Parity) -> YuvFrame {
    let [luma, chroma_u, chroma_v] = Plane::ALL.map(|plane| {
        let (w, h) = frame.plane_size(plane);
        bob_plane(frame.plane(plane), w, h, parity)
    });
    YuvFrame::from_planes(frame.width, frame.height, luma, chroma_u, chroma_v)
}

/// Line-doubling deinterlace. Returns (top, bottom).
pub fn deinterlace_bob(frame: &YuvFrame) -> (RgbFrame, RgbFrame) {
    (
        to_rgb(&bob_field(frame, Parity::Top)),
        to_rgb(&bob_field(frame, Parity::Bottom)),
    )
}

// ============================================================================
// Motion mask
// ============================================================================

/// Per-block reconstruction choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecision {
    /// Static: take both fields of the current frame verbatim
    Weave,
    /// Moving: row-double the field
    Bob,
}

/// Block-granular motion classification of one field parity.
///
/// Blocks tile the luma field (height/2 x width) from the top-left
/// corner. Partial blocks at the right and bottom edges are never scored
/// and always weave.
#[derive(Debug, Clone)]
pub struct MotionMask {
    parity: Parity,
    block_size: usize,
    field_width: usize,
    field_height: usize,
    blocks_x: usize,
    blocks_y: usize,
    sad: Vec<u64>,
    decisions: Vec<BlockDecision>,
}

impl MotionMask {
    /// Score every full block of the `parity` field; a block moves iff
    /// its sum of absolute luma differences is strictly above `threshold`.
    pub fn measure(
        curr: &YuvFrame,
        prev: &YuvFrame,
        parity: Parity,
        threshold: u64,
        block_size: usize,
    ) -> Self {
        assert!(curr.same_geometry(prev), "motion needs equal geometry");

        let width = curr.width;
        let field_height = curr.height / 2;
        let (blocks_x, blocks_y) = if block_size == 0 {
            (0, 0)
        } else {
            (width / block_size, field_height / block_size)
        };

        let mut sad = vec![0u64; blocks_x * blocks_y];

        for by in 0..blocks_y {
            for field_row in by * block_size..(by + 1) * block_size {
                let row = (field_row * 2 + parity.offset()) * width;
                for bx in 0..blocks_x {
                    let start = row + bx * block_size;
                    let end = start + block_size;
                    let block_sum: u64 = curr.luma[start..end]
                        .iter()
                        .zip(&prev.luma[start..end])
                        .map(|(&a, &b)| a.abs_diff(b) as u64)
                        .sum();
                    sad[by * blocks_x + bx] += block_sum;
                }
            }
        }

        let decisions = sad
            .iter()
            .map(|&s| {
                if s > threshold {
                    BlockDecision::Bob
                } else {
                    BlockDecision::Weave
                }
            })
            .collect();

        Self {
            parity,
            block_size,
            field_width: width,
            field_height,
            blocks_x,
            blocks_y,
            sad,
            decisions,
        }
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Scored blocks as (columns, rows)
    pub fn blocks(&self) -> (usize, usize) {
        (self.blocks_x, self.blocks_y)
    }

    pub fn block(&self, bx: usize, by: usize) -> BlockDecision {
        self.decisions[by * self.blocks_x + bx]
    }

    pub fn block_sad(&self, bx: usize, by: usize) -> u64 {
        self.sad[by * self.blocks_x + bx]
    }

    pub fn moving_blocks(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| **d == BlockDecision::Bob)
            .count()
    }

    /// Decision covering a pixel of the luma field.
    pub fn at_field_pixel(&self, field_row: usize, col: usize) -> BlockDecision {
        debug_assert!(field_row < self.field_height && col < self.field_width);
        if self.block_size == 0 {
            return BlockDecision::Weave;
        }
        let (bx, by) = (col / self.block_size, field_row / self.block_size);
        if bx >= self.blocks_x || by >= self.blocks_y {
            return BlockDecision::Weave;
        }
        self.block(bx, by)
    }

    /// Decision for a pixel of the full-height luma plane.
    pub fn at_luma(&self, row: usize, col: usize) -> BlockDecision {
        self.at_field_pixel(row / 2, col)
    }

    /// Decision for a pixel of a full-height chroma plane: every second
    /// row and column of the field mask, row-doubled like the field.
    pub fn at_chroma(&self, row: usize, col: usize) -> BlockDecision {
        self.at_field_pixel((row / 2) * 2, col * 2)
    }
}

// ============================================================================
// Adaptive
// ============================================================================

fn adaptive_plane<F>(src: &[u8], width: usize, height: usize, parity: Parity, decide: F) -> Vec<u8>
where
    F: Fn(usize, usize) -> BlockDecision,
{
    assert_eq!(src.len(), width * height, "plane size");
    let mut out = vec![0u8; width * height];

    for row in 0..height {
        let bob_row = field_source_row(row, parity, height) * width;
        let weave_row = row * width;
        for col in 0..width {
            out[weave_row + col] = match decide(row, col) {
                BlockDecision::Bob => src[bob_row + col],
                BlockDecision::Weave => src[weave_row + col],
            };
        }
    }

    out
}

/// Reconstruct the field of `mask`'s parity from `curr`.
pub fn adaptive_field(curr: &YuvFrame, mask: &MotionMask) -> YuvFrame {
    let parity = mask.parity();
    let [luma, chroma_u, chroma_v] = Plane::ALL.map(|plane| {
        let (w, h) = curr.plane_size(plane);
        let src = curr.plane(plane);
        match plane {
            Plane::Luma => adaptive_plane(src, w, h, parity, |r, c| mask.at_luma(r, c)),
            Plane::ChromaU | Plane::ChromaV => {
                adaptive_plane(src, w, h, parity, |r, c| mask.at_chroma(r, c))
            }
        }
    });

    YuvFrame::from_planes(curr.width, curr.height, luma, chroma_u, chroma_v)
}

/// Motion-adaptive deinterlace. Returns (top, bottom).
///
/// Without a usable previous frame (first frame of a sequence, or a
/// geometry change) this is exactly `deinterlace_bob`.
pub fn deinterlace_adaptive(
    curr: &YuvFrame,
    prev: Option<&YuvFrame>,
    threshold: u64,
    block_size: usize,
) -> (RgbFrame, RgbFrame) {
    let prev = match prev {
        Some(p) if p.same_geometry(curr) => p,
        Some(p) => {
            tracing::warn!(
                "Previous frame is {}x{}, current is {}x{}; falling back to bob",
                p.width,
                p.height,
                curr.width,
                curr.height
            );
            return deinterlace_bob(curr);
        }
        None => return deinterlace_bob(curr),
    };

    let [top, bottom] = Parity::BOTH.map(|parity| {
        let mask = MotionMask::measure(curr, prev, parity, threshold, block_size);
        let (bx, by) = mask.blocks();
        tracing::debug!(
            "{:?} field: {}/{} blocks moving",
            parity,
            mask.moving_blocks(),
            bx * by
        );
        to_rgb(&adaptive_field(curr, &mask))
    });

    (top, bottom)
}
