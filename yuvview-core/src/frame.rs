//! Frame types shared by the decoder, converter and deinterlacer.
//!
//! `YuvFrame` is planar 4:2:0: a full-resolution luma plane and two
//! chroma planes at half resolution in both dimensions. `RgbFrame` is
//! packed RGB24, row-major.

// ============================================================================
// YUV 4:2:0
// ============================================================================

/// Which of the three planes of a `YuvFrame` to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Luma,
    ChromaU,
    ChromaV,
}

impl Plane {
    /// Storage order: luma, then U, then V
    pub const ALL: [Plane; 3] = [Plane::Luma, Plane::ChromaU, Plane::ChromaV];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    /// Width in pixels (even, at least 2)
    pub width: usize,
    /// Video height in pixels (even, at least 2)
    pub height: usize,
    /// width * height samples
    pub luma: Vec<u8>,
    /// (width / 2) * (height / 2) samples
    pub chroma_u: Vec<u8>,
    /// (width / 2) * (height / 2) samples
    pub chroma_v: Vec<u8>,
}

impl YuvFrame {
    /// Build a frame from already-split planes.
    ///
    /// Panics if the dimensions are not even or the plane lengths do not
    /// match the 4:2:0 geometry; callers are expected to validate input
    /// first (the decoder does).
    pub fn from_planes(
        width: usize,
        height: usize,
        luma: Vec<u8>,
        chroma_u: Vec<u8>,
        chroma_v: Vec<u8>,
    ) -> Self {
        assert!(
            width >= 2 && height >= 2 && width % 2 == 0 && height % 2 == 0,
            "invalid 4:2:0 geometry {}x{}",
            width,
            height
        );
        assert_eq!(luma.len(), width * height, "luma plane size");
        let chroma_len = (width / 2) * (height / 2);
        assert_eq!(chroma_u.len(), chroma_len, "U plane size");
        assert_eq!(chroma_v.len(), chroma_len, "V plane size");

        Self {
            width,
            height,
            luma,
            chroma_u,
            chroma_v,
        }
    }

    /// Frame where every sample of each plane has the same value.
    pub fn filled(width: usize, height: usize, y: u8, u: u8, v: u8) -> Self {
        let chroma_len = (width / 2) * (height / 2);
        Self::from_planes(
            width,
            height,
            vec![y; width * height],
            vec![u; chroma_len],
            vec![v; chroma_len],
        )
    }

    pub fn chroma_width(&self) -> usize {
        self.width / 2
    }

    pub fn chroma_height(&self) -> usize {
        self.height / 2
    }

    /// Dimensions of a plane as (width, height)
    pub fn plane_size(&self, plane: Plane) -> (usize, usize) {
        match plane {
            Plane::Luma => (self.width, self.height),
            Plane::ChromaU | Plane::ChromaV => (self.chroma_width(), self.chroma_height()),
        }
    }

    /// Get plane data slice
    pub fn plane(&self, plane: Plane) -> &[u8] {
        match plane {
            Plane::Luma => &self.luma,
            Plane::ChromaU => &self.chroma_u,
            Plane::ChromaV => &self.chroma_v,
        }
    }

    /// True when both frames share the same geometry
    pub fn same_geometry(&self, other: &YuvFrame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

// ============================================================================
// RGB24
// ============================================================================

/// Packed RGB frame ready for display or writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: usize,
    pub height: usize,
    /// width * height * 3 bytes, R,G,B per pixel
    pub data: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height * 3],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_sizes_follow_subsampling() {
        let frame = YuvFrame::filled(8, 6, 16, 128, 128);
        assert_eq!(frame.plane_size(Plane::Luma), (8, 6));
        assert_eq!(frame.plane_size(Plane::ChromaU), (4, 3));
        assert_eq!(frame.plane(Plane::ChromaV).len(), 12);
    }

    #[test]
    #[should_panic(expected = "luma plane size")]
    fn rejects_short_luma_plane() {
        YuvFrame::from_planes(4, 4, vec![0; 15], vec![0; 4], vec![0; 4]);
    }

    #[test]
    fn rgb_pixel_accessors() {
        let mut frame = RgbFrame::new(2, 2);
        frame.data[9..12].copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.pixel(1, 1), [1, 2, 3]);
        assert_eq!(frame.pixels().count(), 4);
    }
}
