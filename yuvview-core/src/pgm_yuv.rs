//! # PGM-packed YUV 4:2:0 Frame Dumps
//!
//! Decoders such as mpeg2dec can dump each picture as a single binary
//! graymap (`P5`). The graymap is 1.5x taller than the video:
//!
//! ```text
//! ┌───────────────────────┐
//! │ Y  (width x height)   │  top two thirds
//! │                       │
//! ├───────────┬───────────┤
//! │ U (w/2)   │ V (w/2)   │  bottom third, height/2 rows,
//! └───────────┴───────────┘  each row split in half
//! ```
//!
//! No image library understands this layout, so the container is parsed
//! here directly.

use std::fs;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::frame::YuvFrame;

/// Magic token of a binary graymap
pub const PGM_MAGIC: &[u8] = b"P5";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Not a valid PGM P5 file (magic {0:?})")]
    BadMagic(String),
    #[error("Missing header token: {0}")]
    MissingToken(&'static str),
    #[error("Invalid {field} in header: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Invalid geometry {width}x{height} (must be positive and even)")]
    InvalidGeometry { width: usize, height: usize },
    #[error("Truncated frame data: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Header
// ============================================================================

/// Parsed graymap header, in container coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: usize,
    /// Declared graymap height (1.5x the video height)
    pub container_height: usize,
    pub maxval: u32,
}

impl FrameHeader {
    /// True video height: floor(container_height / 1.5)
    pub fn video_height(&self) -> usize {
        self.container_height / 3 * 2 + self.container_height % 3 * 2 / 3
    }

    /// Bytes of luma plus interleaved chroma rows the payload must hold,
    /// `None` if that does not fit in `usize`
    pub fn payload_len(&self) -> Option<usize> {
        let height = self.video_height();
        let luma = self.width.checked_mul(height)?;
        let chroma = self.width.checked_mul(height / 2)?;
        luma.checked_add(chroma)
    }
}

// Same set as C isspace(): includes vertical tab and form feed.
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Whitespace-separated header tokens with `#` comments skipped.
///
/// A comment runs up to and including the next newline and may appear
/// anywhere, even in the middle of a token. The whitespace byte that ends
/// a token is consumed with it, so after the last header token `pos`
/// points at the first payload byte.
struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Vec<u8>> {
        let mut token = Vec::new();

        while let Some(&b) = self.data.get(self.pos) {
            self.pos += 1;
            if is_space(b) {
                if !token.is_empty() {
                    return Some(token);
                }
            } else if b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                token.push(b);
            }
        }

        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    fn expect_token(&mut self, name: &'static str) -> Result<Vec<u8>, FormatError> {
        self.next_token().ok_or(FormatError::MissingToken(name))
    }

    fn expect_number<T: std::str::FromStr>(&mut self, name: &'static str) -> Result<T, FormatError> {
        let token = self.expect_token(name)?;
        std::str::from_utf8(&token)
            .ok()
            .and_then(|s| s.parse::<T>().ok())
            .ok_or_else(|| FormatError::InvalidNumber {
                field: name,
                value: String::from_utf8_lossy(&token).into_owned(),
            })
    }
}

/// Parse the four header tokens. Returns the header and the offset of the
/// first payload byte.
pub fn parse_header(data: &[u8]) -> Result<(FrameHeader, usize), FormatError> {
    let mut tokens = Tokenizer::new(data);

    let magic = tokens.expect_token("magic")?;
    if magic != PGM_MAGIC {
        return Err(FormatError::BadMagic(
            String::from_utf8_lossy(&magic).into_owned(),
        ));
    }

    let width = tokens.expect_number::<usize>("width")?;
    let container_height = tokens.expect_number::<usize>("height")?;
    let maxval = tokens.expect_number::<u32>("maxval")?;

    Ok((
        FrameHeader {
            width,
            container_height,
            maxval,
        },
        tokens.pos,
    ))
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode one frame dump held in memory.
pub fn decode_frame(data: &[u8]) -> Result<YuvFrame, FormatError> {
    let (header, offset) = parse_header(data)?;
    let width = header.width;
    let height = header.video_height();

    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(FormatError::InvalidGeometry { width, height });
    }

    let expected = header
        .payload_len()
        .ok_or(FormatError::InvalidGeometry { width, height })?;
    let payload = &data[offset..];
    if payload.len() < expected {
        return Err(FormatError::Truncated {
            expected,
            actual: payload.len(),
        });
    }

    let y_size = width * height;
    let luma = payload[..y_size].to_vec();

    let chroma_w = width / 2;
    let chroma_h = height / 2;
    let mut chroma_u = Vec::with_capacity(chroma_w * chroma_h);
    let mut chroma_v = Vec::with_capacity(chroma_w * chroma_h);

    // Each chroma row of the container is a U row followed by a V row.
    for row in payload[y_size..expected].chunks_exact(width) {
        chroma_u.extend_from_slice(&row[..chroma_w]);
        chroma_v.extend_from_slice(&row[chroma_w..]);
    }

    tracing::debug!(
        "Decoded {}x{} frame (container {}x{}, maxval {})",
        width,
        height,
        width,
        header.container_height,
        header.maxval
    );

    Ok(YuvFrame::from_planes(width, height, luma, chroma_u, chroma_v))
}

/// Read a whole frame dump from `reader` and decode it.
pub fn read_frame<R: Read>(mut reader: R) -> Result<YuvFrame, FormatError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_frame(&data)
}

pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<YuvFrame, FormatError> {
    let data = fs::read(path.as_ref())?;
    decode_frame(&data)
}

/// Pack a frame back into the graymap layout (maxval 255).
pub fn encode_frame(frame: &YuvFrame) -> Vec<u8> {
    let header = format!("P5\n{} {}\n255\n", frame.width, frame.height * 3 / 2);
    let chroma_w = frame.chroma_width();

    let mut out = Vec::with_capacity(header.len() + frame.width * frame.height * 3 / 2);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&frame.luma);
    for row in 0..frame.chroma_height() {
        let span = row * chroma_w..(row + 1) * chroma_w;
        out.extend_from_slice(&frame.chroma_u[span.clone()]);
        out.extend_from_slice(&frame.chroma_v[span]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn container(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut data = header.as_bytes().to_vec();
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn decodes_geometry_from_container_height() {
        // 8 wide, container 12 rows -> 8 video rows
        let data = container("P5\n8 12\n255\n", &[7u8; 8 * 12]);
        let frame = decode_frame(&data).unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 8);
        assert_eq!(frame.luma.len(), 64);
        assert_eq!(frame.chroma_u.len(), 16);
        assert_eq!(frame.chroma_v.len(), 16);
    }

    #[test]
    fn video_height_is_floored() {
        let header = FrameHeader {
            width: 4,
            container_height: 7,
            maxval: 255,
        };
        assert_eq!(header.video_height(), 4);
        assert_eq!(header.payload_len(), Some(4 * 4 + 2 * 4));
    }

    #[test]
    fn splits_chroma_rows_into_u_and_v() {
        let mut payload = vec![200u8; 16];
        // two chroma rows of 4 bytes: [U U V V]
        payload.extend_from_slice(&[1, 2, 101, 102, 3, 4, 103, 104]);
        let frame = decode_frame(&container("P5 4 6 255\n", &payload)).unwrap();
        assert_eq!(frame.chroma_u, vec![1, 2, 3, 4]);
        assert_eq!(frame.chroma_v, vec![101, 102, 103, 104]);
    }

    #[test]
    fn tolerates_comments_between_tokens() {
        let header = "P5\n# created by mpeg2dec\n4 # width\n# height next\n6\n#max\n255\n";
        let data = container(header, &[9u8; 24]);
        let (parsed, _) = parse_header(&data).unwrap();
        assert_eq!(
            parsed,
            FrameHeader {
                width: 4,
                container_height: 6,
                maxval: 255
            }
        );
        assert_eq!(decode_frame(&data).unwrap().luma, vec![9u8; 16]);
    }

    #[test]
    fn payload_starts_after_single_whitespace() {
        // The payload begins with bytes that look like whitespace.
        let mut payload = vec![b'\n', b' '];
        payload.extend_from_slice(&[50u8; 22]);
        let frame = decode_frame(&container("P5\n4 6\n255\n", &payload)).unwrap();
        assert_eq!(&frame.luma[..2], &[b'\n', b' ']);
    }

    #[test]
    fn rejects_wrong_magic() {
        let data = container("P6\n4 6\n255\n", &[0u8; 24]);
        assert!(matches!(decode_frame(&data), Err(FormatError::BadMagic(m)) if m == "P6"));
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let data = container("P5\n4 six\n255\n", &[0u8; 24]);
        assert!(matches!(
            decode_frame(&data),
            Err(FormatError::InvalidNumber { field: "height", .. })
        ));
        let data = container("P5\n4 6\nmax\n", &[0u8; 24]);
        assert!(matches!(
            decode_frame(&data),
            Err(FormatError::InvalidNumber { field: "maxval", .. })
        ));
    }

    #[test]
    fn rejects_missing_tokens() {
        assert!(matches!(
            decode_frame(b"P5\n4 6"),
            Err(FormatError::MissingToken("maxval"))
        ));
        assert!(matches!(decode_frame(b""), Err(FormatError::MissingToken("magic"))));
    }

    #[test]
    fn oversized_geometry_is_an_error() {
        // Both dimensions parse, their product does not fit
        let half = usize::BITS / 2;
        let width = 1usize << (half + 1);
        let data = format!("P5\n{} {}\n255\n", width, 3usize << half);
        assert!(matches!(
            decode_frame(data.as_bytes()),
            Err(FormatError::InvalidGeometry { width: w, .. }) if w == width
        ));

        let data = format!("P5\n{} {}\n255\n", usize::MAX - 1, usize::MAX);
        assert!(matches!(
            decode_frame(data.as_bytes()),
            Err(FormatError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn rejects_odd_or_empty_geometry() {
        let data = container("P5\n3 6\n255\n", &[0u8; 18]);
        assert!(matches!(
            decode_frame(&data),
            Err(FormatError::InvalidGeometry { width: 3, height: 4 })
        ));
        // container height 1 -> video height 0
        let data = container("P5\n4 1\n255\n", &[0u8; 4]);
        assert!(matches!(
            decode_frame(&data),
            Err(FormatError::InvalidGeometry { height: 0, .. })
        ));
    }

    #[test]
    fn rejects_short_payload() {
        let data = container("P5\n4 6\n255\n", &[0u8; 23]);
        assert!(matches!(
            decode_frame(&data),
            Err(FormatError::Truncated {
                expected: 24,
                actual: 23
            })
        ));
    }

    #[test]
    fn encode_matches_decoder_layout() {
        let mut frame = YuvFrame::filled(4, 4, 10, 20, 30);
        frame.chroma_u = vec![1, 2, 3, 4];
        frame.chroma_v = vec![5, 6, 7, 8];
        let bytes = encode_frame(&frame);
        assert!(bytes.starts_with(b"P5\n4 6\n255\n"));
        assert_eq!(&bytes[bytes.len() - 8..], &[1, 2, 5, 6, 3, 4, 7, 8]);
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }

    #[test]
    fn decodes_from_file_and_reader() {
        let frame = YuvFrame::filled(6, 4, 90, 100, 110);
        let bytes = encode_frame(&frame);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        assert_eq!(decode_file(file.path()).unwrap(), frame);
        assert_eq!(read_frame(&bytes[..]).unwrap(), frame);

        assert!(matches!(
            decode_file(file.path().with_extension("missing")),
            Err(FormatError::Io(_))
        ));
    }
}
