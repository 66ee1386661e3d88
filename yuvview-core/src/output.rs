// Output writer for converted frames
//
// PPM (P6) is written directly; any other extension the `image` crate
// recognises goes through its encoders.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageError, ImageFormat, RgbImage};
use thiserror::Error;

use crate::frame::RgbFrame;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Binary PPM: `P6\n<width> <height>\n255\n` then RGB bytes, row-major.
pub fn write_ppm<W: Write>(mut writer: W, frame: &RgbFrame) -> std::io::Result<()> {
    write!(writer, "P6\n{} {}\n255\n", frame.width, frame.height)?;
    writer.write_all(frame.as_bytes())?;
    writer.flush()
}

fn is_pnm(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        None => true,
        Some(ext) => matches!(ext.to_ascii_lowercase().as_str(), "ppm" | "pnm"),
    }
}

/// Save a frame, choosing the container from the file extension.
pub fn save_frame<P: AsRef<Path>>(path: P, frame: &RgbFrame) -> Result<(), OutputError> {
    let path = path.as_ref();
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    tracing::info!("Writing {}...", path.display());

    if is_pnm(path) {
        let file = File::create(path).map_err(io_err)?;
        return write_ppm(BufWriter::new(file), frame).map_err(io_err);
    }

    let encode_err = |source| OutputError::Encode {
        path: path.display().to_string(),
        source,
    };
    let format = ImageFormat::from_path(path).map_err(encode_err)?;
    let image = RgbImage::from_raw(
        frame.width as u32,
        frame.height as u32,
        frame.as_bytes().to_vec(),
    )
    .ok_or_else(|| {
        encode_err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )))
    })?;
    image.save_with_format(path, format).map_err(encode_err)
}

/// `out.ppm` -> (`out_1.ppm`, `out_2.ppm`), for the two fields of a frame.
pub fn field_output_paths<P: AsRef<Path>>(path: P) -> (PathBuf, PathBuf) {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (
        path.with_file_name(format!("{}_1{}", stem, ext)),
        path.with_file_name(format!("{}_2{}", stem, ext)),
    )
}
