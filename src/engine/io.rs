// src/engine/io.rs
//
// File I/O: decode an image file into a PixelBuffer and encode one back out.
// Output format follows the file extension; writes are atomic.

use crate::engine::buffer::PixelBuffer;
use crate::engine::common::run_with_panic_policy;
use crate::error::{BrightnessError, Result};
use crate::ops::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// JPEG quality used when saving (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Decode the image at `path`.
pub fn load_buffer(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    // Validate that the file exists (fast check, no read)
    if !path.exists() {
        return Err(BrightnessError::file_not_found(shown));
    }

    let file = File::open(path).map_err(|e| BrightnessError::file_read_failed(shown.clone(), e))?;
    // Safety: the file is only read, and not expected to change while mapped.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| BrightnessError::file_read_failed(shown.clone(), e))?;

    let buffer = guarded_decode(&shown, || {
        let image = ImageReader::new(Cursor::new(&mmap[..]))
            .with_guessed_format()
            .map_err(|e| BrightnessError::decode_failed(shown.clone(), e.to_string()))?
            .decode()
            .map_err(|e| BrightnessError::decode_failed(shown.clone(), e.to_string()))?;
        PixelBuffer::try_from(image)
    })?;

    debug!(
        path = %shown,
        width = buffer.width(),
        height = buffer.height(),
        channels = buffer.channels(),
        "decoded image"
    );
    Ok(buffer)
}

/// Encode `buffer` in the format named by the extension of `path` and write it.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed save never leaves a truncated image behind.
pub fn save_buffer(buffer: &PixelBuffer, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    let format = output_format_for(path)?;
    let encoded = guarded_encode(&shown, format, || encode(buffer, format, &shown))?;
    write_atomic(path, &encoded)?;
    info!(path = %shown, format = format.as_str(), bytes = encoded.len(), "saved image");
    Ok(())
}

/// A panicking decoder is reported as `DecodeFailed` for `shown`.
fn guarded_decode<F>(shown: &str, decode: F) -> Result<PixelBuffer>
where
    F: FnOnce() -> Result<PixelBuffer>,
{
    run_with_panic_policy(decode, |message| {
        BrightnessError::decode_failed(shown.to_string(), format!("decoder panicked: {message}"))
    })
}

/// A panicking encoder is reported as `EncodeFailed` for `shown`.
fn guarded_encode<F>(shown: &str, format: OutputFormat, encode: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<Vec<u8>>,
{
    run_with_panic_policy(encode, |message| {
        BrightnessError::encode_failed(
            shown.to_string(),
            format.as_str(),
            format!("encoder panicked: {message}"),
        )
    })
}

/// Format implied by the extension of `path`.
pub fn output_format_for(path: &Path) -> Result<OutputFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| BrightnessError::missing_extension(path.display().to_string()))?;
    OutputFormat::from_extension(extension)
        .map_err(|_| BrightnessError::unsupported_format(extension.to_string()))
}

fn color_type(channels: u8) -> ExtendedColorType {
    match channels {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::Rgba8,
    }
}

/// Pixel data with the alpha channel removed, for formats without alpha.
fn without_alpha(buffer: &PixelBuffer) -> (Cow<'_, [u8]>, u8) {
    let channels = buffer.channels();
    if channels % 2 == 1 {
        return (Cow::Borrowed(buffer.as_raw()), channels);
    }
    let kept = (channels - 1) as usize;
    let data = buffer
        .as_raw()
        .chunks_exact(channels as usize)
        .flat_map(|pixel| &pixel[..kept])
        .copied()
        .collect();
    (Cow::Owned(data), channels - 1)
}

fn encode(buffer: &PixelBuffer, format: OutputFormat, shown: &str) -> Result<Vec<u8>> {
    let (width, height) = buffer.dimensions();
    let mut out = Vec::new();
    let encode_err =
        |e: image::ImageError| BrightnessError::encode_failed(shown.to_string(), format.as_str(), e.to_string());

    match format {
        OutputFormat::Jpeg => {
            let (data, channels) = without_alpha(buffer);
            JpegEncoder::new_with_quality(&mut out, DEFAULT_JPEG_QUALITY)
                .write_image(&data, width, height, color_type(channels))
                .map_err(encode_err)?;
        }
        _ => {
            let mut cursor = Cursor::new(&mut out);
            image::write_buffer_with_format(
                &mut cursor,
                buffer.as_raw(),
                width,
                height,
                color_type(buffer.channels()),
                format.image_format(),
            )
            .map_err(encode_err)?;
        }
    }
    Ok(out)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let shown = path.display().to_string();
    // Temp file in the target directory so the rename stays on one filesystem.
    let output_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(output_dir).map_err(|e| {
        BrightnessError::file_write_failed(output_dir.display().to_string(), e)
    })?;
    temp_file
        .write_all(data)
        .map_err(|e| BrightnessError::file_write_failed(shown.clone(), e))?;
    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| BrightnessError::file_write_failed(shown.clone(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| BrightnessError::file_write_failed(shown, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(channels: u8) -> PixelBuffer {
        PixelBuffer::from_fn(6, 4, channels, |x, y| {
            (0..channels).map(|c| (x * 40 + y * 10) as u8 + c).collect()
        })
        .unwrap()
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        let original = gradient(4);
        save_buffer(&original, &path).unwrap();
        assert_eq!(load_buffer(&path).unwrap(), original);
    }

    #[test]
    fn jpeg_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        save_buffer(&gradient(4), &path).unwrap();
        let loaded = load_buffer(&path).unwrap();
        assert_eq!(loaded.channels(), 3);
        assert_eq!(loaded.dimensions(), (6, 4));
    }

    #[test]
    fn extension_rules() {
        assert!(matches!(
            output_format_for(Path::new("photo")),
            Err(BrightnessError::MissingExtension { .. })
        ));
        assert!(matches!(
            output_format_for(Path::new("photo.")),
            Err(BrightnessError::MissingExtension { .. })
        ));
        assert!(matches!(
            output_format_for(Path::new("photo.xyz")),
            Err(BrightnessError::UnsupportedFormat { .. })
        ));
        assert_eq!(output_format_for(Path::new("a.b.PNG")).unwrap(), OutputFormat::Png);
    }

    #[test]
    fn codec_panics_are_io_errors() {
        let err = guarded_decode("in.png", || panic!("corrupt huffman table")).unwrap_err();
        assert!(matches!(err, BrightnessError::DecodeFailed { .. }));
        assert_eq!(err.category(), crate::error::ErrorCategory::IoError);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("in.png"));
        assert!(err.to_string().contains("corrupt huffman table"));

        let err = guarded_encode("out.jpg", OutputFormat::Jpeg, || panic!("bad scanline"))
            .unwrap_err();
        assert!(matches!(err, BrightnessError::EncodeFailed { .. }));
        assert_eq!(err.category(), crate::error::ErrorCategory::IoError);
        assert!(err.to_string().contains("out.jpg"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_buffer("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, BrightnessError::FileNotFound { .. }));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = load_buffer(&path).unwrap_err();
        assert!(matches!(err, BrightnessError::DecodeFailed { .. }));
    }

    #[test]
    fn failed_save_leaves_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tiff");
        assert!(save_buffer(&gradient(3), &path).is_err());
        assert!(!path.exists());
    }
}
