// src/engine/buffer.rs
//
// PixelBuffer: owned row-major raster of 8-bit components.
//
// Workers never see the whole buffer. They receive `&mut [u8]` row slices
// produced by splitting the storage, so two workers cannot address the same
// row without the borrow checker rejecting it.

use crate::engine::partition::RowRange;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::{BrightnessError, Result};
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

/// Maximum components per pixel (RGBA).
pub const MAX_CHANNELS: u8 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer with every component set to `fill`.
    pub fn new(width: u32, height: u32, channels: u8, fill: u8) -> Result<Self> {
        let len = checked_len(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![fill; len],
        })
    }

    /// Wrap existing row-major storage.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let len = checked_len(width, height, channels)?;
        if data.len() != len {
            return Err(BrightnessError::invalid_geometry(
                width,
                height,
                channels,
                format!("expected {len} bytes of storage, got {}", data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, channels: u8, mut f: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> Vec<u8>,
    {
        let mut buffer = Self::new(width, height, channels, 0)?;
        for y in 0..height {
            for x in 0..width {
                let pixel = f(x, y);
                buffer.set_pixel(x, y, &pixel)?;
            }
        }
        Ok(buffer)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Raw interleaved storage. Length and geometry cannot change through it.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Components of pixel `(x, y)`.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<&[u8]> {
        let offset = self.offset(x, y, self.channels as usize)?;
        Ok(&self.data[offset..offset + self.channels as usize])
    }

    /// Overwrite pixel `(x, y)`. `components` must have exactly `channels` entries.
    pub fn set_pixel(&mut self, x: u32, y: u32, components: &[u8]) -> Result<()> {
        let offset = self.offset(x, y, components.len())?;
        self.data[offset..offset + components.len()].copy_from_slice(components);
        Ok(())
    }

    /// Mutable access to a single row.
    pub fn row_mut(&mut self, y: u32) -> Result<&mut [u8]> {
        if y >= self.height {
            return Err(BrightnessError::pixel_out_of_bounds(
                (0, y),
                self.channels as usize,
                (self.width, self.height, self.channels),
            ));
        }
        let stride = self.stride();
        let start = y as usize * stride;
        Ok(&mut self.data[start..start + stride])
    }

    /// Every row as a disjoint mutable slice, top to bottom.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        let stride = self.stride();
        self.data.chunks_exact_mut(stride)
    }

    /// Split the storage into one mutable band per range.
    ///
    /// `ranges` must be sorted, non-overlapping and lie inside the buffer,
    /// which is what `partition()` produces. Empty ranges yield empty bands.
    pub fn split_rows_mut(&mut self, ranges: &[RowRange]) -> Result<Vec<RowBand<'_>>> {
        let stride = self.stride();
        let height = self.height as usize;
        let mut bands = Vec::with_capacity(ranges.len());
        let mut rest: &mut [u8] = &mut self.data;
        let mut cursor = 0usize;

        for range in ranges {
            if range.is_empty() {
                bands.push(RowBand {
                    first_row: range.start_y(),
                    stride,
                    data: &mut [],
                });
                continue;
            }
            if range.start_y() < cursor || range.rows().end > height {
                return Err(BrightnessError::invalid_argument(
                    "ranges",
                    format!("{range:?}"),
                    format!("ranges must be ordered, disjoint and within {height} rows"),
                ));
            }
            let skip = (range.start_y() - cursor) * stride;
            let take = range.len() * stride;
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
            let (band, tail) = tail.split_at_mut(take);
            rest = tail;
            cursor = range.rows().end;
            bands.push(RowBand {
                first_row: range.start_y(),
                stride,
                data: band,
            });
        }
        Ok(bands)
    }

    fn offset(&self, x: u32, y: u32, channels: usize) -> Result<usize> {
        if x >= self.width || y >= self.height || channels != self.channels as usize {
            return Err(BrightnessError::pixel_out_of_bounds(
                (x, y),
                channels,
                (self.width, self.height, self.channels),
            ));
        }
        Ok((y as usize * self.width as usize + x as usize) * self.channels as usize)
    }
}

/// Contiguous rows handed to one worker.
#[derive(Debug)]
pub struct RowBand<'a> {
    first_row: usize,
    stride: usize,
    data: &'a mut [u8],
}

impl<'a> RowBand<'a> {
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn row_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rows of this band paired with their absolute row index.
    pub fn into_rows(self) -> impl Iterator<Item = (usize, &'a mut [u8])> {
        let first_row = self.first_row;
        let stride = self.stride.max(1);
        self.data
            .chunks_exact_mut(stride)
            .enumerate()
            .map(move |(i, row)| (first_row + i, row))
    }
}

fn checked_len(width: u32, height: u32, channels: u8) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(BrightnessError::invalid_geometry(
            width,
            height,
            channels,
            "width and height must be positive",
        ));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(BrightnessError::invalid_geometry(
            width,
            height,
            channels,
            format!("channels must be between 1 and {MAX_CHANNELS}"),
        ));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BrightnessError::invalid_geometry(
            width,
            height,
            channels,
            format!("dimensions exceed maximum {MAX_DIMENSION}"),
        ));
    }
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(BrightnessError::invalid_geometry(
            width,
            height,
            channels,
            format!("pixel count exceeds maximum {MAX_PIXELS}"),
        ));
    }
    Ok(width as usize * height as usize * channels as usize)
}

// =============================================================================
// image crate interop
// =============================================================================

impl TryFrom<DynamicImage> for PixelBuffer {
    type Error = BrightnessError;

    /// 8-bit layouts are kept zero-copy; everything else is normalized to RGBA8.
    fn try_from(img: DynamicImage) -> Result<Self> {
        let (width, height) = (img.width(), img.height());
        let (channels, data) = match img {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        PixelBuffer::from_raw(width, height, channels, data)
    }
}

impl TryFrom<PixelBuffer> for DynamicImage {
    type Error = BrightnessError;

    fn try_from(buffer: PixelBuffer) -> Result<Self> {
        let (width, height, channels) = (buffer.width, buffer.height, buffer.channels);
        let data = buffer.data;
        let mismatch =
            || BrightnessError::invalid_geometry(width, height, channels, "storage size mismatch");
        let img = match channels {
            1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
            _ => None,
        };
        img.ok_or_else(mismatch)
    }
}
