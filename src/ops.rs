// src/ops.rs
//
// Strategy selection and output formats.
// Cheap, copyable descriptions; the work happens in engine/.

use image::ImageFormat;
use std::fmt;
use std::str::FromStr;

/// How the brightness transform is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Single-threaded row-major traversal (baseline)
    Sequential,
    /// One OS thread per contiguous row range
    FixedThreads,
    /// Persistent workers pulling single-row tasks from a queue
    WorkerPool,
    /// rayon work-stealing over row slices
    WorkStealing,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Sequential,
        Strategy::FixedThreads,
        Strategy::WorkerPool,
        Strategy::WorkStealing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::FixedThreads => "fixed",
            Strategy::WorkerPool => "pool",
            Strategy::WorkStealing => "rayon",
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Strategy::Sequential)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "single" | "seq" => Ok(Strategy::Sequential),
            "fixed" | "fixed-threads" | "threads" => Ok(Strategy::FixedThreads),
            "pool" | "worker-pool" => Ok(Strategy::WorkerPool),
            "rayon" | "work-stealing" => Ok(Strategy::WorkStealing),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// Output format for encoding, inferred from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
}

impl OutputFormat {
    pub fn from_extension(extension: &str) -> Result<Self, String> {
        match extension.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "bmp" => Ok(Self::Bmp),
            other => Err(format!("unsupported format: {other}")),
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
        }
    }

    /// JPEG has no alpha channel; everything else keeps it.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        }
    }
}
