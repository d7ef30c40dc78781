// src/error.rs
//
// Unified error handling for parallel-brightness
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Caller mistakes (no image, bad extension, bad coordinates)
// - IoError: Source/destination files and codecs
// - ConcurrencyError: Pool drain timeouts and failed workers
// - Interrupted: The awaiting thread was interrupted while joining/draining

use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy.
///
/// Every failure is local and synchronous: it is returned from the operation
/// that detected it and never retried by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Misuse of the API, reported immediately
    UserError,
    /// File system or codec failure, carries the offending path
    IoError,
    /// A parallel runner could not account for all of its work
    ConcurrencyError,
    /// The waiting thread was interrupted
    Interrupted,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::IoError => "IoError",
            ErrorCategory::ConcurrencyError => "ConcurrencyError",
            ErrorCategory::Interrupted => "Interrupted",
        }
    }
}

/// parallel-brightness error types
#[derive(Debug, Error)]
pub enum BrightnessError {
    // Usage Errors
    #[error("No image loaded. Call read_image() before transforming or saving")]
    NoImageLoaded,

    #[error("Output path '{path}' must have a file extension such as .jpg or .png")]
    MissingExtension { path: Cow<'static, str> },

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Invalid buffer geometry {width}x{height}x{channels}: {reason}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        channels: u8,
        reason: Cow<'static, str>,
    },

    #[error("Pixel ({x}, {y}) channel count {channels} is outside buffer {width}x{height}x{buffer_channels}")]
    PixelOutOfBounds {
        x: u32,
        y: u32,
        channels: usize,
        width: u32,
        height: u32,
        buffer_channels: u8,
    },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // File I/O Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image '{path}': {message}")]
    DecodeFailed {
        path: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode '{path}' as {format}: {message}")]
    EncodeFailed {
        path: Cow<'static, str>,
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Concurrency Errors
    /// The queue did not drain before `timeout`. Queued rows were dropped;
    /// rows already running were finished, so the call can return later than
    /// `timeout`.
    #[error("Worker pool did not terminate within {timeout:?} ({completed}/{total} rows completed)")]
    PoolTimeout {
        timeout: Duration,
        completed: usize,
        total: usize,
    },

    #[error("Worker '{worker}' failed: {message}")]
    WorkerPanicked {
        worker: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },

    // Interruption
    #[error("Interrupted while waiting for {stage} ({completed}/{total} rows completed)")]
    Interrupted {
        stage: Cow<'static, str>,
        completed: usize,
        total: usize,
    },
}

fn clone_io(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}

impl Clone for BrightnessError {
    fn clone(&self) -> Self {
        match self {
            Self::NoImageLoaded => Self::NoImageLoaded,
            Self::MissingExtension { path } => Self::MissingExtension { path: path.clone() },
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::InvalidGeometry {
                width,
                height,
                channels,
                reason,
            } => Self::InvalidGeometry {
                width: *width,
                height: *height,
                channels: *channels,
                reason: reason.clone(),
            },
            Self::PixelOutOfBounds {
                x,
                y,
                channels,
                width,
                height,
                buffer_channels,
            } => Self::PixelOutOfBounds {
                x: *x,
                y: *y,
                channels: *channels,
                width: *width,
                height: *height,
                buffer_channels: *buffer_channels,
            },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::FileNotFound { path } => Self::FileNotFound { path: path.clone() },
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::DecodeFailed { path, message } => Self::DecodeFailed {
                path: path.clone(),
                message: message.clone(),
            },
            Self::FileWriteFailed { path, source } => Self::FileWriteFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::EncodeFailed {
                path,
                format,
                message,
            } => Self::EncodeFailed {
                path: path.clone(),
                format: format.clone(),
                message: message.clone(),
            },
            Self::PoolTimeout {
                timeout,
                completed,
                total,
            } => Self::PoolTimeout {
                timeout: *timeout,
                completed: *completed,
                total: *total,
            },
            Self::WorkerPanicked { worker, message } => Self::WorkerPanicked {
                worker: worker.clone(),
                message: message.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
            Self::Interrupted {
                stage,
                completed,
                total,
            } => Self::Interrupted {
                stage: stage.clone(),
                completed: *completed,
                total: *total,
            },
        }
    }
}

// Constructor Helpers
impl BrightnessError {
    pub fn no_image_loaded() -> Self {
        Self::NoImageLoaded
    }

    pub fn missing_extension(path: impl Into<Cow<'static, str>>) -> Self {
        Self::MissingExtension { path: path.into() }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_geometry(
        width: u32,
        height: u32,
        channels: u8,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidGeometry {
            width,
            height,
            channels,
            reason: reason.into(),
        }
    }

    pub fn pixel_out_of_bounds(
        (x, y): (u32, u32),
        channels: usize,
        (width, height, buffer_channels): (u32, u32, u8),
    ) -> Self {
        Self::PixelOutOfBounds {
            x,
            y,
            channels,
            width,
            height,
            buffer_channels,
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn decode_failed(
        path: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::DecodeFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn encode_failed(
        path: impl Into<Cow<'static, str>>,
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            path: path.into(),
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn pool_timeout(timeout: Duration, completed: usize, total: usize) -> Self {
        Self::PoolTimeout {
            timeout,
            completed,
            total,
        }
    }

    pub fn worker_panicked(
        worker: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::WorkerPanicked {
            worker: worker.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    pub fn interrupted(stage: impl Into<Cow<'static, str>>, completed: usize, total: usize) -> Self {
        Self::Interrupted {
            stage: stage.into(),
            completed,
            total,
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Usage and I/O errors are fixed by the caller (load an image, pick a
    /// writable path). Concurrency failures and interruptions leave the buffer
    /// in an unspecified state and are not.
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::IoError => true,
            ErrorCategory::ConcurrencyError | ErrorCategory::Interrupted => false,
        }
    }

    /// True when the buffer the failed call was transforming must not be used.
    pub fn buffer_is_degraded(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::ConcurrencyError | ErrorCategory::Interrupted
        )
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoImageLoaded
            | Self::MissingExtension { .. }
            | Self::UnsupportedFormat { .. }
            | Self::InvalidGeometry { .. }
            | Self::PixelOutOfBounds { .. }
            | Self::InvalidArgument { .. } => ErrorCategory::UserError,

            Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::DecodeFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::IoError,

            Self::PoolTimeout { .. } | Self::WorkerPanicked { .. } | Self::InternalPanic { .. } => {
                ErrorCategory::ConcurrencyError
            }

            Self::Interrupted { .. } => ErrorCategory::Interrupted,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, BrightnessError>;
