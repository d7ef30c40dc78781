// lib.rs
//
// parallel-brightness: brightness adjustment for raster images, with
// interchangeable sequential and multi-threaded execution strategies.
//
// Design goals:
// - Byte-identical output across strategies
// - Workers only ever hold disjoint rows of the image
// - Bounded waiting, and no thread outlives the call that started it

// Memory allocator optimization - jemalloc for better performance
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    adjust_brightness, adjust_brightness_parallel, adjust_brightness_with, EngineConfig,
    ExecutionReport, ImageProcessor, ParallelExecutor, PixelBuffer,
};
pub use error::{BrightnessError, ErrorCategory, Result};
pub use ops::{OutputFormat, Strategy};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// File extensions accepted when saving.
pub fn supported_output_formats() -> Vec<&'static str> {
    vec!["jpeg", "jpg", "png", "webp", "bmp"]
}
