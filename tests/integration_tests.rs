// tests/integration_tests.rs
//
// End-to-end tests: load, transform and save real image files.

use parallel_brightness::engine::{load_buffer, save_buffer, PixelBuffer};
use parallel_brightness::{
    BrightnessError, EngineConfig, ErrorCategory, ImageProcessor, Strategy,
};
use std::path::Path;
use tempfile::TempDir;

fn write_fixture(dir: &Path, name: &str, channels: u8) -> std::path::PathBuf {
    let buffer = PixelBuffer::from_fn(32, 20, channels, |x, y| {
        (0..channels)
            .map(|c| ((x * 7 + y * 11 + c as u32 * 60) % 256) as u8)
            .collect()
    })
    .unwrap();
    let path = dir.join(name);
    save_buffer(&buffer, &path).unwrap();
    path
}

#[test]
fn test_copy_brighter_darker_workflow() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(dir.path(), "dog.png", 3);

    let mut processor = ImageProcessor::new();
    processor.read_image(&input).unwrap();
    let original = processor.image().unwrap().clone();

    let copy = dir.path().join("dog_copy.png");
    processor.save_image(&copy).unwrap();
    assert_eq!(load_buffer(&copy).unwrap(), original);

    processor.adjust_brightness(70).unwrap();
    let brighter_path = dir.path().join("dog_brighter.png");
    processor.save_image(&brighter_path).unwrap();
    let brighter = load_buffer(&brighter_path).unwrap();
    for (&before, &after) in original.as_raw().iter().zip(brighter.as_raw()) {
        assert_eq!(after, before.saturating_add(70));
    }

    processor.adjust_brightness(-70).unwrap();
    let darker_path = dir.path().join("dog_darker.png");
    processor.save_image(&darker_path).unwrap();
    let darker = load_buffer(&darker_path).unwrap();
    for (&before, &after) in original.as_raw().iter().zip(darker.as_raw()) {
        // Values that clipped at 255 do not come back.
        assert_eq!(after, before.saturating_add(70).saturating_sub(70));
    }
}

#[test]
fn test_every_strategy_writes_identical_files() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(dir.path(), "input.png", 4);
    let config = EngineConfig::default().with_workers(3);

    let mut outputs = Vec::new();
    for strategy in Strategy::ALL {
        let mut processor = ImageProcessor::with_config(config.clone());
        processor.read_image(&input).unwrap();
        processor.adjust_brightness_parallel(25, strategy).unwrap();
        let out = dir.path().join(format!("out_{strategy}.png"));
        processor.save_image(&out).unwrap();
        outputs.push(load_buffer(&out).unwrap());
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_jpeg_output_is_written() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(dir.path(), "photo.png", 4);
    let mut processor = ImageProcessor::new();
    processor.read_image(&input).unwrap();
    processor.adjust_brightness(10).unwrap();

    let out = dir.path().join("photo.jpeg");
    processor.save_image(&out).unwrap();
    let reloaded = load_buffer(&out).unwrap();
    assert_eq!(reloaded.dimensions(), (32, 20));
    assert_eq!(reloaded.channels(), 3);
}

#[test]
fn test_grayscale_round_trip() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(dir.path(), "gray.png", 1);
    let loaded = load_buffer(&input).unwrap();
    assert_eq!(loaded.channels(), 1);
}

#[test]
fn test_missing_extension_and_unknown_format() {
    let dir = TempDir::new().unwrap();
    let mut processor = ImageProcessor::new();
    processor.set_image(PixelBuffer::new(2, 2, 3, 0).unwrap());

    let err = processor.save_image(dir.path().join("noext")).unwrap_err();
    assert!(matches!(err, BrightnessError::MissingExtension { .. }));
    assert_eq!(err.category(), ErrorCategory::UserError);

    let err = processor.save_image(dir.path().join("out.qoi")).unwrap_err();
    assert!(matches!(err, BrightnessError::UnsupportedFormat { .. }));
    assert!(!dir.path().join("out.qoi").exists());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let mut processor = ImageProcessor::new();
    let err = processor
        .read_image(dir.path().join("missing.jpg"))
        .unwrap_err();
    assert!(matches!(err, BrightnessError::FileNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::IoError);
    assert!(err.is_recoverable());
    assert!(!processor.has_image());
}

#[test]
fn test_unwritable_destination() {
    let dir = TempDir::new().unwrap();
    let mut processor = ImageProcessor::new();
    processor.set_image(PixelBuffer::new(2, 2, 3, 0).unwrap());
    let err = processor
        .save_image(dir.path().join("no_such_dir").join("out.png"))
        .unwrap_err();
    assert!(matches!(err, BrightnessError::FileWriteFailed { .. }));
}

#[test]
fn test_no_image_loaded() {
    let mut processor = ImageProcessor::new();
    let err = processor.adjust_brightness(5).unwrap_err();
    assert!(matches!(err, BrightnessError::NoImageLoaded));
    assert_eq!(err.category(), ErrorCategory::UserError);
}
