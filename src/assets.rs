use anyhow::Context;
use image::{ImageFormat, ImageReader, RgbaImage};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Files in `dir` with the given extension (case-insensitive), in the order
/// the filesystem hands them out.
pub fn listed_files(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list '{}'", dir.display()))? {
        let path = entry
            .with_context(|| format!("Failed to list '{}'", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            files.push(path);
        }
    }
    Ok(files)
}

/// [`listed_files`] sorted by file name. This order fixes the row of every
/// tile, so the index writer and the compositor must both go through here.
pub fn sorted_files(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = listed_files(dir, extension)?;
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Decodes an image using the extension as a hint, falling back to sniffing
/// the content when the extension lies.
pub fn open_image_fallback(path: &Path) -> image::ImageResult<image::DynamicImage> {
    let hint = ImageFormat::from_path(path).ok();
    if let Some(fmt) = hint {
        let mut reader = ImageReader::open(path).map_err(image::ImageError::IoError)?;
        reader.set_format(fmt);
        if let Ok(img) = reader.decode() {
            return Ok(img);
        }
    }

    let guessed = ImageReader::open(path)
        .map_err(image::ImageError::IoError)?
        .with_guessed_format()?;
    let guessed_fmt = guessed.format();
    if let (Some(hint_fmt), Some(real_fmt)) = (hint, guessed_fmt)
        && hint_fmt != real_fmt
    {
        warn!(
            "Graphic file '{}' is really {:?}",
            path.to_string_lossy(),
            real_fmt
        );
    }
    guessed.decode()
}

pub fn open_rgba(path: &Path) -> anyhow::Result<RgbaImage> {
    let img = open_image_fallback(path)
        .with_context(|| format!("Failed to decode '{}'", path.display()))?;
    Ok(img.to_rgba8())
}

/// Writes `img` as an 8-bit RGBA PNG, creating the parent directory.
pub fn save_png(img: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}
