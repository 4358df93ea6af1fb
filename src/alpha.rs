use crate::assets;
use image::{Rgba, RgbaImage};
use log::info;
use std::path::Path;

pub const DEFAULT_ALPHA_THRESHOLD: u8 = 100;

#[inline(always)]
const fn pack_argb([r, g, b, a]: [u8; 4]) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

#[inline(always)]
const fn unpack_argb(argb: u32) -> [u8; 4] {
    [(argb >> 16) as u8, (argb >> 8) as u8, argb as u8, (argb >> 24) as u8]
}

/// Maps one packed ARGB pixel: alpha above `threshold` becomes 255, anything
/// else 0. The low 24 colour bits pass through untouched.
#[inline(always)]
pub const fn threshold_argb(argb: u32, threshold: u8) -> u32 {
    let alpha = argb >> 24;
    let rgb = argb & 0x00FF_FFFF;
    let new_alpha: u32 = if alpha > threshold as u32 { 0xFF } else { 0 };
    new_alpha << 24 | rgb
}

/// Returns how many pixels changed.
pub fn threshold_image(img: &mut RgbaImage, threshold: u8) -> usize {
    let mut changed = 0usize;
    for px in img.pixels_mut() {
        let argb = pack_argb(px.0);
        let out = threshold_argb(argb, threshold);
        if out != argb {
            changed += 1;
            *px = Rgba(unpack_argb(out));
        }
    }
    changed
}

/// Rewrites the image at `path` in place with binary alpha.
pub fn threshold_file(path: &Path, threshold: u8) -> anyhow::Result<()> {
    let mut img = assets::open_rgba(path)?;
    let changed = threshold_image(&mut img, threshold);
    assets::save_png(&img, path)?;
    info!(
        "Rounded alpha of {changed} pixels in '{}' (threshold {threshold}).",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_ALPHA_THRESHOLD, pack_argb, threshold_argb, threshold_file, threshold_image, unpack_argb};
    use crate::assets::{open_rgba, save_png};
    use image::{Rgba, RgbaImage};

    fn sample() -> RgbaImage {
        // Every alpha value once, with colours that set the high bits too.
        RgbaImage::from_fn(16, 16, |x, y| {
            let a = (y * 16 + x) as u8;
            Rgba([255 - a, a, a ^ 0xA5, a])
        })
    }

    #[test]
    fn packing_round_trips_channel_order() {
        let px = [0x12, 0x34, 0x56, 0xF0];
        assert_eq!(pack_argb(px), 0xF012_3456);
        assert_eq!(unpack_argb(0xF012_3456), px);
    }

    #[test]
    fn high_alpha_pixels_use_unsigned_shift() {
        // Alpha 0xFF sets the sign bit of the packed value.
        assert_eq!(threshold_argb(0xFF12_3456, 100), 0xFF12_3456);
        assert_eq!(threshold_argb(0x80FF_FFFF, 100), 0xFFFF_FFFF);
        assert_eq!(threshold_argb(0x6400_0001, 100), 0x0000_0001);
        assert_eq!(threshold_argb(0x6500_0001, 100), 0xFF00_0001);
    }

    #[test]
    fn alpha_is_binary_and_rgb_is_untouched() {
        let original = sample();
        let mut img = original.clone();
        threshold_image(&mut img, DEFAULT_ALPHA_THRESHOLD);
        for (before, after) in original.pixels().zip(img.pixels()) {
            let expected = if before[3] > 100 { 255 } else { 0 };
            assert_eq!(after[3], expected, "alpha {} mapped wrong", before[3]);
            assert_eq!(before.0[..3], after.0[..3]);
        }
    }

    #[test]
    fn thresholding_is_idempotent() {
        let mut once = sample();
        threshold_image(&mut once, DEFAULT_ALPHA_THRESHOLD);
        let mut twice = once.clone();
        assert_eq!(threshold_image(&mut twice, DEFAULT_ALPHA_THRESHOLD), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn file_is_rewritten_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emojis.png");
        save_png(&sample(), &path).unwrap();

        threshold_file(&path, DEFAULT_ALPHA_THRESHOLD).unwrap();

        let mut expected = sample();
        threshold_image(&mut expected, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(open_rgba(&path).unwrap(), expected);
    }
}
