use crate::assets;
use anyhow::bail;
use image::{RgbaImage, imageops};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Clips a tile to `size`x`size` so an oversized source cannot spill into the
/// next row.
fn fit_tile(tile: &RgbaImage, size: u32, origin: &Path) -> RgbaImage {
    if tile.width() == size && tile.height() == size {
        return tile.clone();
    }
    warn!(
        "Tile '{}' is {}x{}, expected {size}x{size}; cropping.",
        origin.display(),
        tile.width(),
        tile.height()
    );
    imageops::crop_imm(tile, 0, 0, size.min(tile.width()), size.min(tile.height())).to_image()
}

/// Stacks `tiles` top to bottom on a transparent `size` x `len*size` canvas.
pub fn stack(tiles: &[&RgbaImage], size: u32) -> anyhow::Result<RgbaImage> {
    let Some(height) = u32::try_from(tiles.len())
        .ok()
        .and_then(|n| n.checked_mul(size))
    else {
        bail!("{} tiles of {size}px do not fit in one image", tiles.len());
    };
    let mut sheet = RgbaImage::new(size, height);
    for (row, tile) in tiles.iter().enumerate() {
        let y = row as i64 * i64::from(size);
        imageops::replace(&mut sheet, *tile, 0, y);
    }
    Ok(sheet)
}

/// Sheet from every `.png` in `dir`, row order = file-name order.
pub fn compose_sorted(dir: &Path, size: u32) -> anyhow::Result<RgbaImage> {
    let files = assets::sorted_files(dir, "png")?;
    let tiles = files
        .iter()
        .map(|path| -> anyhow::Result<RgbaImage> {
            Ok(fit_tile(&assets::open_rgba(path)?, size, path))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let refs: Vec<&RgbaImage> = tiles.iter().collect();
    stack(&refs, size)
}

/// Sheet with one row per identifier, in the given order. Repeated
/// identifiers reuse the tile decoded the first time.
pub fn compose_ids<'a, I>(ids: I, dir: &Path, size: u32) -> anyhow::Result<RgbaImage>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut decoded: HashMap<&str, RgbaImage> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for id in ids {
        if !decoded.contains_key(id) {
            let path: PathBuf = dir.join(format!("{id}.png"));
            let tile = fit_tile(&assets::open_rgba(&path)?, size, &path);
            decoded.insert(id, tile);
        }
        order.push(id);
    }
    let refs: Vec<&RgbaImage> = order.iter().map(|id| &decoded[id]).collect();
    stack(&refs, size)
}

pub fn write_sheet(sheet: &RgbaImage, output: &Path) -> anyhow::Result<()> {
    assets::save_png(sheet, output)?;
    info!(
        "Wrote {}x{} sheet ({} tiles) to '{}'.",
        sheet.width(),
        sheet.height(),
        sheet.height() / sheet.width().max(1),
        output.display()
    );
    Ok(())
}
