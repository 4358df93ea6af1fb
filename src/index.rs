use crate::assets;
use crate::catalog::Catalog;
use anyhow::Context;
use log::info;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// `name,row` lines: row `i` is the `i`th tile in file-name order; every name
/// whose identifier equals that tile's stem gets a line.
pub fn row_index(catalog: &Catalog, tiles: &[PathBuf]) -> String {
    let mut out = String::new();
    for (row, tile) in tiles.iter().enumerate() {
        let Some(id) = assets::file_stem(tile) else {
            continue;
        };
        for name in catalog.names_for(id) {
            let _ = writeln!(out, "{name},{row}");
        }
    }
    out
}

/// Every name on one line, comma-joined, in catalog order.
pub fn name_list(catalog: &Catalog) -> String {
    let mut out = catalog.names().collect::<Vec<_>>().join(",");
    out.push('\n');
    out
}

fn write(output: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    std::fs::write(output, content)
        .with_context(|| format!("Failed to write '{}'", output.display()))
}

/// Writes the `name,row` index for the PNG tiles found in `tile_dir`.
pub fn write_row_index(catalog: &Catalog, tile_dir: &Path, output: &Path) -> anyhow::Result<()> {
    let tiles = assets::sorted_files(tile_dir, "png")?;
    let content = row_index(catalog, &tiles);
    write(output, &content)?;
    info!(
        "Wrote {} index lines for {} tiles to '{}'.",
        content.lines().count(),
        tiles.len(),
        output.display()
    );
    Ok(())
}

pub fn write_name_list(catalog: &Catalog, output: &Path) -> anyhow::Result<()> {
    write(output, &name_list(catalog))?;
    info!("Wrote {} names to '{}'.", catalog.len(), output.display());
    Ok(())
}
