use crate::alpha;
use crate::catalog::{self, Catalog};
use crate::compose;
use crate::config::{self, CatalogSource, Config, Layout};
use crate::core::network::{HttpTransport, Transport};
use crate::fetch;
use crate::index;
use crate::optimize::Optimizer;
use crate::raster::Rasterizer;
use anyhow::bail;
use log::{info, warn};
use std::time::Instant;

pub fn resolve_catalog<T: Transport>(cfg: &Config, transport: &T) -> anyhow::Result<Catalog> {
    let catalog = match cfg.catalog {
        CatalogSource::Remote => catalog::fetch_remote(transport, &cfg.catalog_url)?,
        CatalogSource::Local => catalog::load_local(&cfg.local_catalog_path)?,
    };
    if catalog.is_empty() {
        bail!("Emoji catalog is empty; nothing to build.");
    }
    Ok(catalog)
}

/// Index, sheet and alpha rounding over an already rasterized tile directory.
pub fn build_sheet(cfg: &Config, catalog: &Catalog) -> anyhow::Result<()> {
    let sheet = match cfg.layout {
        Layout::Sorted => {
            index::write_row_index(catalog, &cfg.png_dir, &cfg.names_path)?;
            compose::compose_sorted(&cfg.png_dir, cfg.tile_size)?
        }
        Layout::Mapping => {
            index::write_name_list(catalog, &cfg.names_path)?;
            compose::compose_ids(catalog.ids(), &cfg.png_dir, cfg.tile_size)?
        }
    };
    compose::write_sheet(&sheet, &cfg.sheet_path)?;
    alpha::threshold_file(&cfg.sheet_path, cfg.alpha_threshold)
}

pub fn run_with<T: Transport>(cfg: &Config, transport: &T) -> anyhow::Result<()> {
    let started = Instant::now();

    let catalog = resolve_catalog(cfg, transport)?;
    let ids = catalog.distinct_ids();
    let report = fetch::download_svgs(transport, ids, &cfg.svg_dir, &cfg.svg_url_template)?;
    if !report.failed_urls.is_empty() {
        warn!(
            "{} SVGs could not be downloaded; their tiles will be missing.",
            report.failed_urls.len()
        );
    }

    Rasterizer::from_config(cfg).rasterize_dir(&cfg.svg_dir, &cfg.png_dir, cfg.tile_size)?;
    build_sheet(cfg, &catalog)?;

    if cfg.optimize {
        Optimizer::from_config(cfg).run(&cfg.sheet_path);
    }

    info!(
        "Built '{}' and '{}' in {:.1}s.",
        cfg.sheet_path.display(),
        cfg.names_path.display(),
        started.elapsed().as_secs_f32()
    );
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cfg = config::get();
    let transport = HttpTransport::new(cfg.request_timeout());
    run_with(&cfg, &transport)
}

#[cfg(test)]
mod tests {
    use super::{build_sheet, resolve_catalog};
    use crate::assets::{open_rgba, save_png};
    use crate::catalog::Catalog;
    use crate::config::{CatalogSource, Config, Layout};
    use crate::core::network::Transport;
    use anyhow::bail;
    use image::{Rgba, RgbaImage, imageops};
    use serde_json::json;
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    struct CatalogOnly(serde_json::Value);

    impl Transport for CatalogOnly {
        fn get_json(&self, _url: &str) -> anyhow::Result<serde_json::Value> {
            Ok(self.0.clone())
        }

        fn download(&self, url: &str, _out: &mut dyn Write) -> anyhow::Result<u64> {
            bail!("unexpected download of {url}")
        }
    }

    struct Offline;

    impl Transport for Offline {
        fn get_json(&self, url: &str) -> anyhow::Result<serde_json::Value> {
            bail!("offline: {url}")
        }

        fn download(&self, url: &str, _out: &mut dyn Write) -> anyhow::Result<u64> {
            bail!("offline: {url}")
        }
    }

    fn config_in(root: &Path, layout: Layout) -> Config {
        Config {
            layout,
            svg_dir: root.join("svg"),
            png_dir: root.join("png"),
            sheet_path: root.join("emojis.png"),
            names_path: root.join("names.csv"),
            tile_size: 2,
            ..Config::default()
        }
    }

    fn catalog(pairs: &[(&str, &str)]) -> Catalog {
        pairs
            .iter()
            .map(|(n, id)| (n.to_string(), id.to_string()))
            .collect()
    }

    /// Two 2x2 tiles: "a" half-transparent red, "b" mostly opaque green.
    fn write_tiles(png_dir: &Path) {
        save_png(
            &RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 100])),
            &png_dir.join("a.png"),
        )
        .unwrap();
        save_png(
            &RgbaImage::from_pixel(2, 2, Rgba([0, 200, 0, 101])),
            &png_dir.join("b.png"),
        )
        .unwrap();
    }

    #[test]
    fn sorted_layout_rows_match_index() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), Layout::Sorted);
        write_tiles(&cfg.png_dir);

        build_sheet(&cfg, &catalog(&[("x", "b"), ("y", "a"), ("z", "b")])).unwrap();

        let names = fs::read_to_string(&cfg.names_path).unwrap();
        assert_eq!(names, "y,0\nx,1\nz,1\n");

        let sheet = open_rgba(&cfg.sheet_path).unwrap();
        assert_eq!(sheet.dimensions(), (2, 4));
        let row = |i: u32| imageops::crop_imm(&sheet, 0, i * 2, 2, 2).to_image();
        assert_eq!(row(0), RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 0])));
        assert_eq!(row(1), RgbaImage::from_pixel(2, 2, Rgba([0, 200, 0, 255])));
    }

    #[test]
    fn mapping_layout_has_one_row_per_name() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), Layout::Mapping);
        write_tiles(&cfg.png_dir);

        build_sheet(&cfg, &catalog(&[("x", "b"), ("y", "a"), ("z", "b")])).unwrap();

        assert_eq!(fs::read_to_string(&cfg.names_path).unwrap(), "x,y,z\n");
        let sheet = open_rgba(&cfg.sheet_path).unwrap();
        assert_eq!(sheet.dimensions(), (2, 6));
        assert_eq!(*sheet.get_pixel(0, 0), Rgba([0, 200, 0, 255]));
        assert_eq!(*sheet.get_pixel(0, 2), Rgba([200, 0, 0, 0]));
        assert_eq!(*sheet.get_pixel(1, 5), Rgba([0, 200, 0, 255]));
    }

    #[test]
    fn missing_tile_aborts_mapping_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), Layout::Mapping);
        write_tiles(&cfg.png_dir);
        assert!(build_sheet(&cfg, &catalog(&[("x", "b"), ("gone", "c")])).is_err());
    }

    #[test]
    fn remote_catalog_comes_from_transport() {
        let cfg = Config::default();
        let transport = CatalogOnly(json!({"smile": "https://e/unicode/1f604.png?v8"}));
        let catalog = resolve_catalog(&cfg, &transport).unwrap();
        assert_eq!(catalog.iter().collect::<Vec<_>>(), vec![("smile", "1f604")]);
    }

    #[test]
    fn catalog_failures_are_fatal() {
        let cfg = Config::default();
        assert!(resolve_catalog(&cfg, &Offline).is_err());

        let only_custom = CatalogOnly(json!({"octocat": "https://e/octocat.png"}));
        assert!(resolve_catalog(&cfg, &only_custom).is_err());

        let dir = tempfile::tempdir().unwrap();
        let local = Config {
            catalog: CatalogSource::Local,
            local_catalog_path: dir.path().join("missing.json"),
            ..Config::default()
        };
        assert!(resolve_catalog(&local, &Offline).is_err());
    }
}
