use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

const CONFIG_PATH: &str = "emojisheet.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();

        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let name = &line[1..line.len() - 1];
                let section = name.trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                // Skip '=' and trim whitespace from the value.
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Query the remote name -> image URL catalog over HTTP.
    Remote,
    /// Read a local emoji document and derive identifiers from the characters.
    Local,
}

impl CatalogSource {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "Remote",
            Self::Local => "Local",
        }
    }
}

impl FromStr for CatalogSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            _ => Err(()),
        }
    }
}

/// How rows of the sheet are ordered, and with it which index format is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One row per rasterized file, sorted by file name; index is `name,row`.
    Sorted,
    /// One row per catalog entry, in catalog order; index is the joined name list.
    Mapping,
}

impl Layout {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Sorted => "Sorted",
            Self::Mapping => "Mapping",
        }
    }
}

impl FromStr for Layout {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sorted" => Ok(Self::Sorted),
            "mapping" => Ok(Self::Mapping),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterizerDialect {
    /// `-f in -e out -w N -h N` lines, as understood by the 0.9x shell.
    Legacy,
    /// `file-open:..; export-do` action lines, as understood by the 1.x shell.
    Actions,
}

impl RasterizerDialect {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "Legacy",
            Self::Actions => "Actions",
        }
    }
}

impl FromStr for RasterizerDialect {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "actions" => Ok(Self::Actions),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub catalog: CatalogSource,
    pub catalog_url: String,
    pub local_catalog_path: PathBuf,
    /// Download URL; `{id}` is replaced with the identifier.
    pub svg_url_template: String,
    pub request_timeout_seconds: u64,
    pub tile_size: u32,
    /// Alpha values strictly above this become opaque, the rest transparent.
    pub alpha_threshold: u8,
    pub layout: Layout,
    pub svg_dir: PathBuf,
    pub png_dir: PathBuf,
    pub sheet_path: PathBuf,
    pub names_path: PathBuf,
    pub log_level: LogLevel,
    pub rasterizer: String,
    pub rasterizer_args: Vec<String>,
    pub rasterizer_dialect: RasterizerDialect,
    pub optimize: bool,
    pub optimizer: String,
    /// Maximum palette size handed to the optimizer.
    pub optimizer_palette: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogSource::Remote,
            catalog_url: "https://api.github.com/emojis".to_string(),
            local_catalog_path: PathBuf::from("emoji.json"),
            svg_url_template: "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/svg/{id}.svg"
                .to_string(),
            request_timeout_seconds: 30,
            tile_size: 16,
            alpha_threshold: crate::alpha::DEFAULT_ALPHA_THRESHOLD,
            layout: Layout::Sorted,
            svg_dir: PathBuf::from("svg"),
            png_dir: PathBuf::from("png"),
            sheet_path: PathBuf::from("emojis.png"),
            names_path: PathBuf::from("names.csv"),
            log_level: LogLevel::Info,
            rasterizer: "inkscape".to_string(),
            rasterizer_args: vec!["--shell".to_string()],
            rasterizer_dialect: RasterizerDialect::Legacy,
            optimize: true,
            optimizer: "pingo".to_string(),
            optimizer_palette: 100,
        }
    }
}

impl Config {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

#[inline(always)]
const fn flag_str(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

fn parse_flag(raw: &str) -> Option<bool> {
    let v = raw.trim();
    if v.is_empty() {
        None
    } else if v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

fn non_empty(v: String) -> Option<String> {
    let v = v.trim().to_string();
    if v.is_empty() { None } else { Some(v) }
}

fn default_config_content() -> String {
    let default = Config::default();
    let mut content = String::new();

    // [Options] section - keys in alphabetical order
    content.push_str("[Options]\n");
    content.push_str(&format!("AlphaThreshold={}\n", default.alpha_threshold));
    content.push_str(&format!("Catalog={}\n", default.catalog.as_str()));
    content.push_str(&format!("CatalogUrl={}\n", default.catalog_url));
    content.push_str(&format!("Layout={}\n", default.layout.as_str()));
    content.push_str(&format!(
        "LocalCatalogPath={}\n",
        default.local_catalog_path.display()
    ));
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push_str(&format!("NamesPath={}\n", default.names_path.display()));
    content.push_str(&format!("PngDir={}\n", default.png_dir.display()));
    content.push_str(&format!(
        "RequestTimeoutSeconds={}\n",
        default.request_timeout_seconds
    ));
    content.push_str(&format!("SheetPath={}\n", default.sheet_path.display()));
    content.push_str(&format!("SvgDir={}\n", default.svg_dir.display()));
    content.push_str(&format!("SvgUrlTemplate={}\n", default.svg_url_template));
    content.push_str(&format!("TileSize={}\n", default.tile_size));
    content.push('\n');

    content.push_str("[Tools]\n");
    content.push_str(&format!("Optimize={}\n", flag_str(default.optimize)));
    content.push_str(&format!("Optimizer={}\n", default.optimizer));
    content.push_str(&format!("OptimizerPalette={}\n", default.optimizer_palette));
    content.push_str(&format!("Rasterizer={}\n", default.rasterizer));
    content.push_str(&format!(
        "RasterizerArgs={}\n",
        default.rasterizer_args.join(" ")
    ));
    content.push_str(&format!(
        "RasterizerDialect={}\n",
        default.rasterizer_dialect.as_str()
    ));
    content.push('\n');

    content
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, default_config_content())
}

/// Builds a config from parsed INI content, using defaults for missing or
/// malformed keys.
pub fn from_ini(conf: &SimpleIni) -> Config {
    let default = Config::default();

    Config {
        catalog: conf
            .get("Options", "Catalog")
            .and_then(|v| CatalogSource::from_str(&v).ok())
            .unwrap_or(default.catalog),
        catalog_url: conf
            .get("Options", "CatalogUrl")
            .and_then(non_empty)
            .unwrap_or(default.catalog_url),
        local_catalog_path: conf
            .get("Options", "LocalCatalogPath")
            .and_then(non_empty)
            .map_or(default.local_catalog_path, PathBuf::from),
        svg_url_template: conf
            .get("Options", "SvgUrlTemplate")
            .and_then(non_empty)
            .filter(|v| {
                let ok = v.contains(crate::fetch::ID_PLACEHOLDER);
                if !ok {
                    warn!("SvgUrlTemplate '{v}' has no {{id}} placeholder; using default.");
                }
                ok
            })
            .unwrap_or(default.svg_url_template),
        request_timeout_seconds: conf
            .get("Options", "RequestTimeoutSeconds")
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default.request_timeout_seconds, |v| v.clamp(1, 600)),
        tile_size: conf
            .get("Options", "TileSize")
            .and_then(|v| v.parse::<u32>().ok())
            .map_or(default.tile_size, |v| v.clamp(1, 1024)),
        alpha_threshold: conf
            .get("Options", "AlphaThreshold")
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(default.alpha_threshold),
        layout: conf
            .get("Options", "Layout")
            .and_then(|v| Layout::from_str(&v).ok())
            .unwrap_or(default.layout),
        svg_dir: conf
            .get("Options", "SvgDir")
            .and_then(non_empty)
            .map_or(default.svg_dir, PathBuf::from),
        png_dir: conf
            .get("Options", "PngDir")
            .and_then(non_empty)
            .map_or(default.png_dir, PathBuf::from),
        sheet_path: conf
            .get("Options", "SheetPath")
            .and_then(non_empty)
            .map_or(default.sheet_path, PathBuf::from),
        names_path: conf
            .get("Options", "NamesPath")
            .and_then(non_empty)
            .map_or(default.names_path, PathBuf::from),
        log_level: conf
            .get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(&v).ok())
            .unwrap_or(default.log_level),
        rasterizer: conf
            .get("Tools", "Rasterizer")
            .and_then(non_empty)
            .unwrap_or(default.rasterizer),
        // An explicitly empty value means "no arguments".
        rasterizer_args: conf
            .get("Tools", "RasterizerArgs")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or(default.rasterizer_args),
        rasterizer_dialect: conf
            .get("Tools", "RasterizerDialect")
            .and_then(|v| RasterizerDialect::from_str(&v).ok())
            .unwrap_or(default.rasterizer_dialect),
        optimize: conf
            .get("Tools", "Optimize")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default.optimize),
        optimizer: conf
            .get("Tools", "Optimizer")
            .and_then(non_empty)
            .unwrap_or(default.optimizer),
        optimizer_palette: conf
            .get("Tools", "OptimizerPalette")
            .and_then(|v| v.parse::<u16>().ok())
            .map_or(default.optimizer_palette, |v| v.clamp(2, 256)),
    }
}

pub fn load() {
    let path = Path::new(CONFIG_PATH);
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            *CONFIG.lock().unwrap() = from_ini(&conf);
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
            *CONFIG.lock().unwrap() = Config::default();
        }
    }
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}
