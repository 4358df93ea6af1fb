use crate::core::network::Transport;
use anyhow::{Context, bail};
use log::{debug, info};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Only remote entries whose image URL points at a standard emoji are kept;
/// the rest are custom images with no code point sequence.
const UNICODE_MARKER: &str = "/unicode/";

const VARIATION_SELECTOR_16: u32 = 0xFE0F;
const ZERO_WIDTH_JOINER: u32 = 0x200D;

/// Ordered name -> identifier mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`. A name that is already present keeps its position and
    /// takes the new identifier.
    pub fn insert(&mut self, name: String, id: String) {
        if let Some(&pos) = self.positions.get(&name) {
            self.entries[pos].1 = id;
            return;
        }
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push((name, id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Identifiers in catalog order, one per name (duplicates included).
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, id)| id.as_str())
    }

    /// Distinct identifiers in first-seen order.
    pub fn distinct_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.ids().filter(|id| seen.insert(*id)).collect()
    }

    pub fn names_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, v)| v == id)
            .map(|(n, _)| n.as_str())
    }
}

impl FromIterator<(String, String)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (name, id) in iter {
            catalog.insert(name, id);
        }
        catalog
    }
}

// --- Remote catalog ---

/// Derives the identifier from an image URL: the last path segment without
/// its extension. A value without any `.` is used whole before taking the
/// segment.
pub fn id_from_url(url: &str) -> &str {
    let stem = url.rsplit_once('.').map_or(url, |(head, _)| head);
    stem.rsplit_once('/').map_or(stem, |(_, tail)| tail)
}

/// Builds a catalog from a JSON object of `name -> image URL`.
pub fn from_remote_json(value: &serde_json::Value) -> anyhow::Result<Catalog> {
    let Some(object) = value.as_object() else {
        bail!("catalog is not a JSON object");
    };

    let mut catalog = Catalog::new();
    for (name, url) in object {
        let Some(url) = url.as_str() else {
            debug!("Skipping catalog entry '{name}': value is not a string");
            continue;
        };
        if !url.contains(UNICODE_MARKER) {
            continue;
        }
        catalog.insert(name.clone(), id_from_url(url).to_string());
    }
    Ok(catalog)
}

pub fn fetch_remote<T: Transport>(transport: &T, url: &str) -> anyhow::Result<Catalog> {
    info!("Fetching emoji catalog from {url}");
    let value = transport
        .get_json(url)
        .with_context(|| format!("Failed to fetch catalog from {url}"))?;
    let catalog = from_remote_json(&value)?;
    info!(
        "Catalog has {} names over {} images.",
        catalog.len(),
        catalog.distinct_ids().len()
    );
    Ok(catalog)
}

// --- Local catalog ---

#[derive(Deserialize, Debug)]
struct LocalEntry {
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default, alias = "names")]
    aliases: Vec<String>,
}

/// Turns an emoji string into its file identifier: lowercase hex code points
/// joined by `-`. U+FE0F is dropped unless the sequence contains U+200D.
pub fn id_from_emoji(emoji: &str) -> String {
    let code_points: Vec<u32> = emoji.chars().map(u32::from).collect();
    let keep_selector = code_points.contains(&ZERO_WIDTH_JOINER);
    code_points
        .into_iter()
        .filter(|&cp| keep_selector || cp != VARIATION_SELECTOR_16)
        .map(|cp| format!("{cp:x}"))
        .collect::<Vec<_>>()
        .join("-")
}

pub fn from_local_json(content: &str) -> anyhow::Result<Catalog> {
    let entries: Vec<LocalEntry> =
        serde_json::from_str(content).context("local catalog is not a JSON array of entries")?;

    let mut catalog = Catalog::new();
    for (i, entry) in entries.into_iter().enumerate() {
        let Some(emoji) = entry.emoji.filter(|e| !e.is_empty()) else {
            debug!("Skipping local catalog entry #{i}: no emoji");
            continue;
        };
        if entry.aliases.is_empty() {
            debug!("Skipping local catalog entry #{i}: no names");
            continue;
        }
        let id = id_from_emoji(&emoji);
        for name in entry.aliases {
            catalog.insert(name, id.clone());
        }
    }
    Ok(catalog)
}

pub fn load_local(path: &Path) -> anyhow::Result<Catalog> {
    info!("Reading emoji catalog from '{}'", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog '{}'", path.display()))?;
    let catalog = from_local_json(&content)
        .with_context(|| format!("Failed to parse catalog '{}'", path.display()))?;
    info!(
        "Catalog has {} names over {} images.",
        catalog.len(),
        catalog.distinct_ids().len()
    );
    Ok(catalog)
}
