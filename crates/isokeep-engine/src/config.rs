//! Run configuration: which titles, which variants, into which folders.
//!
//! The TOML layout mirrors the collection's folder layout. A table named
//! after a catalog title configures that title; any other table is a
//! directory grouping and its children land underneath it:
//!
//! ```toml
//! [Linux]
//! [Linux.Debian]
//! editions = ["kde"]
//!
//! [Utilities]
//! directory = "Tools"
//! [Utilities.MemTest86Plus]
//! enabled = true
//! ```
//!
//! puts the Debian image in `<root>/Linux/` and memtest in
//! `<root>/Tools/`.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;
use toml::Value;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("configuration enables no titles")]
    Empty,
}

/// One configured title occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Catalog name as written in the config (case preserved).
    pub title: String,
    /// Directory relative to the collection root.
    pub directory: PathBuf,
    pub editions: Vec<String>,
    pub archs: Vec<String>,
    pub langs: Vec<String>,
}

/// The parsed run configuration. Immutable once built; the dispatcher
/// receives it as explicit context.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub entries: Vec<ConfigEntry>,
}

impl RunConfig {
    /// Parse a configuration against the set of known title names.
    /// Disabled titles are dropped here, not carried as dead entries.
    pub fn parse(text: &str, known_titles: &[String]) -> Result<Self, ConfigError> {
        let root: Value = text.parse()?;
        let known: HashSet<String> = known_titles.iter().map(|s| s.to_lowercase()).collect();

        let mut entries = Vec::new();
        if let Value::Table(table) = root {
            collect(&table, PathBuf::new(), &known, &mut entries);
        }
        if entries.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(Self { entries })
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn is_enabled(table: &toml::map::Map<String, Value>) -> bool {
    table
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

fn collect(
    table: &toml::map::Map<String, Value>,
    dir: PathBuf,
    known: &HashSet<String>,
    entries: &mut Vec<ConfigEntry>,
) {
    for (key, value) in table {
        let Value::Table(child) = value else {
            continue;
        };
        if !is_enabled(child) {
            debug!(title = key, "skipping disabled entry");
            continue;
        }
        if known.contains(&key.to_lowercase()) {
            entries.push(ConfigEntry {
                title: key.clone(),
                directory: dir.clone(),
                editions: string_array(child.get("editions")),
                archs: string_array(child.get("architectures")),
                langs: string_array(child.get("langs")),
            });
        } else if child.values().any(Value::is_table) {
            // A directory grouping; an explicit `directory` key renames it.
            let name = child
                .get("directory")
                .and_then(Value::as_str)
                .unwrap_or(key);
            collect(child, dir.join(name), known, entries);
        } else {
            warn!(table = key, "ignoring unknown title");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        ["Debian", "MemTest86Plus", "ArchLinux", "Windows11"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn flat_titles_land_at_the_root() {
        let config = RunConfig::parse(
            r#"
[Debian]
editions = ["kde", "gnome"]

[ArchLinux]
"#,
            &known(),
        )
        .unwrap();

        assert_eq!(config.entries.len(), 2);
        let debian = config.entries.iter().find(|e| e.title == "Debian").unwrap();
        assert_eq!(debian.directory, PathBuf::new());
        assert_eq!(debian.editions, vec!["kde", "gnome"]);
    }

    #[test]
    fn groups_nest_directories() {
        let config = RunConfig::parse(
            r#"
[Linux]
[Linux.Debian]
editions = ["xfce"]

[Linux.Arch.ArchLinux]
"#,
            &known(),
        )
        .unwrap();

        let debian = config.entries.iter().find(|e| e.title == "Debian").unwrap();
        assert_eq!(debian.directory, PathBuf::from("Linux"));
        let arch = config
            .entries
            .iter()
            .find(|e| e.title == "ArchLinux")
            .unwrap();
        assert_eq!(arch.directory, PathBuf::from("Linux").join("Arch"));
    }

    #[test]
    fn directory_key_renames_a_group() {
        let config = RunConfig::parse(
            r#"
[Utilities]
directory = "Tools"
[Utilities.MemTest86Plus]
"#,
            &known(),
        )
        .unwrap();
        assert_eq!(config.entries[0].directory, PathBuf::from("Tools"));
    }

    #[test]
    fn disabled_titles_are_dropped() {
        let err = RunConfig::parse(
            r#"
[Debian]
enabled = false
"#,
            &known(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Empty));
    }

    #[test]
    fn disabled_group_drops_its_children() {
        let config = RunConfig::parse(
            r#"
[ArchLinux]

[Linux]
enabled = false
[Linux.Debian]
"#,
            &known(),
        )
        .unwrap();
        assert_eq!(config.entries.len(), 1);
        assert_eq!(config.entries[0].title, "ArchLinux");
    }

    #[test]
    fn langs_are_read() {
        let config = RunConfig::parse(
            r#"
[Windows11]
langs = ["English", "EnglishInternational"]
"#,
            &known(),
        )
        .unwrap();
        assert_eq!(config.entries[0].langs.len(), 2);
    }

    #[test]
    fn title_casing_is_forgiving() {
        let config = RunConfig::parse("[debian]\n", &known()).unwrap();
        assert_eq!(config.entries[0].title, "debian");
    }
}
