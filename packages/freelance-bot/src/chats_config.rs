//! Category → chat mapping loaded from a YAML/TOML/JSON file.
//!
//! ```yaml
//! settings:
//!   parse_days: 2
//! categories:
//!   web_dev:
//!     name: "Web development"
//!     description: "Sites, backends, landing pages"
//!     chats: ["@freelance_web", -1001234567890]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use config::{File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PARSE_DAYS: i64 = 2;
pub const MAX_PARSE_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file is empty")]
    Empty,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration must contain 'categories' key")]
    MissingCategories,

    #[error("Category '{slug}' must have '{field}' field")]
    MissingField { slug: String, field: &'static str },
}

/// A chat reference as written in the config: `@handle` or a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Numeric strings (`"-100123"`) are treated as ids, everything else as a
    /// username with any leading `@` removed.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => ChatRef::Id(id),
            Err(_) => ChatRef::Username(raw.trim_start_matches('@').to_string()),
        }
    }

    fn normalized(self) -> Self {
        match self {
            ChatRef::Username(name) => ChatRef::parse(&name),
            id => id,
        }
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => write!(f, "@{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub chats: Vec<ChatRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatsConfig {
    pub parse_days: i64,
    /// Ordered by slug.
    pub categories: Vec<CategoryConfig>,
}

impl ChatsConfig {
    pub fn total_chats(&self) -> usize {
        self.categories.iter().map(|c| c.chats.len()).sum()
    }
}

#[derive(Debug, Deserialize)]
struct RawChatsConfig {
    #[serde(default)]
    settings: Option<RawSettings>,
    #[serde(default)]
    categories: Option<BTreeMap<String, RawCategory>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    parse_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    chats: Option<Vec<ChatRef>>,
}

/// Load and validate the chats configuration file.
pub fn load_chats_config(path: impl AsRef<Path>) -> Result<ChatsConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_chats_config(&contents, format_for(path))
}

/// Parse configuration text in the given format.
pub fn parse_chats_config(contents: &str, format: FileFormat) -> Result<ChatsConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Err(ConfigError::Empty);
    }

    let raw: RawChatsConfig = config::Config::builder()
        .add_source(File::from_str(contents, format))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let raw_categories = raw.categories.ok_or(ConfigError::MissingCategories)?;

    let mut categories = Vec::with_capacity(raw_categories.len());
    for (slug, category) in raw_categories {
        let name = category.name.ok_or_else(|| ConfigError::MissingField {
            slug: slug.clone(),
            field: "name",
        })?;
        let chats = category.chats.ok_or_else(|| ConfigError::MissingField {
            slug: slug.clone(),
            field: "chats",
        })?;

        categories.push(CategoryConfig {
            slug,
            name,
            description: category.description,
            chats: chats.into_iter().map(ChatRef::normalized).collect(),
        });
    }

    let parse_days = raw
        .settings
        .unwrap_or_default()
        .parse_days
        .unwrap_or(DEFAULT_PARSE_DAYS);
    if !(1..=MAX_PARSE_DAYS).contains(&parse_days) {
        return Err(ConfigError::Invalid(format!(
            "settings.parse_days must be between 1 and {}, got {}",
            MAX_PARSE_DAYS, parse_days
        )));
    }

    Ok(ChatsConfig {
        parse_days,
        categories,
    })
}

fn format_for(path: &Path) -> FileFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("toml") => FileFormat::Toml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}
