//! Inline-button callback data.
//!
//! Formats:
//! - `cat_{slug}` / `cat_all`
//! - `period_{days}_{slug}`
//! - `page_{page}_{slug}_{days}`
//! - `page_info`
//! - `back_to_categories`
//!
//! Slugs may contain underscores; numeric parts are taken from the fixed
//! positions around them. Anyone can send arbitrary callback data, so days
//! and page numbers are range-checked here before they reach a query.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Longest period a callback may ask for.
pub const MAX_PERIOD_DAYS: i64 = 365;

/// Highest page number a callback may ask for.
pub const MAX_PAGE: i64 = 10_000;

const ALL: &str = "all";

fn valid_days(days: i64) -> bool {
    (1..=MAX_PERIOD_DAYS).contains(&days)
}

fn valid_page(page: i64) -> bool {
    (0..=MAX_PAGE).contains(&page)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    #[error("Unknown callback data: {0}")]
    Unknown(String),

    #[error("Malformed callback data: {0}")]
    Malformed(String),

    #[error("Callback data exceeds {MAX_CALLBACK_BYTES} bytes: {0}")]
    TooLong(String),
}

/// Which categories a listing covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategorySelection {
    All,
    Slug(String),
}

impl CategorySelection {
    pub fn from_slug(slug: &str) -> Self {
        if slug == ALL {
            CategorySelection::All
        } else {
            CategorySelection::Slug(slug.to_string())
        }
    }

    pub fn as_filter(&self) -> Option<&str> {
        match self {
            CategorySelection::All => None,
            CategorySelection::Slug(slug) => Some(slug),
        }
    }
}

impl fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelection::All => f.write_str(ALL),
            CategorySelection::Slug(slug) => f.write_str(slug),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackData {
    Category(CategorySelection),
    Period {
        days: i64,
        category: CategorySelection,
    },
    Page {
        page: i64,
        category: CategorySelection,
        days: i64,
    },
    PageInfo,
    BackToCategories,
}

impl CallbackData {
    /// Wire form, refusing anything Telegram would reject.
    pub fn encode(&self) -> Result<String, CallbackParseError> {
        let data = self.to_string();
        if data.len() > MAX_CALLBACK_BYTES {
            return Err(CallbackParseError::TooLong(data));
        }
        Ok(data)
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::Category(category) => write!(f, "cat_{}", category),
            CallbackData::Period { days, category } => write!(f, "period_{}_{}", days, category),
            CallbackData::Page {
                page,
                category,
                days,
            } => write!(f, "page_{}_{}_{}", page, category, days),
            CallbackData::PageInfo => f.write_str("page_info"),
            CallbackData::BackToCategories => f.write_str("back_to_categories"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let malformed = || CallbackParseError::Malformed(data.to_string());

        match data {
            "page_info" => return Ok(CallbackData::PageInfo),
            "back_to_categories" => return Ok(CallbackData::BackToCategories),
            _ => {}
        }

        if let Some(slug) = data.strip_prefix("cat_") {
            if slug.is_empty() {
                return Err(malformed());
            }
            return Ok(CallbackData::Category(CategorySelection::from_slug(slug)));
        }

        if let Some(rest) = data.strip_prefix("period_") {
            let (days, slug) = rest.split_once('_').ok_or_else(malformed)?;
            let days = days.parse::<i64>().map_err(|_| malformed())?;
            if !valid_days(days) || slug.is_empty() {
                return Err(malformed());
            }
            return Ok(CallbackData::Period {
                days,
                category: CategorySelection::from_slug(slug),
            });
        }

        if let Some(rest) = data.strip_prefix("page_") {
            let (page, rest) = rest.split_once('_').ok_or_else(malformed)?;
            let (slug, days) = rest.rsplit_once('_').ok_or_else(malformed)?;
            let page = page.parse::<i64>().map_err(|_| malformed())?;
            let days = days.parse::<i64>().map_err(|_| malformed())?;
            if !valid_page(page) || !valid_days(days) || slug.is_empty() {
                return Err(malformed());
            }
            return Ok(CallbackData::Page {
                page,
                category: CategorySelection::from_slug(slug),
                days,
            });
        }

        Err(CallbackParseError::Unknown(data.to_string()))
    }
}
