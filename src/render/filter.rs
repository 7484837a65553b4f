use std::collections::BTreeMap;

use thiserror::Error;

/// How column filters combine when more than one is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// A row is visible only when every active column filter matches it.
    #[default]
    Conjunctive,
    /// Only the filter that last changed is evaluated; it overwrites the
    /// visibility of every row.
    LastTriggered,
}

impl FilterMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "and" | "all" | "conjunctive" => Some(Self::Conjunctive),
            "last" | "last-triggered" | "legacy" => Some(Self::LastTriggered),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Conjunctive => "and",
            Self::LastTriggered => "last",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("column index {column} out of range (table has {columns} columns)")]
    UnknownColumn { column: usize, columns: usize },

    #[error("no column named '{name}'")]
    UnknownColumnName { name: String },

    #[error("no rendered category named '{name}'")]
    UnknownCategory { name: String },
}

/// A filter given as `[CATEGORY:]COLUMN=TEXT`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub category: Option<String>,
    pub column: String,
    pub text: String,
}

impl FilterSpec {
    pub fn parse(value: &str) -> Result<Self, String> {
        let (target, text) = value
            .split_once('=')
            .ok_or_else(|| "expected [CATEGORY:]COLUMN=TEXT".to_string())?;
        let (category, column) = match target.split_once(':') {
            Some((category, column)) => (Some(category.trim()), column.trim()),
            None => (None, target.trim()),
        };
        if column.is_empty() {
            return Err("column name is empty".to_string());
        }
        if category.is_some_and(str::is_empty) {
            return Err("category name is empty".to_string());
        }
        Ok(Self {
            category: category.map(str::to_string),
            column: column.to_string(),
            text: text.to_string(),
        })
    }
}

/// Current filter text per column index, stored lower-cased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    active: BTreeMap<usize, String>,
}

impl FilterState {
    /// Records new text for `column`. Empty text deactivates the filter.
    pub fn set(&mut self, column: usize, text: &str) {
        let needle = text.to_lowercase();
        if needle.is_empty() {
            self.active.remove(&column);
        } else {
            self.active.insert(column, needle);
        }
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.active.get(&column).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = (usize, &str)> {
        self.active.iter().map(|(c, s)| (*c, s.as_str()))
    }

    /// True when every active filter matches its cell in `cells`.
    pub fn matches_all(&self, cells: &[String]) -> bool {
        self.active.iter().all(|(column, needle)| match cells.get(*column) {
            Some(cell) => contains_folded(cell, needle),
            None => true,
        })
    }
}

/// Case-insensitive literal substring match. `needle` must already be lower-case.
pub fn contains_folded(cell: &str, needle: &str) -> bool {
    needle.is_empty() || cell.to_lowercase().contains(needle)
}
