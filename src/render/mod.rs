//! Result rendering.
//!
//! Turns a [`ResultPayload`] into a render plan: one [`Section`] per
//! non-empty category, each holding a [`Table`] whose columns come from the
//! first record of the category. Tables carry per-column filters that toggle
//! row visibility.

pub mod filter;

use serde_json::Value;

use crate::payload::{self, Category, ResultPayload};

pub use filter::{FilterError, FilterMode, FilterSpec, FilterState};

pub const ERROR_NOTICE: &str = "Error fetching data. Please try again later.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeadingStyle {
    /// Only the first underscore becomes a space.
    #[default]
    First,
    /// Every underscore becomes a space.
    All,
}

impl HeadingStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "first" => Some(Self::First),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::All => "all",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub heading_style: HeadingStyle,
    pub filter_mode: FilterMode,
}

pub fn section_heading(category: &str, style: HeadingStyle) -> String {
    let spaced = match style {
        HeadingStyle::First => category.replacen('_', " ", 1),
        HeadingStyle::All => category.replace('_', " "),
    };
    spaced.to_uppercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<String>,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    filters: FilterState,
    mode: FilterMode,
}

impl Table {
    /// Builds a table from a non-empty record list.
    ///
    /// Columns are the keys of the first record; every record is read by
    /// key name so rows stay aligned when later records differ in shape.
    pub fn from_records(records: &[Value], mode: FilterMode) -> Self {
        let columns = records.first().map(payload::record_keys).unwrap_or_default();
        let rows = records
            .iter()
            .map(|record| Row {
                cells: columns
                    .iter()
                    .map(|key| payload::cell_text(record, key))
                    .collect(),
                visible: true,
            })
            .collect();
        Self {
            columns,
            rows,
            filters: FilterState::default(),
            mode,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows().count()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Applies one edit of the filter input under `column`.
    pub fn set_filter(&mut self, column: usize, text: &str) -> Result<(), FilterError> {
        if column >= self.columns.len() {
            return Err(FilterError::UnknownColumn {
                column,
                columns: self.columns.len(),
            });
        }
        self.filters.set(column, text);

        match self.mode {
            FilterMode::Conjunctive => {
                for row in self.rows.iter_mut() {
                    row.visible = self.filters.matches_all(&row.cells);
                }
            }
            FilterMode::LastTriggered => {
                let needle = self.filters.get(column).unwrap_or("");
                for row in self.rows.iter_mut() {
                    if let Some(cell) = row.cells.get(column) {
                        row.visible = filter::contains_folded(cell, needle);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn set_filter_by_name(&mut self, name: &str, text: &str) -> Result<(), FilterError> {
        let column = self
            .column_index(name)
            .ok_or_else(|| FilterError::UnknownColumnName {
                name: name.to_string(),
            })?;
        self.set_filter(column, text)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        for row in self.rows.iter_mut() {
            row.visible = true;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub category: String,
    pub heading: String,
    pub table: Table,
}

/// The owned area results are drawn into.
///
/// Holds either nothing, the sections of the last rendered payload, or a
/// single error notice. Every render starts from a cleared surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderSurface {
    sections: Vec<Section>,
    notice: Option<String>,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
        self.notice = None;
    }

    /// Replaces the surface content with `payload`. Returns the number of
    /// sections drawn.
    pub fn render(&mut self, payload: &ResultPayload, options: &RenderOptions) -> usize {
        self.clear();
        for (name, category) in payload.categories() {
            let records = match category {
                Category::Records(records) if !records.is_empty() => records,
                _ => continue,
            };
            self.sections.push(Section {
                category: name.to_string(),
                heading: section_heading(name, options.heading_style),
                table: Table::from_records(records, options.filter_mode),
            });
        }
        self.sections.len()
    }

    /// Applies `spec` to the tables it addresses. Without a category every
    /// table that has the column is filtered. Returns the number of tables
    /// touched.
    ///
    /// A prefix that names no section is read back as part of the column
    /// name, so `ses:caller-identity=x` reaches a `ses:caller-identity`
    /// column when there is no `ses` category.
    pub fn apply_filter(&mut self, spec: &FilterSpec) -> Result<usize, FilterError> {
        let Some(category) = spec.category.as_deref() else {
            return self.filter_every_table(&spec.column, &spec.text);
        };
        if let Some(section) = self.section_mut(category) {
            section.table.set_filter_by_name(&spec.column, &spec.text)?;
            return Ok(1);
        }

        let joined = format!("{category}:{}", spec.column);
        match self.filter_every_table(&joined, &spec.text)? {
            0 => Err(FilterError::UnknownCategory {
                name: category.to_string(),
            }),
            touched => Ok(touched),
        }
    }

    fn filter_every_table(&mut self, name: &str, text: &str) -> Result<usize, FilterError> {
        let mut touched = 0;
        for section in self.sections.iter_mut() {
            if let Some(column) = section.table.column_index(name) {
                section.table.set_filter(column, text)?;
                touched += 1;
            }
        }
        Ok(touched)
    }

    pub fn show_error(&mut self) {
        self.clear();
        self.notice = Some(ERROR_NOTICE.to_string());
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    pub fn section_mut(&mut self, category: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.category == category)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.notice.is_none()
    }
}
