pub mod report;

use itertools::Itertools;
use serde::Serialize;

use crate::render::{RenderSurface, Section, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Xml,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".xml") {
        return Some(OutputFormat::Xml);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// Serialisable view of a surface: visible rows only.
#[derive(Clone, Debug, Serialize)]
pub struct OutputReport<'a> {
    pub notice: Option<&'a str>,
    pub sections: Vec<OutputSection<'a>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputSection<'a> {
    pub category: &'a str,
    pub heading: &'a str,
    pub columns: &'a [String],
    pub total_rows: usize,
    pub rows: Vec<&'a [String]>,
}

pub fn build_report(surface: &RenderSurface) -> OutputReport<'_> {
    OutputReport {
        notice: surface.notice(),
        sections: surface
            .sections()
            .iter()
            .map(|s| OutputSection {
                category: &s.category,
                heading: &s.heading,
                columns: s.table.columns(),
                total_rows: s.table.rows().len(),
                rows: s.table.visible_rows().map(|r| r.cells.as_slice()).collect(),
            })
            .collect(),
    }
}

/// Lays out the visible rows of `table` as aligned plain-text columns.
pub fn format_table(table: &Table) -> String {
    let columns = table.columns();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in table.visible_rows() {
        for (i, cell) in row.cells.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(columns));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("-+-"));
    out.push('\n');
    for row in table.visible_rows() {
        out.push_str(&line(row.cells.as_slice()));
        out.push('\n');
    }
    out
}

/// One line describing active filters and how many rows they let through.
pub fn filter_summary(table: &Table) -> Option<String> {
    if table.filters().is_empty() {
        return None;
    }
    let active = table
        .filters()
        .active()
        .map(|(column, text)| {
            let name = table.columns().get(column).map(String::as_str).unwrap_or("?");
            format!("{name}~\"{text}\"")
        })
        .join(" ");
    Some(format!(
        "{} of {} rows shown ({active})",
        table.visible_count(),
        table.rows().len()
    ))
}

fn render_section_text(section: &Section, out: &mut String) {
    out.push_str(&section.heading);
    out.push('\n');
    out.push_str(&format_table(&section.table));
    if let Some(summary) = filter_summary(&section.table) {
        out.push_str(&summary);
        out.push('\n');
    }
}

pub fn render_text(surface: &RenderSurface) -> Vec<u8> {
    let mut out = String::new();
    if let Some(notice) = surface.notice() {
        out.push_str(notice);
        out.push('\n');
        return out.into_bytes();
    }
    for (i, section) in surface.sections().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_section_text(section, &mut out);
    }
    out.into_bytes()
}

pub fn render_json(surface: &RenderSurface) -> Vec<u8> {
    serde_json::to_vec_pretty(&build_report(surface)).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub(crate) fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn render_xml(surface: &RenderSurface) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str("<results>\n");
    if let Some(notice) = surface.notice() {
        out.push_str(&format!("  <notice>{}</notice>\n", escape_xml(notice)));
    }
    for s in surface.sections() {
        out.push_str(&format!(
            "  <section category=\"{}\" heading=\"{}\">\n",
            escape_xml(&s.category),
            escape_xml(&s.heading)
        ));
        for row in s.table.visible_rows() {
            out.push_str("    <row>\n");
            for (column, cell) in s.table.columns().iter().zip(row.cells.iter()) {
                out.push_str(&format!(
                    "      <cell column=\"{}\">{}</cell>\n",
                    escape_xml(column),
                    escape_xml(cell)
                ));
            }
            out.push_str("    </row>\n");
        }
        out.push_str("  </section>\n");
    }
    out.push_str("</results>\n");
    out.into_bytes()
}

pub fn render_html(surface: &RenderSurface, mode: crate::render::FilterMode) -> Vec<u8> {
    report::render_html(surface, mode)
}

pub fn render(
    surface: &RenderSurface,
    format: OutputFormat,
    mode: crate::render::FilterMode,
) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(surface),
        OutputFormat::Json => render_json(surface),
        OutputFormat::Xml => render_xml(surface),
        OutputFormat::Html => render_html(surface, mode),
    }
}
