use crate::render::{FilterMode, RenderSurface, Section};

use super::escape_xml as escape_html;

const STYLE: &str = r#"
    body { font-family: Inter, system-ui, sans-serif; margin: 2rem; color: #0f172a; background: #f8fafc; }
    h1 { font-size: 1.6rem; letter-spacing: -0.02em; }
    h3 { margin-top: 2rem; font-size: 1.1rem; }
    table { border-collapse: collapse; width: 100%; background: #fff; }
    th, td { border: 1px solid #e2e8f0; padding: 0.35rem 0.6rem; text-align: left; font-size: 0.85rem; }
    th { background: #f1f5f9; vertical-align: top; }
    th input { margin-top: 0.3rem; width: 100%; box-sizing: border-box; font-size: 0.8rem; }
    .notice { color: #b91c1c; font-weight: 600; }
    .empty { color: #64748b; }
"#;

// Filters are wired per table. In "and" mode every input event recomputes
// visibility from all inputs of the table; in "last" mode only the input
// that changed is consulted.
const SCRIPT: &str = r#"
    (function() {
      const mode = document.body.dataset.filterMode;
      document.querySelectorAll('section.results').forEach(function(section) {
        const inputs = Array.from(section.querySelectorAll('input.filter'));
        const rows = Array.from(section.querySelectorAll('tbody tr'));
        function cellText(row, index) {
          const cell = row.cells[index];
          return cell ? cell.textContent.toLowerCase() : null;
        }
        inputs.forEach(function(input) {
          input.addEventListener('input', function() {
            const index = Number(input.dataset.column);
            rows.forEach(function(row) {
              if (mode === 'last') {
                const text = cellText(row, index);
                if (text !== null) {
                  row.style.display = text.includes(input.value.toLowerCase()) ? '' : 'none';
                }
                return;
              }
              const visible = inputs.every(function(other) {
                const needle = other.value.toLowerCase();
                const text = cellText(row, Number(other.dataset.column));
                return needle === '' || text === null || text.includes(needle);
              });
              row.style.display = visible ? '' : 'none';
            });
          });
        });
      });
    })();
"#;

fn render_section(section: &Section, out: &mut String) {
    let table = &section.table;
    out.push_str(&format!(
        "  <section class=\"results\" data-category=\"{}\">\n    <h3>{}</h3>\n    <table>\n      <thead><tr>\n",
        escape_html(&section.category),
        escape_html(&section.heading)
    ));
    for (index, column) in table.columns().iter().enumerate() {
        let value = table.filters().get(index).unwrap_or("");
        out.push_str(&format!(
            "        <th>{label}<br><input type=\"text\" class=\"filter\" data-column=\"{index}\" placeholder=\"Filter {label}\" value=\"{value}\"></th>\n",
            label = escape_html(column),
            value = escape_html(value),
        ));
    }
    out.push_str("      </tr></thead>\n      <tbody>\n");
    for row in table.rows() {
        if row.visible {
            out.push_str("        <tr>");
        } else {
            out.push_str("        <tr style=\"display:none\">");
        }
        for cell in row.cells.iter() {
            out.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("      </tbody>\n    </table>\n  </section>\n");
}

/// Self-contained report page with live per-column filters.
pub fn render_html(surface: &RenderSurface, mode: FilterMode) -> Vec<u8> {
    let mut body = String::new();
    if let Some(notice) = surface.notice() {
        body.push_str(&format!("  <p class=\"notice\">{}</p>\n", escape_html(notice)));
    } else if surface.sections().is_empty() {
        body.push_str("  <p class=\"empty\">No log events matched the query.</p>\n");
    }
    for section in surface.sections() {
        render_section(section, &mut body);
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>SES Log Report</title>
  <style>{STYLE}</style>
</head>
<body data-filter-mode="{mode}">
  <h1>SES LOG RESULTS</h1>
{body}  <script>{SCRIPT}</script>
</body>
</html>
"#,
        mode = mode.label(),
    );
    html.into_bytes()
}
