use crate::output::{self, OutputFormat};
use crate::payload::ResultPayload;
use crate::query::{self, DateMode, QueryParams};
use crate::render::{FilterMode, FilterSpec, HeadingStyle, RenderOptions, RenderSurface};

fn rendered(body: &str, options: RenderOptions) -> RenderSurface {
    let payload = ResultPayload::parse(body).unwrap();
    let mut surface = RenderSurface::new();
    surface.render(&payload, &options);
    surface
}

fn date_param(url: &str, name: &str) -> String {
    let (_, query) = url.split_once('?').unwrap();
    let value = query
        .split('&')
        .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
        .unwrap();
    value.replace("%2F", "/")
}

#[test]
fn valid_dates_always_have_two_slashes() {
    for (y, m, d) in [(1999, 1, 1), (2024, 2, 29), (2024, 12, 31), (2031, 7, 9)] {
        let start = format!("{y:04}-{m:02}-{d:02}");
        let params = QueryParams {
            start_date: start.clone(),
            end_date: start.clone(),
            ..QueryParams::default()
        };
        for mode in [DateMode::PassThrough, DateMode::Strict] {
            let url = query::build_query(query::DEFAULT_BASE_URL, &params, mode).unwrap();
            let value = date_param(&url, "start-date");
            assert_eq!(value.matches('/').count(), 2);
            assert_eq!(value, format!("{y:04}/{m:02}/{d:02}"));
        }
    }
}

#[test]
fn empty_categories_never_render() {
    let surface = rendered(
        r#"{"send_events": [], "open_events": [{"id": "9"}]}"#,
        RenderOptions::default(),
    );
    assert_eq!(surface.sections().len(), 1);
    assert!(surface.sections().iter().all(|s| s.category != "send_events"));
}

#[test]
fn single_bounce_record_renders_one_row() {
    let surface = rendered(
        r#"{"bounce_events": [{"id": "1", "type": "hard"}]}"#,
        RenderOptions::default(),
    );
    let section = &surface.sections()[0];
    assert_eq!(section.heading, "BOUNCE EVENTS");
    assert_eq!(section.table.columns(), ["id", "type"]);
    assert_eq!(section.table.rows().len(), 1);
    assert_eq!(section.table.rows()[0].cells, ["1", "hard"]);
}

#[test]
fn filter_hides_non_matching_rows_in_text_report() {
    let mut surface = rendered(
        r#"{"bounce_events": [
            {"id": "1", "type": "Hard"},
            {"id": "2", "type": "soft"},
            {"id": "3", "type": "HARDER"}
        ]}"#,
        RenderOptions::default(),
    );
    let touched = surface
        .apply_filter(&FilterSpec::parse("type=hard").unwrap())
        .unwrap();
    assert_eq!(touched, 1);

    let text = String::from_utf8(output::render(
        &surface,
        OutputFormat::Text,
        FilterMode::Conjunctive,
    ))
    .unwrap();
    assert!(text.contains("Hard"));
    assert!(text.contains("HARDER"));
    assert!(!text.contains("soft"));
    assert!(text.contains("2 of 3 rows shown"));
}

#[test]
fn conjunctive_and_last_triggered_modes_differ() {
    let body = r#"{"send_events": [
        {"destination": "a@example.com", "subject": "invoice"},
        {"destination": "b@example.com", "subject": "welcome"},
        {"destination": "a@other.org", "subject": "welcome"}
    ]}"#;
    let specs = [
        FilterSpec::parse("destination=example.com").unwrap(),
        FilterSpec::parse("subject=welcome").unwrap(),
    ];

    let mut and = rendered(body, RenderOptions::default());
    let mut last = rendered(
        body,
        RenderOptions {
            filter_mode: FilterMode::LastTriggered,
            ..RenderOptions::default()
        },
    );
    for spec in specs.iter() {
        and.apply_filter(spec).unwrap();
        last.apply_filter(spec).unwrap();
    }
    assert_eq!(and.sections()[0].table.visible_count(), 1);
    assert_eq!(last.sections()[0].table.visible_count(), 2);
}

#[test]
fn rerender_drops_previous_sections_and_notice() {
    let mut surface = rendered(
        r#"{"bounce_events": [{"id": "1"}], "open_events": [{"id": "2"}]}"#,
        RenderOptions::default(),
    );
    surface.show_error();
    assert!(surface.sections().is_empty());

    let payload = ResultPayload::parse(r#"{"delivery_events": [{"id": "3"}]}"#).unwrap();
    surface.render(&payload, &RenderOptions::default());
    assert!(surface.notice().is_none());
    let categories: Vec<_> = surface.sections().iter().map(|s| s.category.as_str()).collect();
    assert_eq!(categories, ["delivery_events"]);
}

#[test]
fn section_order_follows_payload_order() {
    let surface = rendered(
        r#"{"send_events": [{"id": "1"}], "bounce_events": [{"id": "2"}], "click_events": [{"id": "3"}]}"#,
        RenderOptions::default(),
    );
    let categories: Vec<_> = surface.sections().iter().map(|s| s.category.as_str()).collect();
    assert_eq!(categories, ["send_events", "bounce_events", "click_events"]);
}

#[test]
fn heading_style_all_reaches_html_report() {
    let surface = rendered(
        r#"{"rendering_failure_events": [{"id": "1"}]}"#,
        RenderOptions {
            heading_style: HeadingStyle::All,
            ..RenderOptions::default()
        },
    );
    let html = String::from_utf8(output::render(
        &surface,
        OutputFormat::Html,
        FilterMode::Conjunctive,
    ))
    .unwrap();
    assert!(html.contains("RENDERING FAILURE EVENTS"));
}

#[test]
fn error_notice_is_the_whole_json_report() {
    let mut surface = RenderSurface::new();
    surface.show_error();
    let report = output::render(&surface, OutputFormat::Json, FilterMode::Conjunctive);
    let json: serde_json::Value = serde_json::from_slice(&report).unwrap();
    assert_eq!(json["notice"], crate::render::ERROR_NOTICE);
    assert_eq!(json["sections"].as_array().map(Vec::len), Some(0));
}
