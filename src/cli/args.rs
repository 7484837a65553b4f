use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "seslog",
    version,
    about = "query SES event logs and browse them as filterable tables",
    long_about = "seslog asks a log service for SES events in a date range and shows every non-empty event category as a table with per-column filters.\n\nExamples:\n  seslog -g /aws/ses/events -s 2024-05-01 -e 2024-05-07 -t bounce\n  seslog -g /aws/ses/events -s 2024-05-01 -e 2024-05-07 -t send -F destination=example.com\n  seslog -g /aws/ses/events -s 2024-05-01 -e 2024-05-07 -t bounce -o report.html\n\nTip: Use --config to keep the service URL and log group out of every invocation."
)]
pub struct CliArgs {
    #[arg(
        short = 'g',
        long = "log-group",
        value_name = "NAME",
        help_heading = "Query",
        help = "Log group to read events from."
    )]
    pub log_group: Option<String>,

    #[arg(
        short = 's',
        long = "start-date",
        value_name = "YYYY-MM-DD",
        help_heading = "Query",
        help = "First day of the range."
    )]
    pub start_date: Option<String>,

    #[arg(
        short = 'e',
        long = "end-date",
        value_name = "YYYY-MM-DD",
        help_heading = "Query",
        help = "Last day of the range."
    )]
    pub end_date: Option<String>,

    #[arg(
        short = 't',
        long = "event-type",
        value_name = "TYPE",
        help_heading = "Query",
        help = "Event type (bounce, delivery, complaint, open, send)."
    )]
    pub event_type: Option<String>,

    #[arg(
        long = "strict-dates",
        help_heading = "Query",
        help = "Reject dates that are not YYYY-MM-DD instead of sending them as typed."
    )]
    pub strict_dates: bool,

    #[arg(
        long = "print-url",
        help_heading = "Query",
        help = "Print the request URL and exit without querying."
    )]
    pub print_url: bool,

    #[arg(
        short = 'u',
        long = "base-url",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Log service base URL (default http://127.0.0.1:5000)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'T',
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'F',
        long = "filter",
        value_name = "[CATEGORY:]COLUMN=TEXT",
        action = ArgAction::Append,
        help_heading = "Rendering",
        help = "Show only rows whose COLUMN contains TEXT, case-insensitive (repeatable)."
    )]
    pub filter: Vec<String>,

    #[arg(
        short = 'm',
        long = "filter-mode",
        value_name = "MODE",
        help_heading = "Rendering",
        help = "How several filters combine: and (all must match) or last (latest filter wins)."
    )]
    pub filter_mode: Option<String>,

    #[arg(
        long = "heading-style",
        value_name = "STYLE",
        help_heading = "Rendering",
        help = "Underscores replaced in section headings: first or all."
    )]
    pub heading_style: Option<String>,

    #[arg(
        short = 'f',
        long = "follow",
        value_name = "SECONDS",
        help_heading = "Rendering",
        help = "Re-run the query every SECONDS and redraw (0 = once)."
    )]
    pub follow: Option<u64>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the rendered tables to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output file format (text, json, xml, html)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.seslog/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Config",
        help = "Write a commented default config file if none exists, then exit."
    )]
    pub init_config: bool,
}
