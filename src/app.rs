use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output::{self, OutputFormat};
use crate::query::{self, DateMode, QueryParams};
use crate::render::{FilterMode, FilterSpec, HeadingStyle, RenderOptions, RenderSurface};
use crate::runner::{Options, Runner, SubmitOutcome};
use crate::session::{LoadingIndicator, Session, Spinner};

fn print_banner() {
    const BANNER: &str = r#"
                  __
   ________  _____/ /___  ____ _
  / ___/ _ \/ ___/ / __ \/ __ `/
 (__  )  __(__  ) / /_/ / /_/ /
/____/\___/____/_/\____/\__, /
                       /____/
      SES event log viewer
    "#;
    print!("{}", BANNER.bold().blue());
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_opt_value<'a>(v: &'a str, default: &'a str) -> &'a str {
    if v.trim().is_empty() {
        default
    } else {
        v
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    base_url: String,
    params: QueryParams,
    date_mode: DateMode,
    print_url: bool,
    timeout: usize,
    proxy: Option<String>,
    render: RenderOptions,
    filters: Vec<FilterSpec>,
    follow: u64,
    output: Option<String>,
    output_format: Option<OutputFormat>,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or_else(|| query::DEFAULT_BASE_URL.to_string());

    let params = QueryParams {
        log_group: args.log_group.or(cfg.log_group).unwrap_or_default(),
        start_date: args.start_date.or(cfg.start_date).unwrap_or_default(),
        end_date: args.end_date.or(cfg.end_date).unwrap_or_default(),
        event_type: args.event_type.or(cfg.event_type).unwrap_or_default(),
    };

    let date_mode = if args.strict_dates || cfg.strict_dates.unwrap_or(false) {
        DateMode::Strict
    } else {
        DateMode::PassThrough
    };

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let filter_mode_raw = args
        .filter_mode
        .or(cfg.filter_mode)
        .unwrap_or_else(|| "and".to_string());
    let filter_mode = FilterMode::parse(&filter_mode_raw)
        .ok_or_else(|| format!("invalid filter mode '{filter_mode_raw}', expected and or last"))?;

    let heading_style_raw = args
        .heading_style
        .or(cfg.heading_style)
        .unwrap_or_else(|| "first".to_string());
    let heading_style = HeadingStyle::parse(&heading_style_raw).ok_or_else(|| {
        format!("invalid heading style '{heading_style_raw}', expected first or all")
    })?;

    let filters_raw = if args.filter.is_empty() {
        cfg.filters.unwrap_or_default()
    } else {
        args.filter
    };
    let filters = filters_raw
        .iter()
        .map(|raw| FilterSpec::parse(raw).map_err(|e| format!("invalid filter '{raw}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    let follow = args.follow.or(cfg.follow).unwrap_or(0);

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => Some(
            OutputFormat::parse(&raw).ok_or_else(|| format!("invalid output format '{raw}'"))?,
        ),
        None => None,
    };

    Ok(RunConfig {
        base_url,
        params,
        date_mode,
        print_url: args.print_url,
        timeout,
        proxy,
        render: RenderOptions {
            heading_style,
            filter_mode,
        },
        filters,
        follow,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn runner_options(run: &RunConfig) -> Options {
    Options {
        base_url: run.base_url.clone(),
        params: run.params.clone(),
        date_mode: run.date_mode,
        timeout_seconds: run.timeout,
        proxy: run.proxy.clone(),
        render: run.render,
    }
}

fn print_surface(surface: &RenderSurface) {
    if let Some(notice) = surface.notice() {
        println!("{}", notice.bold().red());
        return;
    }
    if surface.sections().is_empty() {
        println!("{}", "no log events matched the query".yellow());
        return;
    }
    for section in surface.sections() {
        println!();
        println!("{}", section.heading.bold().cyan());
        print!("{}", output::format_table(&section.table));
        if let Some(summary) = output::filter_summary(&section.table) {
            println!("{}", summary.dimmed());
        }
    }
}

async fn write_output(run: &RunConfig, surface: &RenderSurface) -> Result<(), String> {
    let Some(outfile_path) = run.output.as_deref() else {
        return Ok(());
    };
    let format = run
        .output_format
        .or_else(|| output::infer_format_from_path(outfile_path))
        .unwrap_or(OutputFormat::Text);
    let rendered = output::render(surface, format, run.render.filter_mode);

    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(outfile_path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(&rendered)
        .await
        .map_err(|_| "failed to write output file".to_string())?;
    Ok(())
}

/// Applies configured filters, then shows the surface and writes the report.
async fn present(
    run: &RunConfig,
    spinner: &Spinner,
    surface: &mut RenderSurface,
    outcome: SubmitOutcome,
) -> Result<(), String> {
    match outcome {
        SubmitOutcome::Stale { ticket, latest } => {
            if run.verbose > 0 {
                spinner.println(format!(
                    "{} discarded response #{} (latest is #{})",
                    "[stale]".yellow(),
                    ticket.get(),
                    latest.get()
                ));
            }
            return Ok(());
        }
        SubmitOutcome::Failed { ticket, error } => {
            if run.verbose > 0 {
                spinner.println(format!("{} #{}: {error}", "[error]".red(), ticket.get()));
            }
        }
        SubmitOutcome::Rendered {
            ticket,
            sections,
            records,
        } => {
            if run.verbose > 0 {
                spinner.println(format!(
                    "{} #{}: {sections} section(s), {records} record(s)",
                    "[ok]".green(),
                    ticket.get()
                ));
            }
            for spec in run.filters.iter() {
                match surface.apply_filter(spec) {
                    Ok(0) => println!(
                        "{} no table has a column named '{}'",
                        "[warn]".yellow(),
                        spec.column
                    ),
                    Ok(_) => {}
                    Err(e) => println!("{} {e}", "[warn]".yellow()),
                }
            }
        }
    }

    print_surface(surface);
    if run.verbose > 1 {
        for section in surface.sections() {
            eprintln!(
                ":: {:<10}: {} of {} rows",
                section.category,
                section.table.visible_count(),
                section.table.rows().len()
            );
        }
    }
    write_output(run, surface).await
}

/// Issues a query every `period` whether or not earlier ones finished and
/// draws only the newest response, until `stop` resolves.
async fn follow(
    run: &RunConfig,
    runner: &Runner,
    spinner: &Spinner,
    surface: &mut RenderSurface,
    period: Duration,
    stop: impl Future<Output = ()>,
) -> Result<(), String> {
    tokio::pin!(stop);
    let mut interval = tokio::time::interval(period);
    let mut pending = FuturesUnordered::new();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                pending.push(runner.fetch());
            }
            Some(fetched) = pending.next() => {
                let outcome = runner.apply(fetched, surface);
                present(run, spinner, surface, outcome).await?;
            }
            _ = &mut stop => {
                break;
            }
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let spinner = Arc::new(Spinner::new("querying logs..."));
    let session = if run.print_url {
        Session::default()
    } else {
        Session::new(Arc::clone(&spinner))
    };
    let runner = Runner::with_session(runner_options(&run), session).map_err(|e| e.to_string())?;

    if run.print_url {
        println!("{}", runner.url());
        return Ok(());
    }

    print_banner();
    format_kv_line("Service", &run.base_url);
    format_kv_line("Log group", format_opt_value(&run.params.log_group, "(empty)"));
    format_kv_line(
        "Range",
        &format!(
            "{} .. {}",
            format_opt_value(&run.params.start_date, "(empty)"),
            format_opt_value(&run.params.end_date, "(empty)")
        ),
    );
    format_kv_line("Event type", format_opt_value(&run.params.event_type, "(empty)"));
    format_kv_line("Filters", run.render.filter_mode.label());
    if let Some(out) = run.output.as_deref() {
        format_kv_line("Output", out);
    }
    if run.follow > 0 {
        format_kv_line("Follow", &format!("every {}s", run.follow));
    }
    if run.verbose > 0 {
        format_kv_line("URL", runner.url());
    }
    if !run.params.event_type.is_empty() && !query::is_known_event_type(&run.params.event_type) {
        println!(
            "{} '{}' is not one of {}",
            "[warn]".yellow(),
            run.params.event_type,
            query::KNOWN_EVENT_TYPES.join(", ")
        );
    }

    let mut surface = RenderSurface::new();

    if run.follow == 0 {
        let outcome = runner.submit(&mut surface).await;
        return present(&run, &spinner, &mut surface, outcome).await;
    }

    let stop = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    follow(
        &run,
        &runner,
        &spinner,
        &mut surface,
        Duration::from_secs(run.follow),
        stop,
    )
    .await?;
    spinner.hide();
    println!();
    let issued = runner.session().latest().map(|t| t.get()).unwrap_or(0);
    println!(":: Stopped :: {issued} queries issued ::");
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if args.init_config {
        let path = match args.config.as_deref() {
            Some(p) => config::expand_tilde(p),
            None => config::default_config_path()
                .ok_or_else(|| "could not determine home directory".to_string())?,
        };
        if config::ensure_default_config_file(&path)? {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(p) => config::load_config(&config::expand_tilde(p), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        let mut full = vec!["seslog"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn defaults_without_config() {
        let run = build_run_config(parse(&[]), ConfigFile::default()).unwrap();
        assert_eq!(run.base_url, query::DEFAULT_BASE_URL);
        assert_eq!(run.params, QueryParams::default());
        assert_eq!(run.date_mode, DateMode::PassThrough);
        assert_eq!(run.timeout, 10);
        assert_eq!(run.render, RenderOptions::default());
        assert_eq!(run.follow, 0);
        assert!(run.filters.is_empty());
    }

    #[test]
    fn cli_values_win_over_config() {
        let cfg = ConfigFile {
            log_group: Some("from-config".to_string()),
            event_type: Some("send".to_string()),
            filter_mode: Some("last".to_string()),
            filters: Some(vec!["destination=cfg".to_string()]),
            ..ConfigFile::default()
        };
        let run = build_run_config(
            parse(&["-g", "from-cli", "-m", "and", "-F", "bounce_data:bounce_type=perm"]),
            cfg,
        )
        .unwrap();
        assert_eq!(run.params.log_group, "from-cli");
        assert_eq!(run.params.event_type, "send");
        assert_eq!(run.render.filter_mode, FilterMode::Conjunctive);
        assert_eq!(run.filters.len(), 1);
        assert_eq!(run.filters[0].category.as_deref(), Some("bounce_data"));
    }

    #[test]
    fn config_filters_used_when_cli_has_none() {
        let cfg = ConfigFile {
            filters: Some(vec!["destination=cfg".to_string()]),
            heading_style: Some("all".to_string()),
            strict_dates: Some(true),
            ..ConfigFile::default()
        };
        let run = build_run_config(parse(&[]), cfg).unwrap();
        assert_eq!(run.filters[0].column, "destination");
        assert_eq!(run.render.heading_style, HeadingStyle::All);
        assert_eq!(run.date_mode, DateMode::Strict);
    }

    #[test]
    fn bad_config_values_are_reported() {
        let cfg = ConfigFile {
            output_format: Some("pdf".to_string()),
            ..ConfigFile::default()
        };
        assert!(build_run_config(parse(&[]), cfg)
            .unwrap_err()
            .contains("output format 'pdf'"));
    }

    #[test]
    fn color_flag_overrides_no_color() {
        let cfg = ConfigFile {
            no_color: Some(true),
            ..ConfigFile::default()
        };
        let run = build_run_config(parse(&["--color"]), cfg).unwrap();
        assert!(!run.no_color);
    }

    #[test]
    fn print_url_uses_query_builder() {
        let run = build_run_config(
            parse(&["--print-url", "-g", "a b", "-s", "2024-01-02", "-e", "2024-01-03", "-t", "open"]),
            ConfigFile::default(),
        )
        .unwrap();
        let runner = Runner::new(runner_options(&run)).unwrap();
        assert_eq!(
            runner.url(),
            "http://127.0.0.1:5000/api/get_ses_logs?log-group=a%20b&start-date=2024%2F01%2F02\
             &end-date=2024%2F01%2F03&event-type=open"
        );
    }

    // Answers every connection with the same JSON body until the test ends.
    async fn serve_forever(body: &'static str) -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let reply = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn follow_requeries_until_stopped() {
        let base = serve_forever(
            r#"{"bounce_data": [{"id": "1", "bounce_type": "Permanent"},
                                {"id": "2", "bounce_type": "Transient"}]}"#,
        )
        .await;
        let run = build_run_config(
            parse(&["-u", base.as_str(), "-g", "ses", "-F", "bounce_type=perm", "-n"]),
            ConfigFile::default(),
        )
        .unwrap();
        let runner = Runner::new(runner_options(&run)).unwrap();
        let spinner = Spinner::new("querying logs...");
        let mut surface = RenderSurface::new();

        follow(
            &run,
            &runner,
            &spinner,
            &mut surface,
            Duration::from_millis(100),
            tokio::time::sleep(Duration::from_millis(350)),
        )
        .await
        .unwrap();

        let issued = runner.session().latest().map(|t| t.get()).unwrap_or(0);
        assert!(issued >= 2, "only {issued} queries issued");
        assert_eq!(runner.session().in_flight(), 0);
        assert_eq!(surface.sections().len(), 1);
        assert_eq!(surface.sections()[0].table.visible_count(), 1);
    }
}
