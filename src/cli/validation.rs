use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::render::{FilterMode, FilterSpec, HeadingStyle};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.filter_mode.as_deref() {
        if FilterMode::parse(raw).is_none() {
            return Err(format!("invalid --filter-mode '{raw}', expected and or last"));
        }
    }
    if let Some(raw) = args.heading_style.as_deref() {
        if HeadingStyle::parse(raw).is_none() {
            return Err(format!(
                "invalid --heading-style '{raw}', expected first or all"
            ));
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json, xml or html"
            ));
        }
    }
    for raw in args.filter.iter() {
        FilterSpec::parse(raw).map_err(|e| format!("invalid --filter '{raw}': {e}"))?;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["seslog"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn accepts_known_values() {
        assert!(validate(&args(&["-m", "last", "--heading-style", "all", "-A", "html"])).is_ok());
    }

    #[test]
    fn rejects_unknown_filter_mode() {
        let err = validate(&args(&["--filter-mode", "or"])).unwrap_err();
        assert!(err.contains("--filter-mode 'or'"));
    }

    #[test]
    fn rejects_malformed_filter() {
        let err = validate(&args(&["-F", "no-equals-sign"])).unwrap_err();
        assert!(err.starts_with("invalid --filter 'no-equals-sign'"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(validate(&args(&["-T", "0"])).is_err());
    }
}
