use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    #[serde(alias = "log-group")]
    pub log_group: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(alias = "event-type")]
    pub event_type: Option<String>,
    pub strict_dates: Option<bool>,
    pub timeout: Option<usize>,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub filter_mode: Option<String>,
    pub heading_style: Option<String>,
    pub filters: Option<Vec<String>>,
    pub follow: Option<u64>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".seslog").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn parse_config(contents: &str, origin: &Path) -> Result<ConfigFile, String> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
        .map_err(|e| format!("failed to parse config '{}': {e}", origin.display()))
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# seslog config
#
# Location (default):
#   ~/.seslog/config.yml

# Log service
base_url: http://127.0.0.1:5000

# Query defaults (CLI flags win)
# log_group: /aws/ses/events
# event_type: bounce        # bounce, delivery, complaint, open, send
# start_date: 2024-01-01
# end_date: 2024-01-31

# Reject dates that are not YYYY-MM-DD instead of sending them as typed
strict_dates: false

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080

# Rendering
# and  = a row must match every column filter
# last = only the most recently applied filter decides
filter_mode: and
# first = only the first underscore of a category becomes a space
heading_style: first
# filters:
#   - bounce_data:bounce_type=Permanent
#   - destination=example.com

# Output (optional)
# output: ./report.html
# output_format: html

# Re-run the query every N seconds (0 = once)
follow: 0

no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let cfg = parse_config(&default_config_yaml(), Path::new("default")).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://127.0.0.1:5000"));
        assert_eq!(cfg.filter_mode.as_deref(), Some("and"));
        assert_eq!(cfg.strict_dates, Some(false));
        assert_eq!(cfg.follow, Some(0));
        assert!(cfg.log_group.is_none());
    }

    #[test]
    fn kebab_aliases_are_accepted() {
        let cfg = parse_config(
            "log-group: ses\nevent-type: open\nfilters:\n  - type=hard\n",
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(cfg.log_group.as_deref(), Some("ses"));
        assert_eq!(cfg.event_type.as_deref(), Some("open"));
        assert_eq!(cfg.filters, Some(vec!["type=hard".to_string()]));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(
            parse_config("  \n", Path::new("empty")).unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn missing_file_handling() {
        let path = env::temp_dir().join("seslog-does-not-exist").join("config.yml");
        assert_eq!(load_config(&path, true).unwrap(), ConfigFile::default());
        assert!(load_config(&path, false)
            .unwrap_err()
            .starts_with("config file not found"));
    }

    #[test]
    fn ensure_default_config_writes_once() {
        let dir = env::temp_dir().join(format!("seslog-cfg-{}", std::process::id()));
        let path = dir.join("config.yml");
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(ensure_default_config_file(&path), Ok(true));
        assert_eq!(ensure_default_config_file(&path), Ok(false));
        assert!(load_config(&path, false).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/x.yml"), home.join("x.yml"));
        }
        assert_eq!(expand_tilde("/abs/x.yml"), PathBuf::from("/abs/x.yml"));
    }
}
