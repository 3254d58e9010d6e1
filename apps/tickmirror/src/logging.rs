use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tickmirror_application::config::LogConfig;

pub const ENV_LOG_FILTER: &str = "TICKMIRROR_LOG";

/// `TICKMIRROR_LOG` wins over the configured level when set and non-blank.
pub fn resolve_filter(env_value: Option<String>, configured: &str) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

/// Opens the log file for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> Result<File, String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create log dir {}: {err}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("failed to open log file {}: {err}", path.display()))
}

pub fn init_tracing(settings: &LogConfig) -> Result<(), String> {
    let filter = resolve_filter(std::env::var(ENV_LOG_FILTER).ok(), &settings.level);
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    let file = open_log_file(&settings.path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .try_init()
        .map_err(|err| format!("failed to install log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_filter_overrides_configured_level() {
        assert_eq!(resolve_filter(Some("debug".to_string()), "info"), "debug");
        assert_eq!(resolve_filter(Some("  ".to_string()), "warn"), "warn");
        assert_eq!(resolve_filter(None, "info"), "info");
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("live.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
