use env_logger::{Builder, Env, Target};
use log::debug;
use std::env;

const ENV_PREFIX: &str = "clip_prep_";
const MAX_VALUE_LEN: usize = 200;

/// Installs the stderr logger. `RUST_LOG` wins over the verbosity count.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .target(Target::Stderr)
        .try_init();
}

fn relevant_env() -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = env::vars()
        .filter(|(key, _)| key.to_ascii_lowercase().starts_with(ENV_PREFIX))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

fn display_value(key: &str, value: String) -> String {
    let lower = key.to_ascii_lowercase();
    if lower.ends_with("_config") || lower.ends_with("_path") {
        return value;
    }
    match value.char_indices().nth(MAX_VALUE_LEN) {
        Some((cut, _)) => format!("{}…", &value[..cut]),
        None => value,
    }
}

pub fn log_relevant_env() {
    let entries = relevant_env();
    if entries.is_empty() {
        return;
    }
    debug!("Environment snapshot ({} entries):", entries.len());
    for (key, value) in entries {
        let shown = display_value(&key, value);
        debug!("  {} = {}", key, shown);
    }
}
