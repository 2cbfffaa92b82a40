use std::{env, fs, path::Path};

use crate::{errors::Error, Result};

/// Typed configuration for the forwarder.
///
/// All values come from the environment (with `.env` support). Validation is
/// fatal here so the engine only ever sees well-formed identifiers.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub source_chat_id: i64,
    pub destination_chat_id: i64,
    pub tracked_users: Vec<i64>,

    /// Number of worker tasks consuming the inbound queue.
    pub workers: usize,
    /// Capacity of the inbound queue (backpressure bound).
    pub queue_depth: usize,
    /// Capacity of the adapter's recently-seen message cache used to resolve
    /// reply parents.
    pub message_cache_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let source_chat_id = required_i64("SOURCE_CHAT_ID")?;
        let destination_chat_id = required_i64("DESTINATION_CHAT_ID")?;
        let tracked_users = parse_csv_i64("TRACKED_USERS", env_str("TRACKED_USERS"))?;

        let workers = env_usize("FORWARDER_WORKERS").unwrap_or(4).max(1);
        let queue_depth = env_usize("FORWARDER_QUEUE_DEPTH").unwrap_or(64).max(1);
        let message_cache_size = env_usize("MESSAGE_CACHE_SIZE").unwrap_or(1024).max(1);

        Ok(Self {
            telegram_bot_token,
            source_chat_id,
            destination_chat_id,
            tracked_users,
            workers,
            queue_depth,
            message_cache_size,
        })
    }
}

fn required_i64(key: &str) -> Result<i64> {
    let raw = env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{key} must be an integer, got {raw:?}")))
}

/// Strict CSV parse: a malformed entry is a configuration error, not a skip.
fn parse_csv_i64(key: &str, v: Option<String>) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    for part in v.unwrap_or_default().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part.parse::<i64>().map_err(|_| {
            Error::Config(format!(
                "{key} must be a comma-separated list of integers, got {part:?}"
            ))
        })?;
        out.push(id);
    }
    Ok(out)
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parses_and_trims() {
        let v = parse_csv_i64("TRACKED_USERS", Some(" 1, 2 ,3,".to_string())).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn csv_empty_is_empty() {
        assert!(parse_csv_i64("TRACKED_USERS", None).unwrap().is_empty());
        assert!(parse_csv_i64("TRACKED_USERS", Some(String::new()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn csv_rejects_malformed_entries() {
        let err = parse_csv_i64("TRACKED_USERS", Some("1,abc,3".to_string())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
