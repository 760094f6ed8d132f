use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use reqwest::Url;

use crate::{errors::Error, Result};

const DEFAULT_ALLOWLIST_PATH: &str = "allowlist.yaml";
const DEFAULT_PC_TYPE: &str = "free";

/// Typed configuration, read from the process environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_safe_limit: usize,

    // Management API
    pub api_key: String,
    pub api_base_url: Url,
    pub http_timeout: Duration,
    pub http_retry_count: u32,

    // Reboot target
    pub club_id: i64,
    pub pc_type: String,

    // Allowlist
    pub allowlist_path: PathBuf,
    pub allowlist_debounce: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let api_key = get("MANAGE_API_KEY").ok_or_else(|| {
            Error::Config("MANAGE_API_KEY environment variable is required".to_string())
        })?;
        let raw_base_url = get("MANAGE_BASE_URL").ok_or_else(|| {
            Error::Config("MANAGE_BASE_URL environment variable is required".to_string())
        })?;
        let api_base_url = parse_base_url(&raw_base_url)?;

        // HTTP behaviour
        let timeout_secs: u64 = parse_opt(&get, "HTTP_TIMEOUT_SECONDS")?.unwrap_or(30);
        let http_timeout = Duration::from_secs(timeout_secs.clamp(5, 300));
        let http_retry_count = parse_opt::<u32>(&get, "HTTP_RETRY_COUNT")?
            .unwrap_or(3)
            .clamp(1, 6);

        // Reboot target
        let club_id = parse_opt(&get, "CLUB_ID")?.unwrap_or(1);
        let pc_type = get("PC_TYPE")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_PC_TYPE.to_string());

        // Allowlist
        let allowlist_path =
            PathBuf::from(get("ALLOWLIST_PATH").unwrap_or(DEFAULT_ALLOWLIST_PATH.to_string()));
        let debounce_ms: u64 = parse_opt(&get, "ALLOWLIST_DEBOUNCE_MS")?.unwrap_or(500);
        let allowlist_debounce = Duration::from_millis(debounce_ms.clamp(50, 10_000));

        // Telegram hard limit is 4096; keep headroom.
        let telegram_safe_limit = parse_opt::<usize>(&get, "TELEGRAM_SAFE_LIMIT")?
            .unwrap_or(4000)
            .clamp(200, 4096);

        Ok(Self {
            telegram_bot_token,
            telegram_safe_limit,
            api_key,
            api_base_url,
            http_timeout,
            http_retry_count,
            club_id,
            pc_type,
            allowlist_path,
            allowlist_debounce,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("MANAGE_BASE_URL is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "MANAGE_BASE_URL must be http or https, got {}",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() {
        return Err(Error::Config(
            "MANAGE_BASE_URL must be an absolute base URL".to_string(),
        ));
    }
    Ok(url)
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{key} has invalid value {raw:?}: {e}")))
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

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
