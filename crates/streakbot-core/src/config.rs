use std::{env, fs, net::SocketAddr, path::Path, time::Duration};

use crate::{errors::Error, persona::Persona, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // LINE
    pub channel_access_token: String,
    pub channel_secret: Option<String>,
    pub line_api_base_url: String,

    // Completion backend
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_timeout: Duration,
    pub openai_reasoning_effort: Option<String>,
    pub reply_max_output_tokens: u32,
    pub classify_max_output_tokens: u32,

    // Server
    pub bind_addr: SocketAddr,

    // Behavior
    pub persona: Persona,
    pub streak_capacity: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required credentials
        let channel_access_token = get("CHANNEL_ACCESS_TOKEN").ok_or_else(|| {
            Error::Config("CHANNEL_ACCESS_TOKEN environment variable is required".to_string())
        })?;
        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            Error::Config("OPENAI_API_KEY environment variable is required".to_string())
        })?;
        let channel_secret = get("CHANNEL_SECRET");

        let line_api_base_url = get("LINE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LINE_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let openai_model = get("OPENAI_MODEL").unwrap_or_else(|| "gpt-5-mini".to_string());
        let openai_base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let openai_timeout =
            Duration::from_millis(parse_num(&get, "OPENAI_TIMEOUT_MS")?.unwrap_or(30_000));
        let reply_max_output_tokens: u32 = parse_num(&get, "REPLY_MAX_OUTPUT_TOKENS")?.unwrap_or(200);
        let classify_max_output_tokens: u32 =
            parse_num(&get, "CLASSIFY_MAX_OUTPUT_TOKENS")?.unwrap_or(16);
        // An explicitly empty OPENAI_REASONING_EFFORT omits the field (non-reasoning models).
        let openai_reasoning_effort = match lookup("OPENAI_REASONING_EFFORT") {
            Some(s) => non_empty(s),
            None => Some("minimal".to_string()),
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_num(&get, "PORT")?.unwrap_or(3000);
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid HOST/PORT {host}:{port}: {e}")))?;

        let defaults = Persona::default();
        let name = get("PERSONA_NAME").unwrap_or(defaults.name);
        let mention = get("PERSONA_MENTION").unwrap_or_else(|| format!("@{name}"));
        // An explicitly empty PERSONA_SUFFIX disables the suffix.
        let suffix = match lookup("PERSONA_SUFFIX") {
            Some(s) => non_empty(s),
            None => defaults.suffix,
        };
        let fallback_reply = get("FALLBACK_REPLY").unwrap_or(defaults.fallback_reply);
        let persona = Persona {
            name,
            mention,
            suffix,
            fallback_reply,
        };

        let streak_capacity: usize = parse_num(&get, "STREAK_CAPACITY")?.unwrap_or(10_000);

        Ok(Self {
            channel_access_token,
            channel_secret,
            line_api_base_url,
            openai_api_key,
            openai_model,
            openai_base_url,
            openai_timeout,
            openai_reasoning_effort,
            reply_max_output_tokens,
            classify_max_output_tokens,
            bind_addr,
            persona,
            streak_capacity,
        })
    }
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}

/// Apply `.env` entries that are not already set in the process environment.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` lines; blank lines, `#` comments and lines without `=` are skipped.
/// One pair of matching surrounding quotes is removed from the value.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| (k.trim().to_string(), unquote(v.trim()).to_string()))
        .collect()
}

fn unquote(v: &str) -> &str {
    let quoted = v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')));
    if quoted {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
