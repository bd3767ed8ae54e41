use std::time::Duration;

use anyhow::{Result, bail};
use freed_core::UnverifiedPolicy;
use freed_core::mailer::SmtpSettings;
use freed_core::signer::DEFAULT_TOKEN_LENGTH;

/// Secrets that must never sign real links.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "change-me-to-a-random-string", "secret"];

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub secret_key: String,
    pub sig_length: usize,
    pub redis_url: Option<String>,
    pub smtp: Option<SmtpSettings>,
    pub fetch_timeout: Duration,
    pub unverified: UnverifiedPolicy,
    pub rescan: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let secret_key = get("FREED_SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("FREED_SECRET_KEY is unset or still a placeholder; set it to a long random string");
        }

        let host = get("FREED_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("FREED_PORT").unwrap_or_else(|| "4567".into()).parse()?;
        let public_url = get("FREED_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        let sig_length = match get("FREED_SIG_LENGTH") {
            Some(v) => v.parse()?,
            None => DEFAULT_TOKEN_LENGTH,
        };

        let smtp = match get("FREED_SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: get("FREED_SMTP_PORT").unwrap_or_else(|| "587".into()).parse()?,
                username: get("FREED_SMTP_USER"),
                password: get("FREED_SMTP_PASS"),
                from: get("FREED_MAIL_FROM")
                    .or_else(|| get("FREED_SMTP_USER"))
                    .unwrap_or_else(|| "freed@localhost".into()),
            }),
            None => None,
        };

        let fetch_timeout = Duration::from_secs(
            get("FREED_FETCH_TIMEOUT_SECS").unwrap_or_else(|| "20".into()).parse()?,
        );
        let unverified = match get("FREED_NOTIFY_UNVERIFIED").as_deref() {
            None | Some("true") | Some("1") | Some("yes") => UnverifiedPolicy::Notify,
            Some("false") | Some("0") | Some("no") => UnverifiedPolicy::Suppress,
            Some(other) => bail!("FREED_NOTIFY_UNVERIFIED must be true or false, got {other:?}"),
        };
        let rescan = Duration::from_secs(
            get("FREED_SCHEDULER_RESCAN_SECS").unwrap_or_else(|| "60".into()).parse()?,
        );

        Ok(Self {
            host,
            port,
            public_url,
            secret_key,
            sig_length,
            redis_url: get("FREED_REDIS_URL"),
            smtp,
            fetch_timeout,
            unverified,
            rescan,
        })
    }
}
