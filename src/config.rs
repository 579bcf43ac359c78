use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub site: SiteConfig,
    pub enquiry: EnquiryConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
    #[serde(default)]
    pub calendars: Vec<CalendarConfig>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub news: Vec<NewsConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Ajax endpoint of the external booking subsystem.
    pub ajax_url: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Public base URL of the marketplace site.
    pub base_url: String,
    #[serde(default = "default_cart_path")]
    pub cart_path: String,
    pub admin_email: String,
}

fn default_cart_path() -> String {
    "/cart/".to_string()
}

impl SiteConfig {
    pub fn cart_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.cart_path
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnquiryConfig {
    /// Server-side HMAC secret for the preview/send handshake.
    pub secret: String,
    #[serde(default = "default_enquiry_ttl")]
    pub ttl_secs: i64,
    /// Override for the routed To address; empty falls back to the
    /// product owner, then the site admin.
    #[serde(default)]
    pub to_email: String,
    #[serde(default = "default_enquiry_subject")]
    pub subject_template: String,
}

fn default_enquiry_ttl() -> i64 {
    600
}

fn default_enquiry_subject() -> String {
    "[{product}] Booking enquiry".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MailConfig {
    /// "log" (default) records outbound mail on stdout; "smtp" delivers
    /// through the configured relay.
    #[serde(default = "default_mail_mode")]
    pub mode: String,
    #[serde(default)]
    pub smtp_relay: String,
    #[serde(default)]
    pub from: String,
}

fn default_mail_mode() -> String {
    "log".to_string()
}

/// Filter-taxonomy configuration. Two historical sources both declare
/// taxonomy keys: the per-taxonomy enable map and the plain key list.
/// Both are honored; see [`crate::taxonomy`] for the merge rule.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FiltersConfig {
    /// taxonomy → enable flag ("1"/"0"/""), visible unless explicitly off.
    #[serde(default)]
    pub tax: BTreeMap<String, String>,
    #[serde(default)]
    pub tax_keys: Vec<String>,
    /// taxonomy → comma-separated term slugs hidden from clients.
    #[serde(default)]
    pub excluded_terms: BTreeMap<String, String>,
    /// taxonomy → display label; defaults to the shortened key.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// taxonomy → term list served by `/filters`.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<TermConfig>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TermConfig {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    pub id: u64,
    pub name: String,
    pub permalink: String,
    #[serde(default)]
    pub calendar_id: Option<u32>,
    #[serde(default)]
    pub owner_email: Option<String>,
}

/// Raw per-calendar settings rows, name → string value, decoded by the
/// typed resolver in [`crate::rules`].
#[derive(Debug, Deserialize, Clone)]
pub struct CalendarConfig {
    pub id: u32,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub time_lapse_min: u32,
    #[serde(default)]
    pub time_lapse_max: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub date: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    if config.upstream.ajax_url.is_empty() {
        anyhow::bail!("upstream.ajax_url must not be empty");
    }
    if config.upstream.timeout_secs == 0 {
        anyhow::bail!("upstream.timeout_secs must be > 0");
    }
    if config.enquiry.secret.is_empty() {
        anyhow::bail!("enquiry.secret must not be empty");
    }
    if config.enquiry.ttl_secs < 1 {
        anyhow::bail!("enquiry.ttl_secs must be >= 1");
    }
    if config.site.admin_email.is_empty() {
        anyhow::bail!("site.admin_email must not be empty");
    }

    match config.mail.mode.as_str() {
        "log" => {}
        "smtp" => {
            if config.mail.smtp_relay.is_empty() {
                anyhow::bail!("mail.smtp_relay must be set when mail.mode is 'smtp'");
            }
            if config.mail.from.is_empty() {
                anyhow::bail!("mail.from must be set when mail.mode is 'smtp'");
            }
        }
        other => anyhow::bail!("Unknown mail mode: '{}'. Must be log or smtp.", other),
    }

    Ok(config)
}
