//! Application configuration for confnotes.
//!
//! User config lives at `~/.confnotes/confnotes.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{ConfNotesError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "confnotes.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".confnotes";

/// Zone used when a meeting year has no entry in [`timezone_for_year`].
const FALLBACK_TIMEZONE: &str = "America/Chicago";

// ---------------------------------------------------------------------------
// Config structs (matching confnotes.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Meeting identity and row-filtering policy.
    #[serde(default)]
    pub meeting: MeetingConfig,

    /// Page-loading parameters.
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Notes vault folder that receives the Markdown files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Meeting year, used in the tag line and the timezone lookup.
    #[serde(default = "default_year")]
    pub year: i32,

    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,

    /// Archive and replace notes that already exist.
    #[serde(default)]
    pub overwrite: bool,

    /// Import every child presentation of a session.
    #[serde(default = "default_true")]
    pub import_presentations: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            year: default_year(),
            debug: false,
            overwrite: false,
            import_presentations: true,
        }
    }
}

fn default_output_dir() -> String {
    "~/confnotes".into()
}
fn default_year() -> i32 {
    chrono::Local::now().year()
}
fn default_true() -> bool {
    true
}

/// `[meeting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingConfig {
    /// Short meeting name used in tags (`#AGU2023 #AGU`).
    #[serde(default = "default_meeting_name")]
    pub name: String,

    /// Base of the schedule app, used to rebuild URLs from calendar UIDs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Child rows with exactly these titles are listed but never imported.
    #[serde(default = "default_skip_titles")]
    pub skip_titles: Vec<String>,

    /// Child rows whose title contains any of these are listed but never imported.
    #[serde(default = "default_skip_fragments")]
    pub skip_fragments: Vec<String>,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            name: default_meeting_name(),
            base_url: default_base_url(),
            skip_titles: default_skip_titles(),
            skip_fragments: default_skip_fragments(),
        }
    }
}

fn default_meeting_name() -> String {
    "AGU".into()
}
fn default_base_url() -> String {
    "https://agu.confex.com/agu/fm23/meetingapp.cgi".into()
}
fn default_skip_titles() -> Vec<String> {
    [
        "Introduction",
        "Conclusions",
        "Q&A",
        "Discussion",
        "Panel Discussion",
        "Break",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_skip_fragments() -> Vec<String> {
    vec!["Remarks".into(), "Q & A".into()]
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// User-Agent sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// How long to wait for a page element before giving up.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sleep after a session page reports ready, for late-rendering blocks.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Attempts for slow-to-render sub-elements.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Spacing between those attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timezone the schedule is displayed in. Looked up from the year when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            settle_ms: default_settle_ms(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            timezone: None,
        }
    }
}

fn default_user_agent() -> String {
    concat!("confnotes/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_settle_ms() -> u64 {
    5000
}
fn default_poll_attempts() -> u32 {
    15
}
fn default_poll_interval_ms() -> u64 {
    1000
}

/// Host-city timezone of the fall meeting for a given year.
pub fn timezone_for_year(year: i32) -> &'static str {
    match year {
        2021 | 2022 => "America/Chicago",
        2023 => "America/Los_Angeles",
        2024 => "America/New_York",
        2025 => "America/Chicago",
        _ => FALLBACK_TIMEZONE,
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime import configuration passed explicitly into every pipeline entry point.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Folder the notes are written into.
    pub output_dir: PathBuf,
    /// Meeting year.
    pub year: i32,
    /// Meeting name used in tags.
    pub meeting_name: String,
    /// Archive and replace existing notes.
    pub overwrite: bool,
    /// Follow session children into their own notes.
    pub import_presentations: bool,
    /// Exact child titles that are never imported.
    pub skip_titles: Vec<String>,
    /// Child title fragments that are never imported.
    pub skip_fragments: Vec<String>,
    /// Wait limit for page elements.
    pub wait_timeout: Duration,
    /// Post-load sleep on session pages.
    pub settle: Duration,
    /// Attempts for slow-to-render sub-elements.
    pub poll_attempts: u32,
    /// Spacing between those attempts.
    pub poll_interval: Duration,
}

impl ImportConfig {
    /// The tag line opening every note, e.g. `#seminar #AGU2023 #AGU`.
    pub fn tag_line(&self) -> String {
        format!(
            "#seminar #{name}{year} #{name}",
            name = self.meeting_name,
            year = self.year
        )
    }

    /// Whether a child row with this title is a real talk worth its own note.
    pub fn is_content_title(&self, title: &str) -> bool {
        !self.skip_titles.iter().any(|t| t == title)
            && !self.skip_fragments.iter().any(|f| title.contains(f.as_str()))
    }
}

impl From<&AppConfig> for ImportConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: expand_home(&config.defaults.output_dir),
            year: config.defaults.year,
            meeting_name: config.meeting.name.clone(),
            overwrite: config.defaults.overwrite,
            import_presentations: config.defaults.import_presentations,
            skip_titles: config.meeting.skip_titles.clone(),
            skip_fragments: config.meeting.skip_fragments.clone(),
            wait_timeout: Duration::from_secs(config.browser.timeout_secs),
            settle: Duration::from_millis(config.browser.settle_ms),
            poll_attempts: config.browser.poll_attempts,
            poll_interval: Duration::from_millis(config.browser.poll_interval_ms),
        }
    }
}

/// Runtime launch parameters for a browser driver.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// User-Agent header.
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Interval between re-checks while waiting for an element.
    pub poll_interval: Duration,
    /// Timezone the schedule should be rendered in.
    pub timezone: String,
}

impl From<&AppConfig> for BrowserOptions {
    fn from(config: &AppConfig) -> Self {
        let timezone = config
            .browser
            .timezone
            .clone()
            .unwrap_or_else(|| timezone_for_year(config.defaults.year).to_string());
        Self {
            user_agent: config.browser.user_agent.clone(),
            request_timeout: Duration::from_secs(config.browser.request_timeout_secs),
            poll_interval: Duration::from_millis(config.browser.poll_interval_ms),
            timezone,
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.confnotes/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ConfNotesError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.confnotes/confnotes.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfNotesError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ConfNotesError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ConfNotesError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ConfNotesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConfNotesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
