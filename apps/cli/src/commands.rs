//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use confnotes_browser::{HttpBrowser, LocalBrowser};
use confnotes_core::pipeline::{ImportReport, ProgressReporter, import_batch};
use confnotes_shared::{
    AppConfig, BrowserOptions, ConfNotesError, ImportConfig, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use crate::calendar;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// confnotes: conference schedule pages to Markdown notes.
#[derive(Parser)]
#[command(
    name = "confnotes",
    version,
    about = "Turn conference schedule pages into linked Markdown notes.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.confnotes/confnotes.toml.
    #[arg(long, global = true, env = "CONFNOTES_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import sessions and presentations into the notes folder.
    Import {
        /// Session or presentation URLs.
        urls: Vec<String>,

        /// File with one URL per line.
        #[arg(long)]
        list: Option<PathBuf>,

        /// Exported calendar (.ics) whose events are imported.
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Notes folder (overrides the config file).
        #[arg(short, long)]
        out: Option<String>,

        /// Meeting year for tags and timezone.
        #[arg(long)]
        year: Option<i32>,

        /// Archive and replace notes that already exist.
        #[arg(long)]
        overwrite: bool,

        /// Only write session notes, do not follow their presentations.
        #[arg(long)]
        no_presentations: bool,

        /// Read saved pages from this directory instead of the network.
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Load the config file named on the command line, or the default one.
pub(crate) fn load_app_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. `debug` from the config file
/// raises the default level to debug.
pub(crate) fn init_tracing(cli: &Cli, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match (cli.verbose, debug) {
        (0, false) => "confnotes=info",
        (0, true) | (1, _) => "confnotes=debug",
        _ => "confnotes=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Command::Import {
            urls,
            list,
            ics,
            out,
            year,
            overwrite,
            no_presentations,
            local_dir,
        } => {
            let sources = Sources {
                urls,
                list,
                ics,
            };
            let overrides = Overrides {
                out,
                year,
                overwrite,
                no_presentations,
            };
            cmd_import(config, &sources, &overrides, local_dir.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Where the URLs of one run come from.
struct Sources {
    urls: Vec<String>,
    list: Option<PathBuf>,
    ics: Option<PathBuf>,
}

/// Flags that override config file values.
struct Overrides {
    out: Option<String>,
    year: Option<i32>,
    overwrite: bool,
    no_presentations: bool,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(out) = &self.out {
            config.defaults.output_dir = out.clone();
        }
        if let Some(year) = self.year {
            config.defaults.year = year;
        }
        if self.overwrite {
            config.defaults.overwrite = true;
        }
        if self.no_presentations {
            config.defaults.import_presentations = false;
        }
    }
}

fn collect_urls(sources: &Sources, config: &AppConfig) -> Result<Vec<Url>> {
    let mut urls = Vec::new();

    for raw in &sources.urls {
        let url = Url::parse(raw).map_err(|e| eyre!("invalid URL '{raw}': {e}"))?;
        urls.push(url);
    }
    if let Some(path) = &sources.list {
        let text = read_text(path)?;
        urls.extend(calendar::read_url_list(&text)?);
    }
    if let Some(path) = &sources.ics {
        let text = read_text(path)?;
        urls.extend(calendar::urls_from_ics(&text, &config.meeting.base_url)?);
    }

    if urls.is_empty() {
        return Err(eyre!("nothing to import: pass URLs, --list or --ics"));
    }
    Ok(urls)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ConfNotesError::io(path, e).into())
}

async fn cmd_import(
    mut config: AppConfig,
    sources: &Sources,
    overrides: &Overrides,
    local_dir: Option<&Path>,
) -> Result<()> {
    overrides.apply(&mut config);
    let urls = collect_urls(sources, &config)?;

    let import = ImportConfig::from(&config);
    std::fs::create_dir_all(&import.output_dir)
        .map_err(|e| ConfNotesError::io(&import.output_dir, e))?;

    info!(
        count = urls.len(),
        out = %import.output_dir.display(),
        overwrite = import.overwrite,
        "importing"
    );

    let reporter = CliProgress::new();

    let report = match local_dir {
        Some(dir) => {
            let mut primary = LocalBrowser::from_dir(dir);
            let mut secondary = LocalBrowser::from_dir(dir);
            import_batch(&mut primary, &mut secondary, &urls, &import, &reporter).await
        }
        None => {
            let options = BrowserOptions::from(&config);
            let mut primary = HttpBrowser::launch(options.clone())?;
            let mut secondary = HttpBrowser::launch(options)?;
            import_batch(&mut primary, &mut secondary, &urls, &import, &reporter).await
        }
    };

    print_summary(&report, &import.output_dir);

    if report.has_failures() {
        return Err(eyre!("{} URL(s) failed to import", report.failed.len()));
    }
    Ok(())
}

fn print_summary(report: &ImportReport, out: &Path) {
    println!();
    println!("  Notes folder: {}", out.display());
    println!("  Written:      {}", report.written);
    if report.archived > 0 {
        println!("  Archived:     {}", report.archived);
    }
    println!("  Skipped:      {}", report.skipped);
    println!("  Failed:       {}", report.failed.len());
    for failed in &report.failed {
        println!("    {} ({})", failed.url, failed.error);
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: an indicatif spinner with progress lines printed above it.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn message(&self, line: &str) {
        self.spinner.println(line);
        self.spinner.set_message(line.to_string());
    }

    fn failed(&self, url: &Url, error: &ConfNotesError) {
        self.spinner.println(format!("Failed: {url}: {error}"));
    }

    fn done(&self, _report: &ImportReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
