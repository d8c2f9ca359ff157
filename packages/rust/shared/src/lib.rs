//! Shared types, error model, and configuration for confnotes.
//!
//! This crate is the foundation depended on by all other confnotes crates.
//! It provides:
//! - [`ConfNotesError`]: the unified error type
//! - Domain types ([`Record`], [`Author`], [`ParentRef`], [`ChildSummary`])
//! - Configuration ([`AppConfig`], [`ImportConfig`], [`BrowserOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, BrowserOptions, DefaultsConfig, ImportConfig, MeetingConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
    timezone_for_year,
};
pub use error::{ConfNotesError, Result};
pub use types::{Author, ChildSummary, ParentRef, Record, RecordKind};
