//! Markdown note rendering and text normalization.
//!
//! - [`normalize`] turns scraped page text into codes, titles, filenames and
//!   paragraphs that are safe to put in a notes vault.
//! - [`render`] lays records out in the fixed session and presentation
//!   templates.

pub mod normalize;
pub mod render;

pub use normalize::{
    ARCHIVE_SUFFIX, FORBIDDEN_FILENAME_CHARS, MAX_FILENAME_BYTES, normalize_paragraphs, normalize_time_range,
    note_stem, sanitize_filename, split_code_title, split_day_date, strike, strip_heading,
    truncate_filename,
};
pub use render::{
    affiliation_line, author_line, child_row, panel_block, presentation_note, session_footer,
    session_header, title_cell,
};
