//! Text normalization for scraped schedule fields.
//!
//! Pure `&str -> String` helpers: code/title splitting, note filenames,
//! paragraph breaks, table-cell strikethrough, date and time blobs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use confnotes_shared::{ConfNotesError, Result};

/// Longest note filename, in bytes, including the extension.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Suffix of the zip that collects replaced versions of `{stem}.md`.
pub const ARCHIVE_SUFFIX: &str = " ARCHIVE.zip";

/// Characters that may never appear in a note filename.
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['*', '"', '\\', '/', '<', '>', ':', '|', '?'];

/// Marker appended to a shortened filename stem.
const ELLIPSIS: char = '…';

// ---------------------------------------------------------------------------
// Codes and titles
// ---------------------------------------------------------------------------

/// Split a title blob into `(code, title)`.
///
/// With `parent_code`, only a leading `"{parent_code}-<digits>"` counts as a
/// code. Otherwise a leading `"<code> - "` is tried before a leading
/// `"<code> "`, where a code is made of `A-Z`, `0-9` and `-` and holds at
/// least one digit. Without a match the code is empty.
pub fn split_code_title(text: &str, parent_code: Option<&str>) -> (String, String) {
    static DASHED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^([A-Z0-9-]*[0-9][A-Z0-9-]*) - (.*)$").expect("valid regex")
    });
    static SPACED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^([A-Z0-9-]*[0-9][A-Z0-9-]*) (.*)$").expect("valid regex")
    });

    let text = text.trim();

    if let Some(parent) = parent_code.filter(|p| !p.is_empty()) {
        let pattern = format!(r"(?s)^({}-[0-9]+)(?: - | )(.*)$", regex::escape(parent));
        if let Some(caps) = Regex::new(&pattern).ok().and_then(|re| re.captures(text)) {
            return (caps[1].to_string(), caps[2].trim().to_string());
        }
    }

    for re in [&*DASHED_RE, &*SPACED_RE] {
        if let Some(caps) = re.captures(text) {
            return (caps[1].to_string(), caps[2].trim().to_string());
        }
    }

    (String::new(), text.to_string())
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Build a note filename stem from a code and title.
///
/// Colons become em-dashes, question marks are dropped and slashes become
/// hyphens. Any forbidden character left after that is an error.
pub fn sanitize_filename(code: &str, title: &str) -> Result<String> {
    let joined = if code.is_empty() {
        title.to_string()
    } else {
        format!("{code} {title}")
    };

    let filename = joined
        .replace(": ", "— ")
        .replace(':', "—")
        .replace('?', "")
        .replace('/', "-");

    if let Some(character) = filename.chars().find(|c| FORBIDDEN_FILENAME_CHARS.contains(c)) {
        return Err(ConfNotesError::IllegalFilename {
            character,
            filename,
        });
    }

    Ok(filename)
}

/// Shorten `name` to at most `max_len` bytes, keeping its extension.
///
/// Trailing words of the stem are dropped one at a time and replaced by `…`.
pub fn truncate_filename(name: &str, max_len: usize) -> Result<String> {
    if name.len() <= max_len {
        return Ok(name.to_string());
    }

    let (stem, ext) = split_extension(name);
    let stalled = || ConfNotesError::TruncationStalled {
        filename: name.to_string(),
        max_len,
    };

    let mut stem = stem.to_string();
    loop {
        let candidate = format!("{stem}{ext}");
        if candidate.len() <= max_len {
            debug!(from = name, to = %candidate, "shortened filename");
            return Ok(candidate);
        }

        let words = stem.trim_end_matches(ELLIPSIS).trim_end();
        let Some((head, _)) = words.rsplit_once(char::is_whitespace) else {
            return Err(stalled());
        };
        let head = head.trim_end();
        if head.is_empty() {
            return Err(stalled());
        }

        let next = format!("{head}{ELLIPSIS}");
        if next.len() >= stem.len() {
            return Err(stalled());
        }
        stem = next;
    }
}

/// `("name", ".md")` for `"name.md"`; extensions never contain whitespace.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[idx..].contains(char::is_whitespace) => {
            name.split_at(idx)
        }
        _ => (name, ""),
    }
}

/// Full note stem: sanitized, prefixed, and short enough that both
/// `{stem}.md` and `{stem} ARCHIVE.zip` fit the filename limit.
pub fn note_stem(prefix: &str, code: &str, title: &str) -> Result<String> {
    let stem = format!("{prefix}{}", sanitize_filename(code, title)?);
    let max_len = MAX_FILENAME_BYTES - ARCHIVE_SUFFIX.len() + ".md".len();
    let file = truncate_filename(&format!("{stem}.md"), max_len)?;
    Ok(file.strip_suffix(".md").unwrap_or(&file).to_string())
}

// ---------------------------------------------------------------------------
// Body text
// ---------------------------------------------------------------------------

/// Turn every run of line breaks into exactly one blank line.
pub fn normalize_paragraphs(text: &str) -> String {
    static BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[ \t]*(?:\r?\n[ \t]*)+").expect("valid regex")
    });

    BREAKS_RE.replace_all(text.trim(), "\n\n").to_string()
}

/// Drop a leading heading line such as `Abstract` from a block's text.
pub fn strip_heading(text: &str, heading: &str) -> String {
    match text.split_once('\n') {
        Some((first, rest)) if first.trim().eq_ignore_ascii_case(heading) => rest.to_string(),
        None if text.trim().eq_ignore_ascii_case(heading) => String::new(),
        _ => text.to_string(),
    }
}

/// Strike a table cell through. Empty cells stay empty.
pub fn strike(cell: &str) -> String {
    if cell.is_empty() {
        String::new()
    } else {
        format!("~~{cell}~~")
    }
}

// ---------------------------------------------------------------------------
// Schedule slots
// ---------------------------------------------------------------------------

/// Split `"Monday, 11 December 2023"` into `("Monday", "11 December 2023")`.
pub fn split_day_date(blob: &str) -> (String, String) {
    static DAY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([A-Za-z]+),\s*(.*)$").expect("valid regex"));

    let blob = blob.trim();
    match DAY_RE.captures(blob) {
        Some(caps) => (caps[1].to_string(), caps[2].trim().to_string()),
        None => (String::new(), blob.to_string()),
    }
}

/// `"08:00 - 09:00"` → `"08:00-09:00"`.
pub fn normalize_time_range(time: &str) -> String {
    time.trim().replace(" - ", "-")
}
