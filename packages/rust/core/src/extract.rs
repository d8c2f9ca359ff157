//! Field extraction from session and presentation pages.
//!
//! Extraction is read-only: it navigates, waits, and turns the page into a
//! [`Record`]. Required fields that never show up abort with
//! `FieldMissing`; optional ones are logged as degraded and left empty.

use tracing::{debug, instrument, warn};
use url::Url;

use confnotes_browser::{Browser, By, Element, RetryPolicy};
use confnotes_markdown::{
    normalize_paragraphs, normalize_time_range, note_stem, split_code_title, split_day_date,
    strip_heading,
};
use confnotes_shared::{
    ChildSummary, ConfNotesError, ImportConfig, ParentRef, Record, RecordKind, Result,
};

use crate::authors::{AuthorList, parse_leader, parse_role_item};

/// Prefix of session note filenames.
pub const SESSION_PREFIX: &str = "_";

/// Markers of moderator and panelist rows in a session's child list.
const PANEL_MARKERS: &[&str] = &["Moderator:", "Panelist:"];

// ---------------------------------------------------------------------------
// Waits
// ---------------------------------------------------------------------------

/// Wait for a field the record cannot do without.
async fn require<B: Browser>(
    browser: &mut B,
    class: &str,
    url: &Url,
    config: &ImportConfig,
) -> Result<()> {
    let outcome = browser
        .wait_for(&By::class(class), config.wait_timeout)
        .await?;
    if outcome.is_ready() {
        Ok(())
    } else {
        Err(ConfNotesError::field_missing(
            class,
            url.as_str(),
            config.wait_timeout.as_secs(),
        ))
    }
}

/// Wait for a field the record can go without. Returns whether it showed up.
async fn optional<B: Browser>(browser: &mut B, class: &str, config: &ImportConfig) -> Result<bool> {
    let ready = browser
        .wait_for(&By::class(class), config.wait_timeout)
        .await?
        .is_ready();
    if !ready {
        recover(ConfNotesError::FieldDegraded {
            field: class.to_string(),
        })?;
    }
    Ok(ready)
}

/// Log a recoverable error and carry on. Fatal errors are passed back.
fn recover(error: ConfNotesError) -> Result<()> {
    if error.is_fatal() {
        return Err(error);
    }
    warn!("{error}");
    Ok(())
}

fn text_of<B: Browser>(browser: &B, class: &str) -> Option<String> {
    browser.find_one(&By::class(class)).map(|el| el.text())
}

fn scoped_text(scope: &Element, class: &str) -> Option<String> {
    scope.find_one(&By::class(class)).map(|el| el.text())
}

fn policy(config: &ImportConfig) -> RetryPolicy {
    RetryPolicy::new(config.poll_attempts, config.poll_interval)
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// A presentation record plus what the page said about its session.
#[derive(Debug, Clone)]
pub struct PresentationPage {
    pub record: Record,
    /// Session page this presentation belongs to.
    pub parent_url: Option<Url>,
    /// The abstract block never rendered.
    pub abstract_missing: bool,
}

/// Load and extract a presentation page.
///
/// With `preset_authors`, the author list is neither waited for nor parsed and
/// the given line is used as is.
#[instrument(skip_all, fields(url = %url))]
pub async fn extract_presentation<B: Browser>(
    browser: &mut B,
    url: &Url,
    config: &ImportConfig,
    preset_authors: Option<&str>,
) -> Result<PresentationPage> {
    browser.navigate(url).await?;

    require(browser, "field_ParentList_ParentEntries", url, config).await?;
    let has_abstract = optional(browser, "field_Abstract", config).await?;
    if preset_authors.is_none() {
        require(browser, "RoleListItem", url, config).await?;
    }

    let mut record = Record::new(RecordKind::Presentation, url.clone());

    // Parent session link can render after its block
    let parent_block = By::class("field_ParentList_ParentEntries");
    let parent_link = policy(config)
        .poll(|| {
            browser
                .find_one(&parent_block)
                .and_then(|block| block.find_one(&By::tag("a")))
        })
        .await
        .ok_or_else(|| {
            ConfNotesError::field_missing(
                "field_ParentList_ParentEntries a",
                url.as_str(),
                config.wait_timeout.as_secs(),
            )
        })?;
    let (parent_code, parent_title) = split_code_title(&parent_link.text(), None);
    let parent_url = parent_link.link();
    record.parent = Some(ParentRef {
        filename: note_stem(SESSION_PREFIX, &parent_code, &parent_title)?,
        code: parent_code.clone(),
        title: parent_title,
        url: parent_url.clone(),
    });

    let title_blob = text_of(browser, "titleContent").ok_or_else(|| {
        ConfNotesError::field_missing("titleContent", url.as_str(), config.wait_timeout.as_secs())
    })?;
    let (code, title) = split_code_title(&title_blob, Some(&parent_code));
    record.code = if code.is_empty() {
        format!("{parent_code}-XX")
    } else {
        code
    };
    record.title = title;
    debug!(code = %record.code, title = %record.title, "presentation identity");

    if has_abstract {
        record.abstract_text = text_of(browser, "field_Abstract")
            .map(|text| normalize_paragraphs(&strip_heading(&text, "Abstract")));
    }
    record.plain_summary = text_of(browser, "field_ExtendedAbstract")
        .map(|text| normalize_paragraphs(&strip_heading(&text, "Plain-language Summary")))
        .filter(|text| !text.is_empty());

    match preset_authors {
        Some(line) => record.author_line_override = Some(line.to_string()),
        None => {
            let authors = read_role_items(browser, config).await?;
            (record.authors, record.affiliations) = authors.into_parts();
        }
    }

    let day_date = text_of(browser, "SlotDate").ok_or_else(|| {
        ConfNotesError::field_missing("SlotDate", url.as_str(), config.wait_timeout.as_secs())
    })?;
    (record.day, record.date) = split_day_date(&day_date);
    record.time = text_of(browser, "SlotTime")
        .map(|t| normalize_time_range(&t))
        .unwrap_or_default();
    record.location = text_of(browser, "propertyInfo")
        .map(|l| l.trim().to_string())
        .unwrap_or_default();
    debug!(when = %record.when(), location = %record.location, "presentation slot");

    Ok(PresentationPage {
        record,
        parent_url,
        abstract_missing: !has_abstract,
    })
}

/// Parse every role item, polling each until its name has rendered.
async fn read_role_items<B: Browser>(browser: &B, config: &ImportConfig) -> Result<AuthorList> {
    let by = By::class("RoleListItem");
    let count = browser.find_many(&by).len();
    let policy = policy(config);

    let mut list = AuthorList::new();
    for index in 0..count {
        let (name, affiliation) = policy
            .poll(|| {
                browser
                    .find_many(&by)
                    .get(index)
                    .and_then(|item| parse_role_item(&item.text()))
            })
            .await
            .ok_or(ConfNotesError::AuthorParseExhausted {
                attempts: policy.attempts,
            })?;
        list.push(&name, affiliation.as_deref());
    }
    Ok(list)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Load and extract a session page, including its child table.
#[instrument(skip_all, fields(url = %url))]
pub async fn extract_session<B: Browser>(
    browser: &mut B,
    url: &Url,
    config: &ImportConfig,
) -> Result<Record> {
    browser.navigate(url).await?;

    for class in [
        "favoriteItem",
        "field_ParentList_SlotData",
        "SlotDate",
        "field_GoodType",
    ] {
        require(browser, class, url, config).await?;
    }
    optional(browser, "Affiliation", config).await?;
    if !config.settle.is_zero() {
        tokio::time::sleep(config.settle).await;
    }

    let mut record = Record::new(RecordKind::Session, url.clone());

    record.code = session_code(browser, url, config)?;
    let title_blob = text_of(browser, "favoriteItem").unwrap_or_default();
    let dashed = format!("{} - ", record.code);
    record.title = title_blob
        .strip_prefix(&dashed)
        .map(str::to_string)
        .unwrap_or_else(|| title_blob.replace(&dashed, ""))
        .trim()
        .to_string();
    record.is_poster = record.title.contains("Poster");
    debug!(code = %record.code, title = %record.title, poster = record.is_poster, "session identity");

    let slot = browser
        .find_one(&By::class("field_ParentList_SlotData"))
        .ok_or_else(|| {
            ConfNotesError::field_missing(
                "field_ParentList_SlotData",
                url.as_str(),
                config.wait_timeout.as_secs(),
            )
        })?;
    let day_date = scoped_text(&slot, "SlotDate").unwrap_or_default();
    (record.day, record.date) = split_day_date(&day_date);
    record.time = scoped_text(&slot, "SlotTime")
        .map(|t| normalize_time_range(&t))
        .unwrap_or_default();
    record.location = scoped_text(&slot, "propertyInfo")
        .map(|l| l.trim().to_string())
        .unwrap_or_default();

    record.abstract_text = text_of(browser, "field_SubTitle").map(|t| normalize_paragraphs(&t));
    if record.abstract_text.is_none() {
        debug!("session has no description");
    }

    let leaders: AuthorList = browser
        .find_one(&By::class("field_ChildList_Role"))
        .map(|roles| roles.find_many(&By::class("RoleListItem")))
        .unwrap_or_default()
        .iter()
        .filter_map(parse_leader)
        .collect();
    (record.authors, record.affiliations) = leaders.into_parts();

    if let Some(slot_list) = browser.find_one(&By::class("field_ChildList_PaperSlot")) {
        for row in slot_list.find_many(&By::class("entryInformation")) {
            match parse_child_row(&row, &record.code, config)? {
                ChildRow::Panelist(line) => record.panelists.push(line),
                ChildRow::Child(child) => record.children.push(child),
            }
        }
    }
    debug!(
        children = record.children.len(),
        panelists = record.panelists.len(),
        "session children"
    );

    Ok(record)
}

/// `finalNumber`, or `K{id}` for keynotes without one.
fn session_code<B: Browser>(browser: &B, url: &Url, config: &ImportConfig) -> Result<String> {
    if let Some(code) = text_of(browser, "finalNumber").filter(|c| !c.is_empty()) {
        return Ok(code);
    }

    let is_keynote = text_of(browser, "field_GoodType").is_some_and(|t| t.contains("Keynote"));
    let id = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());

    match (is_keynote, id) {
        (true, Some(id)) => Ok(format!("K{id}")),
        _ => Err(ConfNotesError::field_missing(
            "finalNumber",
            url.as_str(),
            config.wait_timeout.as_secs(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Child rows
// ---------------------------------------------------------------------------

/// One entry of a session's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRow {
    /// A moderator or panelist line.
    Panelist(String),
    /// A presentation, break or Q&A slot.
    Child(ChildSummary),
}

/// Parse one `entryInformation` row.
pub fn parse_child_row(
    row: &Element,
    session_code: &str,
    config: &ImportConfig,
) -> Result<ChildRow> {
    let blob = scoped_text(row, "Title").unwrap_or_default();
    let mut lines = blob.lines().map(str::trim);
    let first = lines.next().unwrap_or_default().to_string();

    if PANEL_MARKERS.iter().any(|m| blob.contains(m)) {
        return Ok(ChildRow::Panelist(first));
    }

    let start_time = scoped_text(row, "SlotTime").unwrap_or_default();
    let number = scoped_text(row, "SessionListNumber")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{session_code}-XX"));

    let presenter = lines.next().unwrap_or_default().to_string();
    let extra: Vec<&str> = lines.collect();
    let mut title = first;
    match extra.as_slice() {
        [] => {}
        ["(Invited)"] => title.push_str(" (Invited)"),
        ignored => debug!(?ignored, "ignoring extra row lines"),
    }
    let title = title.replace(&format!("{number} "), "");

    let filename = note_stem("", &number, &title)?;
    let url = row.find_one(&By::tag("a")).and_then(|a| a.link());
    let cancelled = scoped_text(row, "cancelled").is_some_and(|t| !t.is_empty());
    let is_content = config.is_content_title(&title);

    Ok(ChildRow::Child(ChildSummary {
        start_time,
        presenter,
        code: number,
        title,
        filename,
        url,
        cancelled,
        is_content,
    }))
}
