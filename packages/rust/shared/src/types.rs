//! Core domain types for scraped schedule records.

use url::Url;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Which kind of schedule page a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A scheduled block holding zero or more presentations.
    Session,
    /// A single talk or poster inside a session.
    Presentation,
}

/// One author entry: a display name and the 1-based index of its affiliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<usize>,
}

/// Back-reference from a presentation to its session. Lookup only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Session code, possibly empty.
    pub code: String,
    /// Session title.
    pub title: String,
    /// Note stem of the session file (without `.md`).
    pub filename: String,
    /// Session detail page.
    pub url: Option<Url>,
}

/// A child presentation as listed in its session's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary {
    /// Start time cell (empty for posters and untimed rows).
    pub start_time: String,
    /// Presenting author cell.
    pub presenter: String,
    /// Presentation code (falls back to `{session}-XX`).
    pub code: String,
    /// Cleaned title.
    pub title: String,
    /// Note stem of the presentation file.
    pub filename: String,
    /// Presentation detail page.
    pub url: Option<Url>,
    /// Whether the talk was withdrawn.
    pub cancelled: bool,
    /// Whether the row is a real talk (linked) rather than a break or Q&A.
    pub is_content: bool,
}

/// A session or presentation extracted from one page.
#[derive(Debug, Clone)]
pub struct Record {
    pub kind: RecordKind,
    /// Short identifier, may be empty.
    pub code: String,
    pub title: String,
    /// Source page.
    pub url: Url,
    /// Time range, e.g. `08:00-09:00`.
    pub time: String,
    /// Weekday, e.g. `Monday`.
    pub day: String,
    /// Date without weekday, e.g. `11 December 2023`.
    pub date: String,
    pub location: String,
    pub abstract_text: Option<String>,
    pub plain_summary: Option<String>,
    pub authors: Vec<Author>,
    /// Unique affiliations in encounter order; index `i` is shown as `(i + 1)`.
    pub affiliations: Vec<String>,
    /// Preformatted author line that replaces `authors` when set.
    pub author_line_override: Option<String>,
    pub parent: Option<ParentRef>,
    /// Session children in page order.
    pub children: Vec<ChildSummary>,
    /// Moderator/panelist lines from panel-discussion sessions.
    pub panelists: Vec<String>,
    /// Whether the session is a poster session.
    pub is_poster: bool,
}

impl Record {
    /// Create an empty record of the given kind for `url`.
    pub fn new(kind: RecordKind, url: Url) -> Self {
        Self {
            kind,
            code: String::new(),
            title: String::new(),
            url,
            time: String::new(),
            day: String::new(),
            date: String::new(),
            location: String::new(),
            abstract_text: None,
            plain_summary: None,
            authors: Vec::new(),
            affiliations: Vec::new(),
            author_line_override: None,
            parent: None,
            children: Vec::new(),
            panelists: Vec::new(),
            is_poster: false,
        }
    }

    /// `"{time} {day} {date}"`, skipping empty parts.
    pub fn when(&self) -> String {
        [self.time.as_str(), self.day.as_str(), self.date.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
