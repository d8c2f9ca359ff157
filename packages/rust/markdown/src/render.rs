//! Note templates for sessions and presentations.
//!
//! Every function returns a finished block of Markdown. Session notes are
//! assembled by the writer in pieces: header, one row per child, the
//! optional panel block, then the footer.

use confnotes_shared::{Author, ChildSummary, Record};

use crate::normalize::strike;

// ---------------------------------------------------------------------------
// Author lines
// ---------------------------------------------------------------------------

/// `"A (1), B (2), C (1), D"`.
pub fn author_line(authors: &[Author]) -> String {
    authors
        .iter()
        .map(|a| match a.affiliation {
            Some(idx) => format!("{} ({idx})", a.name),
            None => a.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"(1) X, (2) Y"`.
pub fn affiliation_line(affiliations: &[String]) -> String {
    affiliations
        .iter()
        .enumerate()
        .map(|(i, affil)| format!("({}) {affil}", i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Shared header
// ---------------------------------------------------------------------------

fn push_header(out: &mut String, record: &Record) {
    let authors = record
        .author_line_override
        .clone()
        .unwrap_or_else(|| author_line(&record.authors));
    let affiliations = if record.author_line_override.is_some() {
        String::new()
    } else {
        affiliation_line(&record.affiliations)
    };

    out.push_str(&format!("# [{}]({})\n", record.title, record.url));
    out.push_str(&format!("{authors}\n"));
    out.push_str(&format!("{affiliations}\n\n"));
    out.push_str(&format!("{}\n", record.when()));
    out.push_str(&format!("{}\n\n", record.location));
    out.push_str("## Description\n");
    out.push_str("### Abstract\n");
    out.push_str(&format!(
        "{}\n\n",
        record.abstract_text.as_deref().unwrap_or_default()
    ));
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// The complete note for one presentation.
pub fn presentation_note(record: &Record, tag_line: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{tag_line}\n"));

    if let Some(parent) = &record.parent {
        out.push_str(&format!(
            "Parent session: [[{}|{}]]\n\n",
            parent.filename, parent.title
        ));
    }

    push_header(&mut out, record);

    if let Some(summary) = record.plain_summary.as_deref().filter(|s| !s.is_empty()) {
        out.push_str("### Plain-language summary\n");
        out.push_str(&format!("{summary}\n"));
    }

    out.push('\n');
    out.push_str("## Notes\n");
    out.push_str("- \n\n\n");
    out
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Session header, followed by the table heading when the session has children.
pub fn session_header(record: &Record, tag_line: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{tag_line}\n"));
    push_header(&mut out, record);
    out.push('\n');

    if !record.children.is_empty() {
        if record.is_poster {
            out.push_str("## Posters\n\n");
            out.push_str("| Pres. author | Title |\n");
            out.push_str("| ----- | --- |\n");
        } else {
            out.push_str("## Presentations\n\n");
            out.push_str("| Time | Pres. author | Title |\n");
            out.push_str("| ---- | ----- | --- |\n");
        }
    }
    out
}

/// Third table cell: a wiki link plus source link for talks, plain text otherwise.
pub fn title_cell(child: &ChildSummary) -> String {
    match (&child.url, child.is_content) {
        (Some(url), true) => format!("[[{}]] ([URL]({url}))", child.filename),
        _ => child.title.clone(),
    }
}

/// One table row for a child presentation.
///
/// Cancelled rows are struck through (the time cell only for talks). A
/// presenter cell that merely repeats the session location is blanked.
pub fn child_row(child: &ChildSummary, is_poster: bool, session_location: &str) -> String {
    let mut time = child.start_time.clone();
    let mut presenter = child.presenter.clone();
    let mut title = title_cell(child);

    if child.cancelled {
        if !is_poster {
            time = strike(&time);
        }
        presenter = strike(&presenter);
        title = strike(&title);
    }

    if presenter == session_location {
        presenter.clear();
    }

    if is_poster {
        format!("| {presenter} | {title} |\n")
    } else {
        format!("| {time} | {presenter} | {title} |\n")
    }
}

/// Participant list for panel-discussion sessions. Empty when there are none.
pub fn panel_block(panelists: &[String]) -> String {
    if panelists.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n## Panel discussion\n### Participants\n");
    for line in panelists {
        out.push_str(&format!("- {line}\n"));
    }
    out
}

/// Closing notes section of a session note.
pub fn session_footer(has_panel: bool) -> String {
    let heading = if has_panel {
        "### Panel notes"
    } else {
        "## Session notes"
    };
    format!("\n\n{heading}\n- \n\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use confnotes_shared::{ParentRef, RecordKind};
    use url::Url;

    fn presentation() -> Record {
        let url = Url::parse("https://agu.confex.com/agu/fm23/meetingapp.cgi/Paper/10").unwrap();
        let mut record = Record::new(RecordKind::Presentation, url);
        record.code = "GC12B-03".into();
        record.title = "Melting Ice".into();
        record.time = "08:30-08:40".into();
        record.day = "Monday".into();
        record.date = "11 December 2023".into();
        record.location = "Moscone West 2002".into();
        record.abstract_text = Some("First.\n\nSecond.".into());
        record.authors = vec![
            Author { name: "Ann".into(), affiliation: Some(1) },
            Author { name: "Bo".into(), affiliation: None },
        ];
        record.affiliations = vec!["Univ X".into()];
        record.parent = Some(ParentRef {
            code: "GC12B".into(),
            title: "Ice".into(),
            filename: "_GC12B Ice".into(),
            url: None,
        });
        record
    }

    fn child(title: &str, cancelled: bool) -> ChildSummary {
        ChildSummary {
            start_time: "08:00".into(),
            presenter: "Ann".into(),
            code: "GC12B-01".into(),
            title: title.into(),
            filename: format!("GC12B-01 {title}"),
            url: Some(Url::parse("https://example.com/Paper/1").unwrap()),
            cancelled,
            is_content: true,
        }
    }

    #[test]
    fn presentation_sections_in_order() {
        let note = presentation_note(&presentation(), "#seminar #AGU2023 #AGU");
        let expected = "#seminar #AGU2023 #AGU\n\
            Parent session: [[_GC12B Ice|Ice]]\n\n\
            # [Melting Ice](https://agu.confex.com/agu/fm23/meetingapp.cgi/Paper/10)\n\
            Ann (1), Bo\n\
            (1) Univ X\n\n\
            08:30-08:40 Monday 11 December 2023\n\
            Moscone West 2002\n\n\
            ## Description\n\
            ### Abstract\n\
            First.\n\nSecond.\n\n\
            \n\
            ## Notes\n\
            - \n\n\n";
        assert_eq!(note, expected);
    }

    #[test]
    fn plain_summary_and_preset_authors() {
        let mut record = presentation();
        record.plain_summary = Some("Simply put.".into());
        record.author_line_override = Some("Preset People".into());
        let note = presentation_note(&record, "#t");
        assert!(note.contains("Preset People\n\n\n"));
        assert!(note.contains("### Plain-language summary\nSimply put.\n\n## Notes"));
    }

    #[test]
    fn author_lines_number_affiliations() {
        let authors = vec![
            Author { name: "A".into(), affiliation: Some(1) },
            Author { name: "B".into(), affiliation: Some(2) },
            Author { name: "C".into(), affiliation: Some(1) },
            Author { name: "D".into(), affiliation: None },
        ];
        assert_eq!(author_line(&authors), "A (1), B (2), C (1), D");
        assert_eq!(
            affiliation_line(&["X".to_string(), "Y".to_string()]),
            "(1) X, (2) Y"
        );
        assert_eq!(author_line(&[]), "");
    }

    #[test]
    fn session_header_picks_table_kind() {
        let mut record = presentation();
        record.kind = RecordKind::Session;
        record.parent = None;
        record.children = vec![child("Talk", false)];

        let header = session_header(&record, "#t");
        assert!(!header.contains("Parent session"));
        assert!(header.ends_with("## Presentations\n\n| Time | Pres. author | Title |\n| ---- | ----- | --- |\n"));

        record.is_poster = true;
        assert!(session_header(&record, "#t").ends_with("## Posters\n\n| Pres. author | Title |\n| ----- | --- |\n"));

        record.children.clear();
        assert!(session_header(&record, "#t").ends_with("First.\n\nSecond.\n\n\n"));
    }

    #[test]
    fn rows_strike_cancelled_talks() {
        let live = child_row(&child("Live", false), false, "Room 1");
        assert_eq!(
            live,
            "| 08:00 | Ann | [[GC12B-01 Live]] ([URL](https://example.com/Paper/1)) |\n"
        );
        assert!(!live.contains("~~"));

        let gone = child_row(&child("Gone", true), false, "Room 1");
        assert_eq!(
            gone,
            "| ~~08:00~~ | ~~Ann~~ | ~~[[GC12B-01 Gone]] ([URL](https://example.com/Paper/1))~~ |\n"
        );
    }

    #[test]
    fn poster_rows_skip_time() {
        let row = child_row(&child("Poster", true), true, "Hall A");
        assert!(row.starts_with("| ~~Ann~~ |"));
        assert!(!row.contains("08:00"));
    }

    #[test]
    fn presenter_matching_location_is_blanked() {
        let row = child_row(&child("Talk", false), false, "Ann");
        assert!(row.starts_with("| 08:00 |  |"));
    }

    #[test]
    fn non_content_rows_are_plain() {
        let mut c = child("Q&A", false);
        c.is_content = false;
        assert_eq!(title_cell(&c), "Q&A");
    }

    #[test]
    fn panel_and_footer() {
        assert_eq!(panel_block(&[]), "");
        assert_eq!(
            panel_block(&["Moderator: Jo".into()]),
            "\n\n## Panel discussion\n### Participants\n- Moderator: Jo\n"
        );
        assert_eq!(session_footer(true), "\n\n### Panel notes\n- \n\n\n");
        assert_eq!(session_footer(false), "\n\n## Session notes\n- \n\n\n");
    }
}
