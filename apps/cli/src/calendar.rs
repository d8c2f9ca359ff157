//! Batch URL sources: plain URL lists and exported iCalendar schedules.

use color_eyre::eyre::{Result, eyre};
use tracing::{debug, warn};
use url::Url;

/// One URL per line. Blank lines and `#` comments are skipped.
pub(crate) fn read_url_list(text: &str) -> Result<Vec<Url>> {
    let mut urls = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let url = Url::parse(line)
            .map_err(|e| eyre!("line {}: invalid URL '{line}': {e}", lineno + 1))?;
        push_unique(&mut urls, url);
    }
    Ok(urls)
}

/// Schedule URLs for every event in an exported calendar.
///
/// Event UIDs look like `Paper1234567_1` or `Session98765_2`: the entry type,
/// the entry id, and a slot suffix. They map to `{base_url}/{type}/{id}`.
pub(crate) fn urls_from_ics(text: &str, base_url: &str) -> Result<Vec<Url>> {
    let base = base_url.trim_end_matches('/');
    let mut urls = Vec::new();

    for line in unfold(text) {
        let Some(uid) = uid_value(&line) else {
            continue;
        };
        match uid_to_url(&uid, base) {
            Some(url) => {
                debug!(%uid, %url, "calendar entry");
                push_unique(&mut urls, url);
            }
            None => warn!(%uid, "calendar entry is not a schedule item"),
        }
    }

    if urls.is_empty() {
        return Err(eyre!("no schedule entries found in calendar"));
    }
    Ok(urls)
}

/// Join folded content lines (continuations start with a space or tab).
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Value of a `UID` property line, parameters allowed (`UID;X=Y:value`).
fn uid_value(line: &str) -> Option<String> {
    let (name, value) = line.split_once(':')?;
    let name = name.split(';').next()?.trim();
    if !name.eq_ignore_ascii_case("UID") {
        return None;
    }
    Some(value.replace(' ', ""))
}

fn uid_to_url(uid: &str, base: &str) -> Option<Url> {
    let entry = uid.split('_').next()?;
    let kind_len = entry
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(entry.len());
    let (kind, id) = entry.split_at(kind_len);

    if kind.is_empty() || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Url::parse(&format!("{base}/{kind}/{id}")).ok()
}

fn push_unique(urls: &mut Vec<Url>, url: Url) {
    if !urls.contains(&url) {
        urls.push(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://agu.confex.com/agu/fm22/meetingapp.cgi";

    #[test]
    fn list_skips_comments_and_blanks() {
        let text = "# my picks\n\nhttps://example.com/Paper/1\n  https://example.com/Session/2  \nhttps://example.com/Paper/1\n";
        let urls = read_url_list(text).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].as_str(), "https://example.com/Session/2");
    }

    #[test]
    fn list_rejects_garbage() {
        let err = read_url_list("https://example.com/ok\nnot a url\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn calendar_uids_become_urls() {
        let ics = "BEGIN:VCALENDAR\r\n\
            BEGIN:VEVENT\r\n\
            UID:Paper1214892_1\r\n\
            SUMMARY:H21A-01 Talk\r\n\
            END:VEVENT\r\n\
            BEGIN:VEVENT\r\n\
            UID;X-PARAM=1:Session1570\r\n 28_2\r\n\
            END:VEVENT\r\n\
            BEGIN:VEVENT\r\n\
            UID:holiday-42@example.com\r\n\
            END:VEVENT\r\n\
            END:VCALENDAR\r\n";
        let urls = urls_from_ics(ics, &format!("{BASE}/")).unwrap();
        assert_eq!(
            urls.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec![
                format!("{BASE}/Paper/1214892"),
                format!("{BASE}/Session/157028"),
            ]
        );
    }

    #[test]
    fn calendar_without_entries_is_an_error() {
        assert!(urls_from_ics("BEGIN:VCALENDAR\nEND:VCALENDAR\n", BASE).is_err());
    }
}
