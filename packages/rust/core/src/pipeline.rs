//! Import pipeline: URL → page extraction → note on disk.
//!
//! Sessions are imported with two browsers. The primary one keeps the session
//! page loaded while the secondary one visits each child presentation.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{debug, info, instrument, warn};
use url::Url;

use confnotes_browser::Browser;
use confnotes_markdown::{
    child_row, note_stem, panel_block, presentation_note, session_footer, session_header,
};
use confnotes_shared::{ConfNotesError, ImportConfig, RecordKind, Result};

use crate::extract::{SESSION_PREFIX, extract_presentation, extract_session};
use crate::writer::{NoteWriter, WriteOutcome};

// ---------------------------------------------------------------------------
// Progress and reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting import status.
pub trait ProgressReporter: Send + Sync {
    /// A human-readable progress line, e.g. `Importing session: …`.
    fn message(&self, line: &str);
    /// A URL failed; the run carries on with the next one.
    fn failed(&self, url: &Url, error: &ConfNotesError);
    /// Called once when a batch completes.
    fn done(&self, report: &ImportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn message(&self, _line: &str) {}
    fn failed(&self, _url: &Url, _error: &ConfNotesError) {}
    fn done(&self, _report: &ImportReport) {}
}

/// Progress reporter that keeps every message, for tests and summaries.
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn message(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
    fn failed(&self, url: &Url, error: &ConfNotesError) {
        self.message(&format!("Failed: {url}: {error}"));
    }
    fn done(&self, _report: &ImportReport) {}
}

/// A URL that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub error: String,
}

/// Counts of what an import run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub written: usize,
    pub archived: usize,
    pub skipped: usize,
    pub failed: Vec<FailedUrl>,
}

impl ImportReport {
    fn record(&mut self, outcome: &WriteOutcome) {
        match outcome {
            WriteOutcome::Written { archived, .. } => {
                self.written += 1;
                if *archived {
                    self.archived += 1;
                }
            }
            WriteOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    fn fail(&mut self, url: &Url, error: &ConfNotesError) {
        self.failed.push(FailedUrl {
            url: url.to_string(),
            error: error.to_string(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Whether a schedule URL points at a session or a presentation.
///
/// The second-to-last path segment names the entry type; anything other
/// than `Session` is treated as a presentation.
pub fn entry_kind(url: &Url) -> RecordKind {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    match segments.iter().rev().nth(1) {
        Some(&"Session") => RecordKind::Session,
        _ => RecordKind::Presentation,
    }
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Runs imports against one vault folder and keeps the tally.
pub struct Importer<'a> {
    config: &'a ImportConfig,
    writer: NoteWriter,
    progress: &'a dyn ProgressReporter,
    report: ImportReport,
    /// Presentations already handled in this run.
    imported: HashSet<Url>,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a ImportConfig, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            config,
            writer: NoteWriter::from_config(config),
            progress,
            report: ImportReport::default(),
            imported: HashSet::new(),
        }
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    pub fn into_report(self) -> ImportReport {
        self.report
    }

    fn write_note(&mut self, stem: &str, content: &str) -> Result<WriteOutcome> {
        let outcome = self.writer.write(stem, content)?;
        if let WriteOutcome::Skipped { path } = &outcome {
            self.progress.message(&format!(
                "Won't overwrite existing file: {}",
                path.display()
            ));
        }
        self.report.record(&outcome);
        Ok(outcome)
    }

    /// Import one presentation page and return its parent session URL.
    ///
    /// `known_title` is the title from the session table, announced before
    /// the page loads. `preset_authors` replaces the scraped author list.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn import_presentation<B: Browser>(
        &mut self,
        browser: &mut B,
        url: &Url,
        known_title: Option<&str>,
        preset_authors: Option<&str>,
    ) -> Result<Option<Url>> {
        if let Some(title) = known_title {
            self.progress
                .message(&format!("Importing presentation: {title}"));
        }

        let page = extract_presentation(browser, url, self.config, preset_authors).await?;
        let record = &page.record;

        if known_title.is_none() {
            self.progress
                .message(&format!("Importing presentation: {}", record.title));
        }
        if page.abstract_missing {
            self.progress.message("(No abstract found)");
        }

        let stem = note_stem("", &record.code, &record.title)?;
        let note = presentation_note(record, &self.config.tag_line());
        self.write_note(&stem, &note)?;
        self.imported.insert(url.clone());

        Ok(page.parent_url)
    }

    /// Import a session page, its table of children and, when enabled, every
    /// child presentation through `secondary`.
    ///
    /// A session note that already exists (and is not being overwritten) is
    /// left alone, but its children are still imported.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn import_session<P: Browser, S: Browser>(
        &mut self,
        primary: &mut P,
        secondary: &mut S,
        url: &Url,
    ) -> Result<()> {
        let record = extract_session(primary, url, self.config).await?;
        self.progress
            .message(&format!("Importing session: {}", record.title));

        let stem = note_stem(SESSION_PREFIX, &record.code, &record.title)?;
        let header = session_header(&record, &self.config.tag_line());
        let appending = self.write_note(&stem, &header)?.is_written();

        if !appending && !self.config.import_presentations {
            return Ok(());
        }

        for child in &record.children {
            if self.config.import_presentations && child.is_content {
                if let Some(child_url) = &child.url {
                    if self.imported.contains(child_url) {
                        debug!(url = %child_url, "presentation already imported in this run");
                    } else {
                        let imported = self
                            .import_presentation(secondary, child_url, Some(&child.title), None)
                            .await;
                        if let Err(e) = imported {
                            warn!(url = %child_url, error = %e, "presentation import failed");
                            self.progress.failed(child_url, &e);
                            self.report.fail(child_url, &e);
                        }
                    }
                }
            }

            if appending {
                self.writer
                    .append(&stem, &child_row(child, record.is_poster, &record.location))?;
            }
        }

        for line in &record.panelists {
            self.progress.message(&format!("Adding {line}"));
        }

        if appending {
            self.writer.append(&stem, &panel_block(&record.panelists))?;
            self.writer
                .append(&stem, &session_footer(!record.panelists.is_empty()))?;
        }

        info!(
            code = %record.code,
            children = record.children.len(),
            "session imported"
        );
        Ok(())
    }

    /// Import whatever `url` points at. A presentation URL is followed by its
    /// parent session, children included.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn import_url<P: Browser, S: Browser>(
        &mut self,
        primary: &mut P,
        secondary: &mut S,
        url: &Url,
    ) -> Result<()> {
        let session_url = match entry_kind(url) {
            RecordKind::Session => url.clone(),
            RecordKind::Presentation => self
                .import_presentation(primary, url, None, None)
                .await?
                .ok_or_else(|| {
                    ConfNotesError::validation(format!("{url}: no parent session link"))
                })?,
        };
        self.import_session(primary, secondary, &session_url).await
    }
}

/// Import a list of URLs.
///
/// Presentations go first and their parent sessions are collected; then
/// every session (given or collected) is imported once. A failing URL is
/// reported and skipped.
pub async fn import_batch<P: Browser, S: Browser>(
    primary: &mut P,
    secondary: &mut S,
    urls: &[Url],
    config: &ImportConfig,
    progress: &dyn ProgressReporter,
) -> ImportReport {
    let mut importer = Importer::new(config, progress);
    let mut sessions: Vec<Url> = Vec::new();

    for url in urls {
        match entry_kind(url) {
            RecordKind::Session => push_unique(&mut sessions, url.clone()),
            RecordKind::Presentation => {
                match importer.import_presentation(primary, url, None, None).await {
                    Ok(Some(parent)) => push_unique(&mut sessions, parent),
                    Ok(None) => warn!(%url, "presentation has no parent session link"),
                    Err(e) => {
                        warn!(%url, error = %e, "import failed");
                        progress.failed(url, &e);
                        importer.report.fail(url, &e);
                    }
                }
            }
        }
    }

    for url in &sessions {
        if let Err(e) = importer.import_session(primary, secondary, url).await {
            warn!(%url, error = %e, "import failed");
            progress.failed(url, &e);
            importer.report.fail(url, &e);
        }
    }

    let report = importer.into_report();
    info!(
        written = report.written,
        skipped = report.skipped,
        failed = report.failed.len(),
        "batch finished"
    );
    progress.done(&report);
    report
}

fn push_unique(urls: &mut Vec<Url>, url: Url) {
    if !urls.contains(&url) {
        urls.push(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use confnotes_browser::LocalBrowser;
    use confnotes_shared::AppConfig;

    const BASE: &str = "https://agu.confex.com/agu/fm23/meetingapp.cgi";

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("confnotes-pipeline-{}", uuid::Uuid::now_v7()))
    }

    fn config(dir: &std::path::Path) -> ImportConfig {
        let mut config = ImportConfig::from(&AppConfig::default());
        config.output_dir = dir.to_path_buf();
        config.year = 2023;
        config.wait_timeout = Duration::ZERO;
        config.settle = Duration::ZERO;
        config.poll_attempts = 1;
        config.poll_interval = Duration::ZERO;
        config
    }

    fn paper_html(code: &str, title: &str, presenter: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><body>
            <div class="field_ParentList_ParentEntries"><a href="../Session/500">EP11A - Rivers and Deltas</a></div>
            <h2 class="titleContent">{code} {title}</h2>
            <span class="SlotDate">Monday, 11 December 2023</span>
            <span class="SlotTime">08:00 - 08:10</span>
            <span class="propertyInfo">Room 3</span>
            <div class="RoleListItem"><span>Presenter</span><div>{presenter}</div><div>River Lab</div></div>
            <div class="field_Abstract"><h3>Abstract</h3><p>About {title}.</p></div>
            </body></html>"#
        )
    }

    fn session_html() -> String {
        r#"<!DOCTYPE html><html><body>
            <span class="finalNumber">EP11A</span>
            <h2 class="favoriteItem">EP11A - Rivers and Deltas</h2>
            <div class="field_GoodType">Oral Session</div>
            <div class="field_ParentList_SlotData">
              <span class="SlotDate">Monday, 11 December 2023</span>
              <span class="SlotTime">08:00 - 09:00</span>
              <span class="propertyInfo">Room 3</span>
            </div>
            <div class="field_SubTitle"><p>Sediment on the move.</p></div>
            <div class="field_ChildList_Role">
              <div class="RoleListItem"><a>Ana Ruiz</a><div class="Affiliation">River Lab</div></div>
            </div>
            <div class="field_ChildList_PaperSlot">
              <div class="entryInformation">
                <span class="SlotTime">08:00</span>
                <span class="SessionListNumber">EP11A-01</span>
                <div class="Title"><a href="../Paper/501">EP11A-01 Braided Channels</a><br>Jo Park</div>
              </div>
              <div class="entryInformation">
                <span class="SlotTime">08:10</span>
                <span class="SessionListNumber">EP11A-02</span>
                <div class="Title"><a href="../Paper/502">EP11A-02 Delta Collapse</a><br>Sam Roe</div>
                <span class="cancelled">Withdrawn</span>
              </div>
            </div>
            </body></html>"#
            .to_string()
    }

    fn browsers() -> (LocalBrowser, LocalBrowser) {
        let primary = LocalBrowser::new()
            .with_page(&format!("{BASE}/Session/500"), session_html())
            .with_page(
                &format!("{BASE}/Paper/501"),
                paper_html("EP11A-01", "Braided Channels", "Jo Park"),
            );
        let secondary = LocalBrowser::new()
            .with_page(
                &format!("{BASE}/Paper/501"),
                paper_html("EP11A-01", "Braided Channels", "Jo Park"),
            )
            .with_page(
                &format!("{BASE}/Paper/502"),
                paper_html("EP11A-02", "Delta Collapse", "Sam Roe"),
            );
        (primary, secondary)
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("{BASE}/{path}")).unwrap()
    }

    #[test]
    fn entry_kind_uses_second_to_last_segment() {
        assert_eq!(entry_kind(&url("Session/1")), RecordKind::Session);
        assert_eq!(entry_kind(&url("Session/1/")), RecordKind::Session);
        assert_eq!(entry_kind(&url("Paper/1")), RecordKind::Presentation);
    }

    #[tokio::test]
    async fn session_with_cancelled_talk() {
        let tmp = temp_dir();
        let config = config(&tmp);
        let progress = RecordingProgress::default();
        let (mut primary, mut secondary) = browsers();

        let mut importer = Importer::new(&config, &progress);
        importer
            .import_session(&mut primary, &mut secondary, &url("Session/500"))
            .await
            .unwrap();
        assert_eq!(importer.report().written, 3);

        let note = std::fs::read_to_string(tmp.join("_EP11A Rivers and Deltas.md")).unwrap();
        assert!(note.starts_with("#seminar #AGU2023 #AGU\n# [Rivers and Deltas]("));
        assert!(note.contains("Ana Ruiz (1)\n(1) River Lab\n\n08:00-09:00 Monday 11 December 2023\nRoom 3\n\n"));

        let live = note
            .lines()
            .find(|l| l.contains("Braided Channels"))
            .unwrap();
        assert_eq!(
            live,
            format!("| 08:00 | Jo Park | [[EP11A-01 Braided Channels]] ([URL]({BASE}/Paper/501)) |")
        );

        let gone = note.lines().find(|l| l.contains("Delta Collapse")).unwrap();
        assert_eq!(
            gone,
            format!("| ~~08:10~~ | ~~Sam Roe~~ | ~~[[EP11A-02 Delta Collapse]] ([URL]({BASE}/Paper/502))~~ |")
        );
        assert!(note.ends_with("\n\n## Session notes\n- \n\n\n"));

        let paper = std::fs::read_to_string(tmp.join("EP11A-01 Braided Channels.md")).unwrap();
        assert!(paper.contains("Parent session: [[_EP11A Rivers and Deltas|Rivers and Deltas]]"));
        assert!(paper.contains("Jo Park (1)\n(1) River Lab\n"));
        assert!(tmp.join("EP11A-02 Delta Collapse.md").is_file());

        let lines = progress.lines();
        assert_eq!(lines[0], "Importing session: Rivers and Deltas");
        assert_eq!(lines[1], "Importing presentation: Braided Channels");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn existing_session_is_kept_but_children_imported() {
        let tmp = temp_dir();
        let config = config(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let session_path = tmp.join("_EP11A Rivers and Deltas.md");
        std::fs::write(&session_path, "my own notes\n").unwrap();

        let progress = RecordingProgress::default();
        let (mut primary, mut secondary) = browsers();
        let mut importer = Importer::new(&config, &progress);
        importer
            .import_session(&mut primary, &mut secondary, &url("Session/500"))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&session_path).unwrap(), "my own notes\n");
        assert!(!tmp.join("_EP11A Rivers and Deltas ARCHIVE.zip").exists());
        assert!(tmp.join("EP11A-01 Braided Channels.md").is_file());
        assert_eq!(importer.report().skipped, 1);
        assert!(
            progress
                .lines()
                .iter()
                .any(|l| l.starts_with("Won't overwrite existing file: "))
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn presentations_can_be_left_out() {
        let tmp = temp_dir();
        let mut config = config(&tmp);
        config.import_presentations = false;
        let (mut primary, mut secondary) = browsers();

        let mut importer = Importer::new(&config, &SilentProgress);
        importer
            .import_session(&mut primary, &mut secondary, &url("Session/500"))
            .await
            .unwrap();

        assert!(secondary.visited().is_empty());
        assert!(!tmp.join("EP11A-01 Braided Channels.md").exists());
        let note = std::fs::read_to_string(tmp.join("_EP11A Rivers and Deltas.md")).unwrap();
        assert!(note.contains("[[EP11A-01 Braided Channels]]"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn presentation_url_pulls_in_its_session() {
        let tmp = temp_dir();
        let config = config(&tmp);
        let (mut primary, mut secondary) = browsers();

        let mut importer = Importer::new(&config, &SilentProgress);
        importer
            .import_url(&mut primary, &mut secondary, &url("Paper/501"))
            .await
            .unwrap();

        assert!(tmp.join("_EP11A Rivers and Deltas.md").is_file());
        assert!(tmp.join("EP11A-01 Braided Channels.md").is_file());
        assert_eq!(primary.visited().len(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn batch_reports_failures_and_continues() {
        let tmp = temp_dir();
        let config = config(&tmp);
        let (mut primary, mut secondary) = browsers();
        let progress = RecordingProgress::default();

        let urls = vec![url("Paper/999"), url("Paper/501"), url("Session/500")];
        let report = import_batch(&mut primary, &mut secondary, &urls, &config, &progress).await;

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].url.ends_with("/Paper/999"));
        assert!(report.has_failures());
        // Session imported once although named twice
        let session_visits = primary
            .visited()
            .iter()
            .filter(|u| u.path().ends_with("/Session/500"))
            .count();
        assert_eq!(session_visits, 1);
        assert!(tmp.join("EP11A-02 Delta Collapse.md").is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn presentation_is_not_rewritten_by_its_session() {
        let tmp = temp_dir();
        let mut config = config(&tmp);
        config.overwrite = true;
        let (mut primary, mut secondary) = browsers();

        let mut importer = Importer::new(&config, &SilentProgress);
        importer
            .import_url(&mut primary, &mut secondary, &url("Paper/501"))
            .await
            .unwrap();

        let report = importer.into_report();
        assert_eq!(report.written, 3);
        assert_eq!(report.archived, 0);
        assert!(
            secondary
                .visited()
                .iter()
                .all(|u| !u.path().ends_with("/Paper/501"))
        );
        let archives = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".zip"))
            .count();
        assert_eq!(archives, 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
