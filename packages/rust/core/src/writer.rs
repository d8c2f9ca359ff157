//! Note output with overwrite-or-skip and archive-on-replace.
//!
//! A note that already exists is left alone unless overwriting is enabled.
//! When it is, the old note is first copied into `{base} ARCHIVE.zip` next to
//! it, so replaced versions are never lost. The visible note is only ever
//! replaced by a rename, so a failure leaves either the old or the new one.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use confnotes_markdown::ARCHIVE_SUFFIX;
use confnotes_shared::{ConfNotesError, ImportConfig, Result};

/// What the writer finds at a note's path before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    New,
    ExistsNoOverwrite,
    ExistsOverwrite,
}

/// What happened to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The template was written; `archived` is set when an old version was preserved.
    Written { path: PathBuf, archived: bool },
    /// An existing note was kept as is.
    Skipped { path: PathBuf },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path, .. } | Self::Skipped { path } => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Writes notes into one vault folder.
#[derive(Debug, Clone)]
pub struct NoteWriter {
    dir: PathBuf,
    overwrite: bool,
}

impl NoteWriter {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(&config.output_dir, config.overwrite)
    }

    /// `{dir}/{stem}.md`.
    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.md"))
    }

    pub fn state(&self, stem: &str) -> NoteState {
        match (self.path_for(stem).is_file(), self.overwrite) {
            (false, _) => NoteState::New,
            (true, false) => NoteState::ExistsNoOverwrite,
            (true, true) => NoteState::ExistsOverwrite,
        }
    }

    /// Write a complete note, honouring the overwrite policy.
    #[instrument(skip(self, content))]
    pub fn write(&self, stem: &str, content: &str) -> Result<WriteOutcome> {
        let path = self.path_for(stem);

        let archived = match self.state(stem) {
            NoteState::ExistsNoOverwrite => {
                info!(path = %path.display(), "existing note kept");
                return Ok(WriteOutcome::Skipped { path });
            }
            NoteState::ExistsOverwrite => {
                archive_existing(&path)?;
                true
            }
            NoteState::New => false,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| ConfNotesError::io(&self.dir, e))?;

        // Fixed-length name: `{stem}.md` may already sit at the filename limit
        let temp = self
            .dir
            .join(format!(".confnotes-{}.tmp", uuid::Uuid::now_v7()));
        std::fs::write(&temp, content).map_err(|e| ConfNotesError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(ConfNotesError::io(&path, e));
        }

        debug!(path = %path.display(), size = content.len(), archived, "wrote note");
        Ok(WriteOutcome::Written { path, archived })
    }

    /// Append to a note written earlier in this run.
    pub fn append(&self, stem: &str, content: &str) -> Result<()> {
        let path = self.path_for(stem);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| ConfNotesError::io(&path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ConfNotesError::io(&path, e))
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// Copy `path` into its sibling `{base} ARCHIVE.zip` as `{base} {YYYYmmddHHMMSS}.md`.
///
/// The archive is created when absent and appended to otherwise. `path`
/// itself is left in place for the caller to replace. Returns the archive
/// path.
pub fn archive_existing(path: &Path) -> Result<PathBuf> {
    let base = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let archive = path.with_file_name(format!("{base}{ARCHIVE_SUFFIX}"));

    let content = std::fs::read(path).map_err(|e| ConfNotesError::io(path, e))?;
    let member = unique_member_name(&archive, &format!("{base} {stamp}.md"))?;
    append_member(&archive, &member, &content)?;

    info!(archive = %archive.display(), member = %member, "archived previous note");
    Ok(archive)
}

/// `name`, or `name` with a `-N` suffix on its stem if the archive already holds it.
fn unique_member_name(archive: &Path, name: &str) -> Result<String> {
    if !archive.is_file() {
        return Ok(name.to_string());
    }

    let file = std::fs::File::open(archive).map_err(|e| ConfNotesError::io(archive, e))?;
    let zip = ZipArchive::new(file).map_err(|e| ConfNotesError::archive(archive, e.to_string()))?;
    let existing: Vec<&str> = zip.file_names().collect();

    if !existing.contains(&name) {
        return Ok(name.to_string());
    }

    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let mut n = 1;
    loop {
        let candidate = if ext.is_empty() {
            format!("{stem}-{n}")
        } else {
            format!("{stem}-{n}.{ext}")
        };
        if !existing.contains(&candidate.as_str()) {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn append_member(archive: &Path, member: &str, content: &[u8]) -> Result<()> {
    let zip_err = |e: zip::result::ZipError| ConfNotesError::archive(archive, e.to_string());

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(archive)
        .map_err(|e| ConfNotesError::io(archive, e))?;
    let is_empty = file
        .metadata()
        .map_err(|e| ConfNotesError::io(archive, e))?
        .len()
        == 0;

    let mut writer = if is_empty {
        ZipWriter::new(file)
    } else {
        ZipWriter::new_append(file).map_err(zip_err)?
    };

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(member, options).map_err(zip_err)?;
    writer
        .write_all(content)
        .map_err(|e| ConfNotesError::io(archive, e))?;
    writer.finish().map_err(zip_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("confnotes-writer-{}", uuid::Uuid::now_v7()))
    }

    fn archive_members(path: &Path) -> Vec<String> {
        let file = std::fs::File::open(path).unwrap();
        let zip = ZipArchive::new(file).unwrap();
        zip.file_names().map(String::from).collect()
    }

    #[test]
    fn new_note_is_written() {
        let tmp = temp_dir();
        let writer = NoteWriter::new(&tmp, false);
        assert_eq!(writer.state("A1 Talk"), NoteState::New);

        let outcome = writer.write("A1 Talk", "#seminar\n# [Talk](u)\n").unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Written {
                path: tmp.join("A1 Talk.md"),
                archived: false
            }
        );
        assert_eq!(
            std::fs::read_to_string(tmp.join("A1 Talk.md")).unwrap(),
            "#seminar\n# [Talk](u)\n"
        );
        let leftovers = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_note_without_overwrite_is_untouched() {
        let tmp = temp_dir();
        let writer = NoteWriter::new(&tmp, false);
        writer.write("Note", "original\n").unwrap();
        let before = std::fs::read(tmp.join("Note.md")).unwrap();

        assert_eq!(writer.state("Note"), NoteState::ExistsNoOverwrite);
        let outcome = writer.write("Note", "replacement\n").unwrap();
        assert!(!outcome.is_written());
        assert_eq!(std::fs::read(tmp.join("Note.md")).unwrap(), before);
        assert!(!tmp.join("Note ARCHIVE.zip").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn overwrite_archives_one_member_per_call() {
        let tmp = temp_dir();
        NoteWriter::new(&tmp, false).write("Note", "v1\n").unwrap();

        let writer = NoteWriter::new(&tmp, true);
        assert_eq!(writer.state("Note"), NoteState::ExistsOverwrite);

        let outcome = writer.write("Note", "v2\n").unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Written {
                path: tmp.join("Note.md"),
                archived: true
            }
        );
        let archive = tmp.join("Note ARCHIVE.zip");
        assert_eq!(archive_members(&archive).len(), 1);
        assert_eq!(std::fs::read_to_string(tmp.join("Note.md")).unwrap(), "v2\n");

        // Two replacements within one second still keep both versions
        writer.write("Note", "v3\n").unwrap();
        let members = archive_members(&archive);
        assert_eq!(members.len(), 2);
        assert_ne!(members[0], members[1]);
        assert!(members.iter().all(|m| m.starts_with("Note ") && m.ends_with(".md")));
        assert_eq!(std::fs::read_to_string(tmp.join("Note.md")).unwrap(), "v3\n");

        // No loose timestamped copies are left behind
        let loose = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".md"))
            .count();
        assert_eq!(loose, 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn archived_member_holds_old_content() {
        let tmp = temp_dir();
        NoteWriter::new(&tmp, false).write("Old", "first version\n").unwrap();
        NoteWriter::new(&tmp, true).write("Old", "second\n").unwrap();

        let file = std::fs::File::open(tmp.join("Old ARCHIVE.zip")).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let mut member = zip.by_index(0).unwrap();
        let mut text = String::new();
        std::io::Read::read_to_string(&mut member, &mut text).unwrap();
        assert_eq!(text, "first version\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn append_extends_note() {
        let tmp = temp_dir();
        let writer = NoteWriter::new(&tmp, false);
        writer.write("_S1 Session", "header\n").unwrap();
        writer.append("_S1 Session", "| a | b | c |\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.join("_S1 Session.md")).unwrap(),
            "header\n| a | b | c |\n"
        );
        assert!(writer.append("Missing", "x").is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn longest_stem_can_be_written_and_replaced() {
        let tmp = temp_dir();
        let stem = confnotes_markdown::note_stem("", "GC12B-03", &"Word ".repeat(60)).unwrap();
        assert!(stem.len() > 200);

        NoteWriter::new(&tmp, false).write(&stem, "v1\n").unwrap();
        let outcome = NoteWriter::new(&tmp, true).write(&stem, "v2\n").unwrap();
        assert!(outcome.is_written());
        assert_eq!(std::fs::read_to_string(outcome.path()).unwrap(), "v2\n");

        let archive = tmp.join(format!("{stem}{ARCHIVE_SUFFIX}"));
        assert_eq!(archive_members(&archive).len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unreadable_archive_keeps_the_old_note() {
        let tmp = temp_dir();
        NoteWriter::new(&tmp, false).write("Note", "old\n").unwrap();
        std::fs::write(tmp.join("Note ARCHIVE.zip"), b"not a zip").unwrap();

        let err = NoteWriter::new(&tmp, true).write("Note", "new\n").unwrap_err();
        assert!(matches!(err, ConfNotesError::Archive { .. }));
        assert_eq!(std::fs::read_to_string(tmp.join("Note.md")).unwrap(), "old\n");

        let mut names: Vec<String> = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Note ARCHIVE.zip", "Note.md"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
