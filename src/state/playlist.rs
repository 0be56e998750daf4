use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::error::{PlaybackError, ValidationError};

pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "flv", "wmv", "m4v", "mpg", "mpeg", "3gp", "webm",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    path: PathBuf,
    display_name: String,
}

impl MediaEntry {
    pub fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, display_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Outcome of one ingestion batch.
#[derive(Debug, Default)]
pub struct AddReport {
    pub accepted: usize,
    pub failures: Vec<ValidationError>,
}

/// Ordered playback sequence. Duplicates are allowed.
#[derive(Debug, Default, Clone)]
pub struct Playlist {
    entries: Vec<MediaEntry>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    /// Validates every path and appends the accepted ones in input order.
    /// A rejected path never stops the rest of the batch.
    pub fn add_entries<I, P>(&mut self, paths: I) -> AddReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = AddReport::default();
        for path in paths {
            match validate(path.as_ref()) {
                Ok(entry) => {
                    self.entries.push(entry);
                    report.accepted += 1;
                }
                Err(e) => report.failures.push(e),
            }
        }
        report
    }

    #[cfg(test)]
    pub(crate) fn push_validated(&mut self, entries: Vec<MediaEntry>) {
        self.entries.extend(entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entry_at(&self, index: usize) -> Result<&MediaEntry, PlaybackError> {
        self.entries.get(index).ok_or(PlaybackError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }
}

pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Checks a single candidate file and builds its entry.
pub fn validate(path: &Path) -> Result<MediaEntry, ValidationError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ValidationError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ValidationError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !metadata.is_file() {
        return Err(ValidationError::NotAFile(path.to_path_buf()));
    }

    if !is_media_file(path) {
        return Err(ValidationError::UnsupportedExtension {
            path: path.to_path_buf(),
        });
    }

    File::open(path).map_err(|source| ValidationError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Ok(MediaEntry::new(absolute))
}

/// Validates a batch without touching any playlist.
pub fn validate_all<I, P>(paths: I) -> (Vec<MediaEntry>, Vec<ValidationError>)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut accepted = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match validate(path.as_ref()) {
            Ok(entry) => accepted.push(entry),
            Err(e) => failures.push(e),
        }
    }
    (accepted, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"media").unwrap();
        path
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_media_file(Path::new("/tmp/clip.MKV")));
        assert!(is_media_file(Path::new("movie.3gp")));
        assert!(!is_media_file(Path::new("notes.txt")));
        assert!(!is_media_file(Path::new("no_extension")));
    }

    #[test]
    fn add_entries_keeps_valid_paths_in_order() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.mp4");
        let bad_ext = touch(&dir, "b.txt");
        let c = touch(&dir, "c.webm");
        let missing = dir.path().join("gone.mkv");
        let sub = dir.path().join("folder.avi");
        fs::create_dir(&sub).unwrap();

        let mut playlist = Playlist::new();
        let report = playlist.add_entries([&a, &bad_ext, &missing, &c, &sub]);

        assert_eq!(report.accepted, 2);
        assert_eq!(report.failures.len(), 3);
        assert!(matches!(report.failures[0], ValidationError::UnsupportedExtension { .. }));
        assert!(matches!(report.failures[1], ValidationError::NotFound(_)));
        assert!(matches!(report.failures[2], ValidationError::NotAFile(_)));

        let names: Vec<_> = playlist.entries().iter().map(|e| e.display_name()).collect();
        assert_eq!(names, ["a.mp4", "c.webm"]);
        assert!(playlist.entry_at(0).unwrap().path().is_absolute());
    }

    #[test]
    fn metadata_errors_other_than_missing_are_unreadable() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "a.mp4");
        let below_a_file = file.join("b.mp4");

        let mut playlist = Playlist::new();
        let report = playlist.add_entries([&below_a_file, &file]);

        assert_eq!(report.accepted, 1);
        match &report.failures[..] {
            [ValidationError::Unreadable { path, .. }] => assert_eq!(path, &below_a_file),
            other => panic!("expected one unreadable failure, got {other:?}"),
        }
    }

    #[test]
    fn duplicates_are_allowed() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.mov");

        let mut playlist = Playlist::new();
        playlist.add_entries([&a, &a]);
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn entry_at_is_bounds_checked() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.mpg");

        let mut playlist = Playlist::new();
        playlist.add_entries([&a]);

        assert!(playlist.entry_at(0).is_ok());
        assert_eq!(
            playlist.entry_at(1).unwrap_err(),
            PlaybackError::IndexOutOfRange { index: 1, len: 1 }
        );
    }
}
