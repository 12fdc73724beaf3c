//! Filesystem glue for the PIC registration host.
//!
//! Provides the pieces the core deliberately leaves to collaborators:
//! - atomic text writes for the export artifact (temp file in the destination
//!   directory, flush + `sync_all`, rename into place with replace semantics)
//! - desktop-directory resolution for the default export/archive locations
//! - the timestamped archive copy (`<name or UNKNOWN> <timestamp><ext>`)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use directories::UserDirs;
use tempfile::NamedTempFile;

/// File name of the export artifact on the desktop.
pub const EXPORT_FILE_NAME: &str = "upload.csv";

/// Directory name of the archive under the desktop.
pub const ARCHIVE_DIR_NAME: &str = "PIC registration";

/// Timestamp layout embedded into archive file names. 24-hour clock: the
/// upstream convention used a 12-hour `hh` with no AM/PM marker, which
/// collides across half-days.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare relative file names like
    // `upload.csv`. Treat that as the current directory so callers can use
    // relative paths without having to prepend `./`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically write `text` to `dest` by:
/// - creating parent directories (if needed)
/// - writing to a temp file in the same directory
/// - flushing + syncing the temp file
/// - renaming it into place with replace semantics
///
/// On error the destination file is left untouched.
pub fn atomic_write_text(dest: impl AsRef<Path>, text: &str) -> io::Result<()> {
    let dest = dest.as_ref();
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.as_file_mut().write_all(text.as_bytes())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;

    // Best-effort: sync directory metadata after the rename. The file is
    // already in place, so a failure here is not a write failure.
    let _ = fs::File::open(parent_dir_or_dot(dest)).and_then(|d| d.sync_all());

    Ok(())
}

/// The user's desktop directory, if the platform exposes one.
pub fn desktop_dir() -> Option<PathBuf> {
    UserDirs::new().and_then(|dirs| dirs.desktop_dir().map(Path::to_path_buf))
}

/// Archive file name for a copy of `source`:
/// `<name or "UNKNOWN"> <timestamp><original extension>`.
pub fn archive_file_name(
    order_name: Option<&str>,
    timestamp: NaiveDateTime,
    source: &Path,
) -> String {
    let name = match order_name {
        Some(name) if !name.is_empty() => name,
        _ => "UNKNOWN",
    };
    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "{name} {}{extension}",
        timestamp.format(ARCHIVE_TIMESTAMP_FORMAT)
    )
}

/// Copy `source` into `archive_dir` (created on demand) under the
/// conventional archive name. Returns the path of the copy.
pub fn archive_copy(
    source: impl AsRef<Path>,
    archive_dir: impl AsRef<Path>,
    order_name: Option<&str>,
    timestamp: NaiveDateTime,
) -> io::Result<PathBuf> {
    let source = source.as_ref();
    let archive_dir = archive_dir.as_ref();
    fs::create_dir_all(archive_dir)?;

    let dest = archive_dir.join(archive_file_name(order_name, timestamp, source));
    fs::copy(source, &dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    #[test]
    fn atomic_write_creates_the_file_with_its_content() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("upload.csv");
        atomic_write_text(&dest, "OSA,CHIP,BATCH_NUMBER").expect("atomic write");
        assert_eq!(
            fs::read_to_string(&dest).expect("read file"),
            "OSA,CHIP,BATCH_NUMBER"
        );
    }

    #[test]
    fn atomic_write_replaces_an_existing_file() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("upload.csv");
        fs::write(&dest, "stale").expect("seed dest");
        atomic_write_text(&dest, "fresh").expect("atomic write");
        assert_eq!(fs::read_to_string(&dest).expect("read file"), "fresh");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files_behind() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("upload.csv");
        atomic_write_text(&dest, "data").expect("atomic write");
        let entries: Vec<_> = fs::read_dir(tmp.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").path())
            .collect();
        assert_eq!(entries, vec![dest]);
    }

    #[test]
    fn archive_name_uses_the_order_name_and_timestamp() {
        assert_eq!(
            archive_file_name(Some("SO-1234"), ts(), Path::new("upload.csv")),
            "SO-1234 20240307140509.csv"
        );
    }

    #[test]
    fn archive_name_falls_back_to_unknown() {
        assert_eq!(
            archive_file_name(None, ts(), Path::new("upload.csv")),
            "UNKNOWN 20240307140509.csv"
        );
        assert_eq!(
            archive_file_name(Some(""), ts(), Path::new("upload.csv")),
            "UNKNOWN 20240307140509.csv"
        );
    }

    #[test]
    fn archive_name_keeps_the_source_extension() {
        assert_eq!(
            archive_file_name(None, ts(), Path::new("export")),
            "UNKNOWN 20240307140509"
        );
        assert_eq!(
            archive_file_name(None, ts(), Path::new("data.txt")),
            "UNKNOWN 20240307140509.txt"
        );
    }

    #[test]
    fn archive_copy_creates_the_directory_and_copies() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let source = tmp.path().join("upload.csv");
        fs::write(&source, "contents").expect("seed source");

        let archive_dir = tmp.path().join("PIC registration");
        let copied =
            archive_copy(&source, &archive_dir, Some("SO-9"), ts()).expect("archive copy");

        assert_eq!(copied, archive_dir.join("SO-9 20240307140509.csv"));
        assert_eq!(fs::read_to_string(&copied).expect("read copy"), "contents");
        assert_eq!(
            fs::read_to_string(&source).expect("source intact"),
            "contents"
        );
    }
}
