use crate::error::BackupError;
use chrono::NaiveDate;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// First free `<day>[-NN] <file name>` path inside `backup_dir`.
pub fn backup_path(backup_dir: &Path, day: NaiveDate, file_name: &str) -> PathBuf {
    let day = day.format("%Y-%m-%d");
    let mut dest = backup_dir.join(format!("{day} {file_name}"));
    let mut counter = 0u32;
    while dest.exists() {
        counter += 1;
        dest = backup_dir.join(format!("{day}-{counter:02} {file_name}"));
    }
    dest
}

/// Copies the library data file into `<its dir>/<dir_name>/` under a dated
/// name and returns the copy's path.
pub fn backup_library(
    data_file: &Path,
    dir_name: &str,
    day: NaiveDate,
) -> Result<PathBuf, BackupError> {
    let parent = data_file.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent.join(dir_name);
    fs::create_dir_all(&backup_dir).map_err(|source| BackupError::CreateDir {
        path: backup_dir.clone(),
        source,
    })?;

    let file_name = match data_file.file_name() {
        Some(name) if data_file.is_file() => name.to_string_lossy().into_owned(),
        _ => return Err(BackupError::MissingLibrary(data_file.to_path_buf())),
    };

    let dest = backup_path(&backup_dir, day, &file_name);
    fs::copy(data_file, &dest).map_err(|source| BackupError::Copy {
        path: dest.clone(),
        source,
    })?;
    if let Err(err) = copy_times(data_file, &dest) {
        warn!(error = %err, path = %dest.display(), "could not copy library timestamps");
    }
    info!(path = %dest.display(), "library backed up");
    Ok(dest)
}

/// Gives `dest` the access and modification times of `src`.
fn copy_times(src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::options().write(true).open(dest)?.set_times(times)
}
