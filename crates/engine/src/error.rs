use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("unable to write output file to {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to serialize snapshot to {}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
    #[error("unable to read data from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
    #[error("{} does not hold a list of tracks", .0.display())]
    NotAnArray(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("unable to create library backup directory at {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to find library at {}", .0.display())]
    MissingLibrary(PathBuf),
    #[error("unable to back up library to {}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the {0} library does not expose a data file to back up")]
    NoDataFile(&'static str),
}
