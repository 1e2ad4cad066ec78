use anyhow::{ensure, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use playcounts_core::{AppConfig, CONFIG_SCHEMA_VERSION};
use playcounts_engine::{
    backup_library, export_library, snapshot, BackupError, UpdateOptions, Updater,
};
use playcounts_providers::build_library;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "playcounts",
    about = "Export music library play counts and replay them into a fresh library",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export play counts and store them in STORAGE_DIR
    Export {
        /// Defaults to the Desktop
        storage_dir: Option<PathBuf>,
    },
    /// Update play counts from the snapshot stored in STORAGE_DIR
    Update {
        /// Defaults to the Desktop
        storage_dir: Option<PathBuf>,
        /// Log the changes without touching the library
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the library binding and the snapshot location
    Doctor { storage_dir: Option<PathBuf> },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

/// Bad arguments or paths; reported together with the usage text.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(usage) = err.downcast_ref::<UsageError>() {
                eprintln!("{usage}\n");
                eprintln!("{}", Cli::command().render_usage());
            } else {
                error!(error = %format!("{err:#}"), "playcounts failed");
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Export { storage_dir } => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            let dir = resolve_storage_dir(storage_dir, &cfg)?;
            export(&cfg, &dir).await
        }
        Commands::Update {
            storage_dir,
            dry_run,
        } => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            let dir = resolve_storage_dir(storage_dir, &cfg)?;
            update(&cfg, &dir, dry_run || cfg.dry_run).await
        }
        Commands::Doctor { storage_dir } => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            doctor(&cfg, storage_dir).await
        }
    }
}

async fn export(cfg: &AppConfig, storage_dir: &Path) -> Result<()> {
    let mut library = build_library(&cfg.library)?;
    let path = storage_dir.join(&cfg.snapshot_file);
    let summary = export_library(library.as_mut(), &path).await?;
    println!(
        "Exported {} tracks to {}",
        summary.records,
        path.display()
    );
    Ok(())
}

async fn update(cfg: &AppConfig, storage_dir: &Path, dry_run: bool) -> Result<()> {
    let mut library = build_library(&cfg.library)?;
    let path = storage_dir.join(&cfg.snapshot_file);

    if dry_run {
        info!("dry run: the library will not be modified, skipping backup");
    } else {
        let data_file = library
            .data_file()
            .ok_or(BackupError::NoDataFile(library.name()))?;
        let day = chrono::Local::now().date_naive();
        let dest = backup_library(&data_file, &cfg.backup_dir, day)?;
        println!("Library backed up to {}", dest.display());
    }

    let records = snapshot::read(&path)?;
    let summary = Updater::new(library.as_mut(), UpdateOptions { dry_run })
        .await?
        .run(&records)
        .await?;

    println!(
        "{} records, {} matched, {} tracks {}",
        summary.records,
        summary.matched,
        summary.tracks_updated,
        if summary.dry_run {
            "would be updated"
        } else {
            "updated"
        }
    );
    Ok(())
}

async fn doctor(cfg: &AppConfig, storage_dir: Option<PathBuf>) -> Result<()> {
    println!("== playcounts doctor ==");
    println!("Library backend: {}", cfg.library.backend);

    match resolve_storage_dir(storage_dir, cfg) {
        Ok(dir) => {
            let path = dir.join(&cfg.snapshot_file);
            println!(
                "Snapshot: {} ({})",
                path.display(),
                if path.is_file() { "present" } else { "missing" }
            );
        }
        Err(err) => println!("Storage dir: {err}"),
    }

    let mut library = match build_library(&cfg.library) {
        Ok(library) => library,
        Err(err) => {
            println!("Library error: {err:#}");
            return Ok(());
        }
    };

    match library.data_file() {
        Some(path) => println!(
            "Library file: {} ({})",
            path.display(),
            if path.is_file() { "present" } else { "missing" }
        ),
        None => println!("Library file: unknown"),
    }

    match library.tracks().await {
        Ok(tracks) => {
            let files = tracks.iter().filter(|t| t.is_file_backed()).count();
            println!("Tracks: {} ({} file-backed)", tracks.len(), files);
        }
        Err(err) => println!("Library error: {err:#}"),
    }

    #[cfg(target_os = "macos")]
    {
        println!(
            "macOS automation: verify System Settings > Privacy & Security > Automation allows Terminal (or your shell) to control {}",
            cfg.library.app_name
        );
    }

    Ok(())
}

fn resolve_storage_dir(arg: Option<PathBuf>, cfg: &AppConfig) -> Result<PathBuf> {
    let dir = match arg.or_else(|| cfg.storage_dir.clone()) {
        Some(dir) => expand_home(&dir),
        None => dirs::desktop_dir()
            .ok_or_else(|| UsageError("Unable to locate the Desktop; pass storage_dir".into()))?,
    };

    if !dir.exists() {
        return Err(UsageError(format!("Unable to find storage_dir: {}", dir.display())).into());
    }
    if !dir.is_dir() {
        return Err(UsageError(format!(
            "storage_dir must be a directory: {}",
            dir.display()
        ))
        .into());
    }
    Ok(dir)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("playcounts").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        ensure!(
            cfg.schema_version == CONFIG_SCHEMA_VERSION,
            "unsupported schema_version {} in {} (expected {})",
            cfg.schema_version,
            path.display(),
            CONFIG_SCHEMA_VERSION
        );
        cfg
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg.library.data_file = cfg.library.data_file.as_deref().map(expand_home);
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("PLAYCOUNTS_STORAGE_DIR") {
        cfg.storage_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("PLAYCOUNTS_LOG_LEVEL") {
        cfg.log_level = v;
    }
    if let Some(v) = non_empty("PLAYCOUNTS_DRY_RUN") {
        if let Ok(parsed) = v.parse::<bool>() {
            cfg.dry_run = parsed;
        }
    }
    if let Some(v) = non_empty("PLAYCOUNTS_LIBRARY_BACKEND") {
        cfg.library.backend = v;
    }
    if let Some(v) = non_empty("PLAYCOUNTS_LIBRARY_FILE") {
        cfg.library.data_file = Some(PathBuf::from(v));
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_env_overrides, expand_home, load_or_default, resolve_storage_dir, Cli, Commands,
        UsageError,
    };
    use super::{export, update};
    use clap::{CommandFactory, Parser};
    use playcounts_core::{AppConfig, LibraryConfig, LibraryTrack};
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_update_with_dry_run() {
        let cli = Cli::try_parse_from(["playcounts", "update", "/tmp/store", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Update {
                storage_dir,
                dry_run,
            } => {
                assert_eq!(storage_dir, Some(PathBuf::from("/tmp/store")));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let err = Cli::try_parse_from(["playcounts", "sync"]).unwrap_err();
        assert!(err.use_stderr());
        assert!(Cli::try_parse_from(["playcounts"]).is_err());
    }

    #[test]
    fn storage_dir_must_exist_and_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::default();

        let ok = resolve_storage_dir(Some(dir.path().to_path_buf()), &cfg).unwrap();
        assert_eq!(ok, dir.path());

        let missing = resolve_storage_dir(Some(dir.path().join("nope")), &cfg).unwrap_err();
        assert!(missing.downcast_ref::<UsageError>().is_some());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let not_dir = resolve_storage_dir(Some(file), &cfg).unwrap_err();
        assert!(not_dir.to_string().contains("must be a directory"));
    }

    #[test]
    fn storage_dir_falls_back_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            storage_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        assert_eq!(resolve_storage_dir(None, &cfg).unwrap(), dir.path());
    }

    #[test]
    fn expands_leading_tilde_only() {
        let plain = PathBuf::from("/var/tmp");
        assert_eq!(expand_home(&plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(&PathBuf::from("~/Desktop")), home.join("Desktop"));
        }
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |key| match key {
            "PLAYCOUNTS_DRY_RUN" => Some("true".to_string()),
            "PLAYCOUNTS_LIBRARY_BACKEND" => Some("json".to_string()),
            "PLAYCOUNTS_LOG_LEVEL" => Some("  ".to_string()),
            _ => None,
        });
        assert!(cfg.dry_run);
        assert_eq!(cfg.library.backend, "json");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.snapshot_file, "playcounts.plist");
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "schema_version = 2\n").unwrap();
        let err = load_or_default(&path).unwrap_err();
        assert!(err.to_string().contains("schema_version 2"));

        fs::write(&path, "schema_version = 1\ndry_run = true\n").unwrap();
        assert!(load_or_default(&path).unwrap().dry_run);
    }

    fn json_config(data_file: PathBuf) -> AppConfig {
        AppConfig {
            library: LibraryConfig {
                backend: "json".to_string(),
                data_file: Some(data_file),
                ..LibraryConfig::default()
            },
            ..AppConfig::default()
        }
    }

    fn song(played_count: u32) -> LibraryTrack {
        LibraryTrack {
            id: "1".to_string(),
            name: "Song A".to_string(),
            artist: "X".to_string(),
            album: "Y".to_string(),
            duration: Some(180),
            played_count,
            ..LibraryTrack::default()
        }
    }

    /// Writes a one-track json library at `<dir>/library.json`.
    fn library_in(dir: &Path, played_count: u32) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join("library.json");
        fs::write(&path, serde_json::to_string(&[song(played_count)]).unwrap()).unwrap();
        path
    }

    fn played_count(path: &Path) -> u32 {
        let tracks: Vec<LibraryTrack> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        tracks[0].played_count
    }

    /// Exports a library with five plays into `<root>/store`.
    async fn exported_store(root: &Path) -> PathBuf {
        let store = root.join("store");
        fs::create_dir_all(&store).unwrap();
        let old = library_in(&root.join("old"), 5);
        export(&json_config(old), &store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn export_then_update_adds_plays_and_keeps_a_backup() {
        let root = tempfile::tempdir().unwrap();
        let store = exported_store(root.path()).await;
        let library = library_in(&root.path().join("new"), 3);
        let before = fs::read(&library).unwrap();

        update(&json_config(library.clone()), &store, false)
            .await
            .unwrap();

        assert_eq!(played_count(&library), 8);
        let backups: Vec<_> = fs::read_dir(root.path().join("new").join("Playcounts"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(" library.json"), "{name}");
        assert_eq!(fs::read(&backups[0]).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_backup_aborts_before_any_write() {
        let root = tempfile::tempdir().unwrap();
        let store = exported_store(root.path()).await;
        let library = library_in(&root.path().join("new"), 3);
        fs::write(root.path().join("new").join("Playcounts"), b"in the way").unwrap();
        let before = fs::read(&library).unwrap();

        let result = update(&json_config(library.clone()), &store, false).await;
        assert!(result.is_err());
        assert_eq!(fs::read(&library).unwrap(), before);
    }

    #[tokio::test]
    async fn backup_is_taken_before_the_snapshot_is_read() {
        let root = tempfile::tempdir().unwrap();
        let store = root.path().join("empty");
        fs::create_dir_all(&store).unwrap();
        let library = library_in(&root.path().join("new"), 3);

        let result = update(&json_config(library.clone()), &store, false).await;
        assert!(result.is_err());
        let backups = fs::read_dir(root.path().join("new").join("Playcounts"))
            .unwrap()
            .count();
        assert_eq!(backups, 1);
        assert_eq!(played_count(&library), 3);
    }

    #[tokio::test]
    async fn dry_run_update_takes_no_backup_and_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let store = exported_store(root.path()).await;
        let library = library_in(&root.path().join("new"), 3);

        update(&json_config(library.clone()), &store, true)
            .await
            .unwrap();
        assert_eq!(played_count(&library), 3);
        assert!(!root.path().join("new").join("Playcounts").exists());
    }
}
