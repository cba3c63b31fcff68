use std::io::{self, Write};
use std::time::Duration;

use cfs::config::{FileSettings, SettingsError};
use cfs::filesystem::{
    AccessError, CreationError, DeletionError, Directory, Entry, Enumerable, FileSystem,
    FileSystemCreationError, NavigationError, Node, StorageError, Watchable,
};
use compio::time::sleep;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::application::output;
use crate::cli::Command;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        output::configure_colors();

        let settings = FileSettings::read(&app_config.root)
            .await
            .context(SettingsSnafu)?;
        let fs = FileSystem::with_settings(&app_config.root, settings)
            .context(FileSystemSnafu)?;
        debug!("Running {:?} on {:?}", app_config.command, fs);

        match app_config.command {
            Command::Ls { path } => Self::list(&fs, &path),
            Command::Mkdir { path, parents } => Self::make_directory(&fs, &path, parents),
            Command::Touch { path } => fs
                .file(&path)
                .context(NavigationSnafu)?
                .create_safe()
                .context(CreationSnafu),
            Command::Rm { path } => Self::remove(&fs, &path),
            Command::Cat { path } => Self::concatenate(&fs, &path),
            Command::Stat { path } => Self::stat(&fs, &path),
            Command::Watch { path, seconds } => Self::watch(&fs, &path, seconds).await,
        }
    }

    fn list(fs: &FileSystem, path: &str) -> Result<(), ApplicationError> {
        let directory = fs.directory(path).context(NavigationSnafu)?;
        ensure!(
            directory.exists(),
            MissingSnafu {
                path: directory.path()
            }
        );

        for child in directory.list_directories().context(StorageSnafu)? {
            output::print_directory(&child);
        }
        for file in directory.list_all_files().context(StorageSnafu)? {
            output::print_file(&file);
        }
        Ok(())
    }

    fn make_directory(fs: &FileSystem, path: &str, parents: bool) -> Result<(), ApplicationError> {
        let directory = fs.directory(path).context(NavigationSnafu)?;
        let created = if parents {
            directory.create_all()
        } else {
            directory.create()
        };
        created.context(CreationSnafu)
    }

    fn remove(fs: &FileSystem, path: &str) -> Result<(), ApplicationError> {
        let entry = Self::resolve_entry(fs, path)?;
        ensure!(
            !matches!(&entry, Entry::Directory(directory) if directory.is_root()),
            RootRemovalSnafu
        );
        entry.delete().context(DeletionSnafu)?;
        info!("Removed {}", entry.path());
        Ok(())
    }

    fn concatenate(fs: &FileSystem, path: &str) -> Result<(), ApplicationError> {
        let file = fs.file(path).context(NavigationSnafu)?;
        let mut reader = file.open_read().context(AccessSnafu)?;
        let mut stdout = io::stdout().lock();
        io::copy(&mut reader, &mut stdout).context(OutputSnafu)?;
        stdout.flush().context(OutputSnafu)
    }

    fn stat(fs: &FileSystem, path: &str) -> Result<(), ApplicationError> {
        let file = fs.file(path).context(NavigationSnafu)?;
        ensure!(file.exists(), MissingSnafu { path: file.path() });

        let size = file.size().context(StorageSnafu)?;
        let attributes = file.attributes().context(StorageSnafu)?;
        output::print_stat(&file, size, &attributes);
        Ok(())
    }

    async fn watch(fs: &FileSystem, path: &str, seconds: Option<u64>) -> Result<(), ApplicationError> {
        let directory = fs.directory(path).context(NavigationSnafu)?;
        if let Some(reason) = directory.watch_unavailable() {
            return WatchUnavailableSnafu {
                path: directory.path(),
                reason: reason.to_string(),
            }
            .fail();
        }

        directory.on_create(output::print_modification);
        directory.on_delete(output::print_modification);
        directory.on_modify(output::print_modification);
        directory.activate();
        info!("Watching {}", directory.path());

        match seconds {
            Some(seconds) => sleep(Duration::from_secs(seconds)).await,
            None => futures::future::pending::<()>().await,
        }

        directory.deactivate();
        Ok(())
    }

    /// Resolves `path` as a directory if one exists there, as a file otherwise.
    fn resolve_entry(fs: &FileSystem, path: &str) -> Result<Entry, ApplicationError> {
        let directory: Directory = fs.directory(path).context(NavigationSnafu)?;
        if directory.physical_path().is_dir() {
            return Ok(Entry::from(directory));
        }
        fs.file(path).map(Entry::from).context(NavigationSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while reading settings"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Critical failure encountered while creating the filesystem"))]
    FileSystemError { source: FileSystemCreationError },
    #[snafu(display("Invalid path"))]
    NavigationError { source: NavigationError },
    #[snafu(display("{} does not exist", path))]
    MissingError { path: String },
    #[snafu(display("Failed to create the entry"))]
    CreationError { source: CreationError },
    #[snafu(display("Failed to delete the entry"))]
    DeletionError { source: DeletionError },
    #[snafu(display("Refusing to remove the filesystem root"))]
    RootRemovalError,
    #[snafu(display("Failed to read from storage"))]
    StorageError { source: StorageError },
    #[snafu(display("Failed to access the file"))]
    AccessError { source: AccessError },
    #[snafu(display("Failed to write to stdout"))]
    OutputError { source: io::Error },
    #[snafu(display("Cannot watch {}: {}", path, reason))]
    WatchUnavailableError { path: String, reason: String },
}
