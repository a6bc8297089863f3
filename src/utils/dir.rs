use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

pub const APPLICATION_NAME: &str = "day-tracker";

/// Resolves the directory holding the catalog, the day log and the auxiliary documents.
/// `$XDG_STATE_HOME/day-tracker` or `$HOME/.local/state/day-tracker` on unix, `%APPDATA%` on
/// Windows.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = PathBuf::from(
                env::var("APPDATA").map_err(|_| anyhow!("APPDATA should be present on Windows"))?,
            );
            path.push(APPLICATION_NAME);
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push(APPLICATION_NAME);
            path
        }
    };

    ensure_dir(path)
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Locations of the documents inside the application directory.
#[derive(Debug, Clone)]
pub struct ApplicationPaths {
    dir: PathBuf,
}

impl ApplicationPaths {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog(&self) -> PathBuf {
        self.dir.join("catalog.toml")
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join("log.json")
    }

    pub fn planned(&self) -> PathBuf {
        self.dir.join("planned.json")
    }

    pub fn progress(&self) -> PathBuf {
        self.dir.join("progress.json")
    }

    pub fn secrets(&self) -> PathBuf {
        self.dir.join("secrets.toml")
    }
}
