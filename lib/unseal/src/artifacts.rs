use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, error, info};

/// Everything a session has put on disk, in creation order. On failure the
/// whole set is wiped so no partial output survives.
#[derive(Debug, Default)]
pub struct Artifacts {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl Artifacts {
    pub fn created_file(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn created_dir(&mut self, path: PathBuf) {
        self.dirs.push(path);
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Deletes files, then directories (which are only removed if empty).
    /// Failures are logged and skipped. Returns the number of paths removed.
    pub fn wipe(self) -> usize {
        let mut removed = 0;

        for f in self.files.iter().rev() {
            match fs::remove_file(f) {
                Ok(_) => {
                    debug!("Removed corrupt file {:?}", f);
                    removed += 1;
                }
                Err(e) => error!("ERROR DELETING CORRUPT FILE {:?}: {}", f, e),
            }
        }

        for d in self.dirs.iter().rev() {
            if remove_empty_dir(d) {
                removed += 1;
            }
        }

        info!("Rolled back {} output(s)", removed);
        removed
    }
}

fn remove_empty_dir(d: &Path) -> bool {
    match fs::remove_dir(d) {
        Ok(_) => true,
        Err(e) => {
            error!("Could not remove output directory {:?}: {}", d, e);
            false
        }
    }
}
