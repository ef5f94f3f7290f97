// Entry renamer - replaces a file or directory name with random characters
//
// The new name keeps the exact character length of the old one and stays in
// the same parent directory, so the directory entry is overwritten in place
// before the final delete.

use crate::algorithms::random::random_safe_name;
use crate::{WipeError, WipeResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

/// Attempts at finding a free name before giving up
const MAX_NAME_ATTEMPTS: usize = 64;

pub struct EntryRenamer {
    rng: StdRng,
}

impl Default for EntryRenamer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryRenamer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Rename `path` once to a random name of the same length
    pub fn wipe_entry(&mut self, path: &Path) -> WipeResult<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(WipeError::BadPath {
                path: path.to_path_buf(),
            });
        }

        let (parent, name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => {
                return Err(WipeError::BadPath {
                    path: path.to_path_buf(),
                })
            }
        };

        let metadata = fs::symlink_metadata(path)?;
        let name_len = name.to_string_lossy().chars().count();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let candidate = parent.join(random_safe_name(&mut self.rng, name_len));
            if candidate == path || fs::symlink_metadata(&candidate).is_ok() {
                continue;
            }

            fs::rename(path, &candidate)?;
            tracing::trace!(
                from = %path.display(),
                to = %candidate.display(),
                is_dir = metadata.is_dir(),
                "Entry renamed"
            );
            return Ok(candidate);
        }

        Err(WipeError::NameExhausted {
            path: path.to_path_buf(),
        })
    }

    /// Rename `repeats` times, each output feeding the next call
    pub fn wipe_entry_repeatedly(&mut self, path: &Path, repeats: u32) -> WipeResult<PathBuf> {
        let mut current = path.to_path_buf();
        for _ in 0..repeats {
            current = self.wipe_entry(&current)?;
        }
        Ok(current)
    }
}
