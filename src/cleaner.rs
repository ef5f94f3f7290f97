// Folder cleaner - renames and removes directories emptied by a wipe pass
//
// Runs after the scheduler has drained. A directory is removed only once
// everything below it is gone; directories that still hold a file whose
// wipe failed are kept so the failed files can be retried on their own.

use crate::renamer::EntryRenamer;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Original paths of the directories that were wiped
    pub removed: Vec<PathBuf>,
    /// Directories left in place
    pub retained: Vec<PathBuf>,
}

impl CleanReport {
    pub fn is_clean(&self) -> bool {
        self.retained.is_empty()
    }
}

pub struct FolderCleaner {
    repeats: u32,
    renamer: EntryRenamer,
}

impl FolderCleaner {
    pub fn new(repeats: u32) -> Self {
        Self {
            repeats: repeats.max(1),
            renamer: EntryRenamer::new(),
        }
    }

    /// Wipe every empty directory under each base folder, base included
    pub fn clean<I, P>(&mut self, base_folders: I) -> CleanReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = CleanReport::default();
        for base in base_folders {
            let base = base.as_ref();
            if !base.is_dir() {
                tracing::debug!(path = %base.display(), "Base folder already gone");
                continue;
            }
            self.clean_tree(base, &mut report);
        }
        report
    }

    fn clean_tree(&mut self, base: &Path, report: &mut CleanReport) {
        // Children are yielded before their parent
        let walker = WalkDir::new(base).follow_links(false).contents_first(true);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(base = %base.display(), error = %e, "Failed to walk folder");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            match self.wipe_if_empty(dir) {
                Ok(true) => report.removed.push(dir.to_path_buf()),
                Ok(false) => {
                    tracing::warn!(path = %dir.display(), "Folder not empty, keeping it");
                    report.retained.push(dir.to_path_buf());
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to wipe folder");
                    report.retained.push(dir.to_path_buf());
                }
            }
        }
    }

    fn wipe_if_empty(&mut self, dir: &Path) -> anyhow::Result<bool> {
        if fs::read_dir(dir)?.next().is_some() {
            return Ok(false);
        }
        let renamed = self.renamer.wipe_entry_repeatedly(dir, self.repeats)?;
        fs::remove_dir(&renamed)?;
        tracing::debug!(path = %dir.display(), "Folder wiped");
        Ok(true)
    }
}
