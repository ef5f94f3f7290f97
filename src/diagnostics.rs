// Best-effort diagnostic capture for wipe failures
//
// Attributes, ownership and permission entries become unreadable once a file
// is renamed or deleted, so they are collected before the destructive phase
// and attached to any failure the job reports later.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Rights held by one identity, split by origin
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct AccessEntry {
    inherited: Vec<String>,
    explicit: Vec<String>,
}

impl AccessEntry {
    fn merged(&self) -> String {
        let mut parts = Vec::new();
        if !self.inherited.is_empty() {
            parts.push(format!("Inherited: {}", self.inherited.join(", ")));
        }
        if !self.explicit.is_empty() {
            parts.push(format!("Explicit: {}", self.explicit.join(", ")));
        }
        parts.join("; ")
    }
}

/// Collect attributes and access entries for `path`
pub fn capture(path: &Path) -> io::Result<BTreeMap<String, String>> {
    let metadata = fs::metadata(path)?;
    let mut data = BTreeMap::new();

    data.insert("Length".to_string(), metadata.len().to_string());
    data.insert("Attributes".to_string(), platform::attributes(&metadata));

    let mut entries: BTreeMap<String, AccessEntry> = BTreeMap::new();
    platform::collect_entries(&metadata, false, &mut entries);
    if let Some(parent) = path.parent() {
        if let Ok(parent_meta) = fs::metadata(parent) {
            platform::collect_entries(&parent_meta, true, &mut entries);
        }
    }

    for (identity, entry) in entries {
        data.insert(identity, entry.merged());
    }

    Ok(data)
}

/// Make the file writable if it is read-only. Returns whether anything changed.
pub fn clear_readonly(path: &Path) -> io::Result<bool> {
    let metadata = fs::metadata(path)?;
    let mut permissions = metadata.permissions();
    if !permissions.readonly() {
        return Ok(false);
    }

    platform::make_writable(&mut permissions);
    fs::set_permissions(path, permissions)?;
    Ok(true)
}

#[cfg(unix)]
mod platform {
    use super::AccessEntry;
    use nix::unistd::{Gid, Group, Uid, User};
    use std::collections::BTreeMap;
    use std::fs::{Metadata, Permissions};
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    pub(super) fn attributes(metadata: &Metadata) -> String {
        let mut flags = Vec::new();
        if metadata.permissions().readonly() {
            flags.push("ReadOnly");
        }
        if metadata.is_dir() {
            flags.push("Directory");
        }
        if metadata.file_type().is_symlink() {
            flags.push("ReparsePoint");
        }
        if flags.is_empty() {
            flags.push("Normal");
        }
        format!("{} (mode {:o})", flags.join(", "), metadata.mode() & 0o7777)
    }

    pub(super) fn collect_entries(
        metadata: &Metadata,
        inherited: bool,
        entries: &mut BTreeMap<String, AccessEntry>,
    ) {
        let mode = metadata.mode();
        let owner = user_name(metadata.uid());
        let group = group_name(metadata.gid());

        let slots = [
            (format!("User:{}", owner), (mode >> 6) & 0o7),
            (format!("Group:{}", group), (mode >> 3) & 0o7),
            ("Everyone".to_string(), mode & 0o7),
        ];

        for (identity, bits) in slots {
            let entry = entries.entry(identity).or_default();
            let target = if inherited {
                &mut entry.inherited
            } else {
                &mut entry.explicit
            };
            target.push(rights(bits));
        }
    }

    pub(super) fn make_writable(permissions: &mut Permissions) {
        permissions.set_mode(permissions.mode() | 0o200);
    }

    fn rights(bits: u32) -> String {
        format!(
            "{}{}{}",
            if bits & 0o4 != 0 { 'r' } else { '-' },
            if bits & 0o2 != 0 { 'w' } else { '-' },
            if bits & 0o1 != 0 { 'x' } else { '-' }
        )
    }

    fn user_name(uid: u32) -> String {
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(user)) => user.name,
            _ => uid.to_string(),
        }
    }

    fn group_name(gid: u32) -> String {
        match Group::from_gid(Gid::from_raw(gid)) {
            Ok(Some(group)) => group.name,
            _ => gid.to_string(),
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::AccessEntry;
    use std::collections::BTreeMap;
    use std::fs::{Metadata, Permissions};
    use std::os::windows::fs::MetadataExt;

    const ATTRIBUTE_NAMES: [(u32, &str); 8] = [
        (0x1, "ReadOnly"),
        (0x2, "Hidden"),
        (0x4, "System"),
        (0x10, "Directory"),
        (0x20, "Archive"),
        (0x400, "ReparsePoint"),
        (0x800, "Compressed"),
        (0x4000, "Encrypted"),
    ];

    pub(super) fn attributes(metadata: &Metadata) -> String {
        let raw = metadata.file_attributes();
        let names: Vec<&str> = ATTRIBUTE_NAMES
            .iter()
            .filter(|(bit, _)| raw & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            format!("Normal (0x{:x})", raw)
        } else {
            format!("{} (0x{:x})", names.join(", "), raw)
        }
    }

    pub(super) fn collect_entries(
        metadata: &Metadata,
        inherited: bool,
        entries: &mut BTreeMap<String, AccessEntry>,
    ) {
        let rights = if metadata.permissions().readonly() {
            "Read"
        } else {
            "Read, Write"
        };
        let entry = entries.entry("Everyone".to_string()).or_default();
        if inherited {
            entry.inherited.push(rights.to_string());
        } else {
            entry.explicit.push(rights.to_string());
        }
    }

    #[allow(clippy::permissions_set_readonly_false)]
    pub(super) fn make_writable(permissions: &mut Permissions) {
        permissions.set_readonly(false);
    }
}
