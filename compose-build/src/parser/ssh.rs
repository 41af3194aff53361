use std::fmt;

use crate::models::SshEntry;

impl From<&str> for SshEntry {
    fn from(entry: &str) -> Self {
        if entry == "default" {
            return SshEntry::Default;
        }

        match entry.find('=') {
            Some(index) => SshEntry::Key {
                id: entry[..index].into(),
                path: Some(entry[index + 1..].into()),
            },
            None => SshEntry::Key {
                id: entry.into(),
                path: None,
            },
        }
    }
}

impl fmt::Display for SshEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshEntry::Default => f.write_str("default"),
            SshEntry::Key { id, path: Some(path) } => write!(f, "{}={}", id, path),
            SshEntry::Key { id, path: None } => f.write_str(id),
        }
    }
}

pub fn resolve_ssh(entries: &[SshEntry]) -> Vec<String> {
    entries.iter().map(SshEntry::to_string).collect()
}
