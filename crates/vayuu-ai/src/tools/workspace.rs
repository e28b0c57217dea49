//! Path resolution shared by the workspace tools.

use std::path::{Component, Path, PathBuf};

/// Agent working directory with a traversal guard.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path.
    ///
    /// `~/` paths are taken as explicit references to the user's home and
    /// returned as is. Everything else must stay inside the workspace.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("path must not be empty".to_string());
        }

        if let Some(rest) = trimmed.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or("cannot resolve home directory")?;
            return Ok(normalize(&home.join(rest)));
        }

        let full = normalize(&self.root.join(trimmed));
        if !full.starts_with(&self.root) {
            return Err(format!("path traversal not allowed: {}", trimmed));
        }
        Ok(full)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// A `..` that cannot cancel a named component is kept on relative paths and
/// dropped at the root of absolute ones.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Human-readable byte size (`512 B`, `1.50 KB`, `10.00 MB`).
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}
