use anyhow::Result;
use std::path::{Path, PathBuf};
// Filesystem enumeration and size classification

/// Regular file found under the source root
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// One file to upload; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    pub remote_folder: String,
    pub file_name: String,
    pub file_size: u64,
}

impl UploadTarget {
    /// Size in whole mebibytes, as shown in progress lines
    pub fn size_mb(&self) -> u64 {
        self.file_size / 1_048_576
    }
}

/// Which upload path a file takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Simple,
    Session,
}

impl UploadKind {
    /// Files strictly below `threshold` bytes go through a simple upload
    pub fn classify(file_size: u64, threshold: u64) -> Self {
        if file_size < threshold {
            UploadKind::Simple
        } else {
            UploadKind::Session
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Simple => "simple",
            UploadKind::Session => "session",
        }
    }
}

/// File filter options
#[derive(Debug, Default, Clone)]
pub struct FileFilter {
    pub exclude_files: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

impl FileFilter {
    /// Check if a file should be included
    fn should_include_file(&self, path: &Path) -> bool {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        !self
            .exclude_files
            .iter()
            .any(|pattern| glob_match(pattern, &filename))
    }

    /// Check if a directory should be walked; `relative` excludes the root itself
    fn should_include_dir(&self, relative: &Path) -> bool {
        for pattern in &self.exclude_dirs {
            for component in relative.components() {
                if let Some(component_str) = component.as_os_str().to_str() {
                    if glob_match(pattern, component_str) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Simple glob matching (supports * wildcards)
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
            let middle = &pattern[1..pattern.len() - 1];
            return text.contains(middle);
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            return text.ends_with(suffix);
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            return text.starts_with(prefix);
        }
    }

    pattern == text
}

/// Recursive, sorted walk of regular files under `root`
///
/// Symlinks are not followed. Unreadable entries below the root are skipped
/// with a warning; only an unreadable root is an error.
pub fn enumerate_directory_filtered(root: &Path, filter: &FileFilter) -> Result<Vec<FileEntry>> {
    use walkdir::WalkDir;

    if !root.is_dir() {
        anyhow::bail!("source is not a directory: {}", root.display());
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Skip excluded directories entirely - this prevents walking into them
            if e.file_type().is_dir() {
                let rel = e.path().strip_prefix(root).unwrap_or(e.path());
                filter.should_include_dir(rel)
            } else {
                true
            }
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let path = err.path().unwrap_or(root).to_path_buf();
                match err.into_io_error() {
                    Some(io) => anyhow::bail!("cannot read {}: {io}", path.display()),
                    None => anyhow::bail!("cannot read {}", path.display()),
                }
            }
            Err(err) => {
                eprintln!("Warning: skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !filter.should_include_file(entry.path()) {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            entries.push(FileEntry {
                path: entry.path().to_path_buf(),
                size: metadata.len(),
            });
        }
    }

    Ok(entries)
}

/// Build the upload target for a walked file
///
/// With `preserve_tree` the file's sub-directory relative to `root` is
/// appended to `remote_folder`; otherwise every file lands flat in it.
pub fn build_target(
    entry: &FileEntry,
    root: &Path,
    remote_folder: &str,
    preserve_tree: bool,
) -> UploadTarget {
    let file_name = entry
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut folder = remote_folder.trim_matches('/').to_string();
    if preserve_tree {
        let rel_dir = entry
            .path
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(rel_dir) = rel_dir {
            for component in rel_dir.components() {
                if !folder.is_empty() {
                    folder.push('/');
                }
                folder.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }

    UploadTarget {
        local_path: entry.path.clone(),
        remote_folder: folder,
        file_name,
        file_size: entry.size,
    }
}
