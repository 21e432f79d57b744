//! Clean-install teardown: remove an environment prefix together with the
//! stray temp/lock artifacts the environment manager leaves next to it.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a teardown removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub freed_bytes: u64,
}

/// Sibling entries such as `demo.tmp`, `.demo.lock`, `demo.partial-3f1a`.
fn artifact_pattern(env_name: &str) -> io::Result<Regex> {
    let pattern = format!(
        r"^\.?{}\.(?:tmp|lock|partial)[A-Za-z0-9_.-]*$",
        regex::escape(env_name)
    );
    Regex::new(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Remove `prefix` and matching sibling artifacts. A missing prefix is not an error.
pub fn clean_install(prefix: &Path) -> io::Result<CleanReport> {
    let mut report = CleanReport::default();

    if prefix.exists() {
        report.freed_bytes += dir_size(prefix);
        fs::remove_dir_all(prefix)?;
        report.removed.push(prefix.to_path_buf());
    }

    let (Some(parent), Some(name)) = (prefix.parent(), prefix.file_name()) else {
        return Ok(report);
    };
    let pattern = artifact_pattern(&name.to_string_lossy())?;
    let Ok(entries) = fs::read_dir(parent) else {
        return Ok(report);
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !pattern.is_match(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if path.is_dir() {
            report.freed_bytes += dir_size(&path);
            fs::remove_dir_all(&path)?;
        } else {
            report.freed_bytes += path.metadata().map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)?;
        }
        tracing::debug!(artifact = %path.display(), "removed stray artifact");
        report.removed.push(path);
    }
    report.removed.sort();
    Ok(report)
}

/// Total size of a directory, recursively.
fn dir_size(path: &Path) -> u64 {
    let mut total: u64 = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                total += dir_size(&p);
            } else if let Ok(meta) = p.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_prefix_and_artifacts_only() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("demo-dev");
        fs::create_dir_all(prefix.join("lib")).unwrap();
        fs::write(prefix.join("lib").join("keep.txt"), "x".repeat(10)).unwrap();
        fs::write(dir.path().join("demo-dev.tmp"), "t").unwrap();
        fs::write(dir.path().join(".demo-dev.lock"), "l").unwrap();
        fs::create_dir(dir.path().join("demo-dev.partial-01")).unwrap();
        fs::write(dir.path().join("demo-dev-other.tmp"), "keep").unwrap();
        fs::write(dir.path().join("other.lock"), "keep").unwrap();

        let report = clean_install(&prefix).unwrap();

        assert!(!prefix.exists());
        assert!(!dir.path().join("demo-dev.tmp").exists());
        assert!(!dir.path().join(".demo-dev.lock").exists());
        assert!(!dir.path().join("demo-dev.partial-01").exists());
        assert!(dir.path().join("demo-dev-other.tmp").exists());
        assert!(dir.path().join("other.lock").exists());
        assert_eq!(report.removed.len(), 4);
        assert_eq!(report.freed_bytes, 12);
    }

    #[test]
    fn test_missing_prefix_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let report = clean_install(&dir.path().join("absent")).unwrap();
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_env_name_is_escaped() {
        let re = artifact_pattern("a.b").unwrap();
        assert!(re.is_match("a.b.tmp"));
        assert!(!re.is_match("axb.tmp"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
