//! Output directory bookkeeping.

use std::path::{Path, PathBuf};

use hh_core::Result;

/// Remove `dir` recursively if it exists, then recreate it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        tracing::debug!(dir = %dir.display(), "removing previous output");
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Create `dir` (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Names of the immediate subdirectories of `root`, sorted lexicographically.
pub fn subdirectories(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Paths matching `pattern` under `cwd`, relative to `cwd` and sorted.
pub fn matching(cwd: &Path, pattern: &str) -> Result<Vec<String>> {
    let full = format!("{}/{pattern}", glob::Pattern::escape(&cwd.to_string_lossy()));
    let opts = glob::MatchOptions { require_literal_leading_dot: true, ..Default::default() };
    let paths = glob::glob_with(&full, opts)
        .map_err(|e| hh_core::Error::Validation(format!("bad glob '{pattern}': {e}")))?;
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        let path: PathBuf = path.map_err(|e| {
            hh_core::Error::Io(std::io::Error::new(e.error().kind(), format!("{}: {}", e.path().display(), e.error())))
        })?;
        let rel = path.strip_prefix(cwd).unwrap_or(&path);
        out.push(rel.to_string_lossy().into_owned());
    }
    out.sort();
    Ok(out)
}

/// Like [`matching`], but a pattern with no match is returned verbatim, as a
/// shell without `nullglob` would pass it on.
pub fn expand_glob(cwd: &Path, pattern: &str) -> Result<Vec<String>> {
    let out = matching(cwd, pattern)?;
    if out.is_empty() {
        tracing::warn!(pattern, cwd = %cwd.display(), "glob matched nothing; passing it through");
        return Ok(vec![pattern.to_string()]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Res_s2/lm_250");
        std::fs::create_dir_all(out.join("eTau")).unwrap();
        std::fs::write(out.join("stale.json"), "{}").unwrap();

        reset_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn subdirectories_are_sorted_and_skip_files() {
        let dir = tempfile::tempdir().unwrap();
        for d in ["hm_450", "lm_250", "mm_340"] {
            std::fs::create_dir(dir.path().join(d)).unwrap();
        }
        std::fs::write(dir.path().join("limits_cmb.json"), "{}").unwrap();
        assert_eq!(subdirectories(dir.path()).unwrap(), ["hm_450", "lm_250", "mm_340"]);
    }

    #[test]
    fn glob_is_relative_and_passes_unmatched_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("muTau/300")).unwrap();
        std::fs::create_dir_all(dir.path().join("eTau/300")).unwrap();
        assert_eq!(expand_glob(dir.path(), "*/*").unwrap(), ["eTau/300", "muTau/300"]);
        assert_eq!(
            expand_glob(dir.path(), "*/*/workspace.root").unwrap(),
            ["*/*/workspace.root"]
        );
        assert!(matching(dir.path(), "limits_*.json").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_an_io_error_naming_it() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("eTau");
        std::fs::create_dir_all(locked.join("300")).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = matching(dir.path(), "*/*");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            // permissions are not enforced for this user (e.g. root)
            return;
        }
        match result {
            Err(hh_core::Error::Io(e)) => assert!(e.to_string().contains("eTau"), "{e}"),
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
