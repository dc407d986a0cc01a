use std::path::{Path, PathBuf};

use crate::HashError;

/// Enumerate every file under `root`, skipping entries matched by
/// `ignore_patterns`, and return paths relative to `root` in a
/// deterministic (sorted, depth-first) order.
///
/// Patterns are a restricted subset: every pattern must start with `/` and
/// name a direct child of the *current* recursion root (`"/<name>"`). When
/// descending into directory `d`, a pattern `"/d/rest"` is rewritten to
/// `"/rest"` for the recursive call; patterns not prefixed by `/d` are
/// dropped before descending. A pattern that doesn't start with `/` is
/// rejected outright.
pub fn find_files(
    root: impl AsRef<Path>,
    ignore_patterns: &[String],
) -> Result<Vec<PathBuf>, HashError> {
    for pattern in ignore_patterns {
        if !pattern.starts_with('/') {
            return Err(HashError::UnsupportedIgnorePattern(pattern.clone()));
        }
    }
    let mut out = Vec::new();
    walk(root.as_ref(), Path::new(""), ignore_patterns, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk(
    base: &Path,
    relative: &Path,
    ignore_patterns: &[String],
    out: &mut Vec<PathBuf>,
) -> Result<(), HashError> {
    let dir = base.join(relative);
    let mut entries: Vec<_> = std::fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_ignored(&name, ignore_patterns) {
            continue;
        }

        let child_relative = relative.join(name.as_ref());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let child_patterns = rewrite_patterns(&name, ignore_patterns);
            walk(base, &child_relative, &child_patterns, out)?;
        } else {
            out.push(child_relative);
        }
    }
    Ok(())
}

fn is_ignored(name: &str, patterns: &[String]) -> bool {
    let needle = format!("/{name}");
    patterns.iter().any(|p| p == &needle)
}

fn rewrite_patterns(dir_name: &str, patterns: &[String]) -> Vec<String> {
    let prefix = format!("/{dir_name}/");
    patterns
        .iter()
        .filter_map(|p| p.strip_prefix(&prefix).map(|rest| format!("/{rest}")))
        .collect()
}
