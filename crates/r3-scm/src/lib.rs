//! Adapter onto locally mirrored git repositories (C2, §4.2).
//!
//! Mirrors are stored bare and flat at `<root>/<repository_path>` (§6.3);
//! this crate never mutates a mirror's working tree because a bare
//! repository has none.

mod error;

use std::fs;
use std::path::Path;

use git2::{FetchOptions, Repository};

pub use error::ScmError;

/// Returns true iff `repo_dir` is a git repository, `commit` resolves, and
/// walking its tree by `subpath`'s components terminates at an existing
/// entry. `subpath == "."` degrades to a plain commit-exists check.
pub fn path_exists(repo_dir: &Path, commit: &str, subpath: &str) -> bool {
    let Ok(repo) = Repository::open_bare(repo_dir) else {
        return false;
    };
    let Ok(object) = repo.revparse_single(commit) else {
        return false;
    };
    let Ok(commit) = object.peel_to_commit() else {
        return false;
    };
    if subpath == "." || subpath.is_empty() {
        return true;
    }
    let Ok(tree) = commit.tree() else {
        return false;
    };
    tree.get_path(Path::new(subpath)).is_ok()
}

/// Materialise `subpath` at `commit` into `dest`, copying (never
/// symlinking — the adapter only produces plain files and directories; the
/// symlink-vs-copy decision belongs to the storage layer that calls this).
pub fn checkout_subpath(
    repo_dir: &Path,
    commit: &str,
    subpath: &str,
    dest: &Path,
) -> Result<(), ScmError> {
    let repo = Repository::open_bare(repo_dir)?;
    let commit = repo.revparse_single(commit)?.peel_to_commit()?;
    let tree = commit.tree()?;

    if subpath == "." || subpath.is_empty() {
        return checkout_tree(&repo, &tree, dest);
    }

    let entry = tree.get_path(Path::new(subpath))?;
    let object = entry.to_object(&repo)?;
    if let Some(subtree) = object.as_tree() {
        checkout_tree(&repo, subtree, dest)
    } else if let Some(blob) = object.as_blob() {
        write_blob(blob, dest)
    } else {
        Ok(())
    }
}

fn checkout_tree(repo: &Repository, tree: &git2::Tree<'_>, dest: &Path) -> Result<(), ScmError> {
    fs::create_dir_all(dest)?;
    for entry in tree.iter() {
        let name = entry.name().unwrap_or_default();
        let entry_dest = dest.join(name);
        let object = entry.to_object(repo)?;
        if let Some(subtree) = object.as_tree() {
            checkout_tree(repo, subtree, &entry_dest)?;
        } else if let Some(blob) = object.as_blob() {
            write_blob(blob, &entry_dest)?;
        }
    }
    Ok(())
}

fn write_blob(blob: &git2::Blob<'_>, dest: &Path) -> Result<(), ScmError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, blob.content())?;
    Ok(())
}

/// Shallow-fetch `commit` from `url` into the bare mirror at `repo_dir`,
/// creating the mirror if it doesn't exist yet. Grounded in the
/// `git fetch --depth=1 <url> <commit>` strategy used for mirrors mirrored
/// from scratch.
pub fn mirror_commit(repo_dir: &Path, url: &str, commit: &str) -> Result<(), ScmError> {
    let repo = if repo_dir.join("HEAD").exists() {
        Repository::open_bare(repo_dir)?
    } else {
        if let Some(parent) = repo_dir.parent() {
            fs::create_dir_all(parent)?;
        }
        Repository::init_bare(repo_dir)?
    };

    let mut remote = repo.remote_anonymous(url)?;
    let mut fetch_options = FetchOptions::new();
    fetch_options.depth(1);
    remote.fetch(&[commit], Some(&mut fetch_options), None)?;
    Ok(())
}
