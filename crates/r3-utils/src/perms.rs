//! Write-bit stripping for committed job directories (§3.2, §4.5).
//!
//! Committed jobs are sealed read-only by clearing every write bit on every
//! file and on the job directory itself; `remove` restores them before
//! deleting so the removal itself doesn't need special-case handling for
//! read-only trees.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const WRITE_BITS: u32 = 0o222;

/// Recursively clear all write bits under `root`, including `root` itself.
/// Files are visited before their parent directory so that a directory's
/// own write bit isn't cleared until its children no longer need it.
pub fn strip_write_permissions(root: &Path) -> io::Result<()> {
    if root.is_dir() {
        for entry in fs::read_dir(root)? {
            strip_write_permissions(&entry?.path())?;
        }
    }
    clear_write_bit(root)
}

/// Recursively restore the owner write bit under `root`, including `root`
/// itself. Directories are visited before their children so that traversal
/// doesn't fail on an unwritable parent.
pub fn restore_write_permissions(root: &Path) -> io::Result<()> {
    set_owner_write_bit(root)?;
    if root.is_dir() {
        for entry in fs::read_dir(root)? {
            restore_write_permissions(&entry?.path())?;
        }
    }
    Ok(())
}

fn clear_write_bit(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode() & !WRITE_BITS;
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}

fn set_owner_write_bit(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode() | 0o200;
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}
