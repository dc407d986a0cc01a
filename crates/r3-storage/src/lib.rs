//! On-disk owner of `<root>/jobs/*` (C5, §4.5).

mod error;

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use r3_model::{repository_path, Dependency, Job, MANIFEST_FILE, METADATA_FILE, OUTPUT_DIR};

pub use error::StorageError;

/// The repository format version written into every fresh `r3.yaml` at the
/// repository root (§6.1).
pub const FORMAT_VERSION: &str = "1.0.0-beta.5";

#[derive(Debug, Serialize, Deserialize)]
struct RepositoryManifest {
    version: String,
}

/// On-disk storage of committed jobs under `<root>/jobs/`.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a fresh repository layout at `path`: `path`, `path/git`,
    /// `path/jobs`, and `path/r3.yaml`. Fails if `path` already exists.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if path.exists() {
            return Err(StorageError::PathExists(path));
        }
        fs::create_dir_all(path.join("git"))?;
        fs::create_dir_all(path.join("jobs"))?;
        let manifest = RepositoryManifest {
            version: FORMAT_VERSION.to_string(),
        };
        fs::write(path.join("r3.yaml"), serde_yaml::to_string(&manifest)?)?;
        Ok(Self { root: path })
    }

    /// Open an existing repository at `path`. `path` must be a directory
    /// containing `r3.yaml` (§3.1).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if !path.join("r3.yaml").is_file() {
            return Err(StorageError::NotARepository(path));
        }
        Ok(Self { root: path })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn job_dir(&self, id: &str) -> PathBuf {
        self.jobs_dir().join(id)
    }

    /// Whether `job` is committed and its directory still exists.
    pub fn contains(&self, job: &Job) -> bool {
        match job.id() {
            Some(id) => self.job_dir(id).is_dir(),
            None => false,
        }
    }

    /// Whether a bare job id (without an in-memory `Job`) is committed.
    pub fn contains_id(&self, id: &str) -> bool {
        self.job_dir(id).is_dir()
    }

    /// The on-disk directory a committed job with this id occupies.
    pub fn job_path(&self, id: &str) -> PathBuf {
        self.job_dir(id)
    }

    /// Whether a resolved dependency (`Job` or `Git`) refers to something
    /// actually present in this repository — a committed job id, or a path
    /// at a commit in a mirrored source-control repository (§4.2, §4.7
    /// `commit` step 2).
    pub fn dependency_exists(&self, dep: &Dependency) -> Result<bool, StorageError> {
        match dep {
            Dependency::Job(d) => Ok(self.contains_id(&d.job)),
            Dependency::Git(d) => {
                let repo_dir = self.root.join(repository_path(&d.repository)?);
                Ok(r3_scm::path_exists(&repo_dir, &d.commit, &d.source))
            }
            Dependency::Query(_) | Dependency::QueryAll(_) => {
                Err(StorageError::UnresolvedDependency)
            }
        }
    }

    /// Every committed job under `jobs/`, in directory-listing order.
    /// Entries whose name isn't a well-formed UUID are ignored (§3.1).
    pub fn jobs(&self) -> Result<Vec<Job>, StorageError> {
        let dir = self.jobs_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if Uuid::parse_str(&name).is_ok() {
                out.push(Job::with_id(entry.path(), name.into_owned()));
            }
        }
        Ok(out)
    }

    /// Commit `job`'s files into a fresh `jobs/<uuid>/` directory,
    /// recomputing its hash and sealing it read-only (§4.5 `add`).
    ///
    /// `job` must already be resolved: every dependency a concrete
    /// `Job`/`Git` reference, not a pending query.
    pub fn add(&self, job: &mut Job) -> Result<Job, StorageError> {
        let job_id = Uuid::new_v4().to_string();
        let tmp_dir = self.jobs_dir().join(format!(".tmp-{job_id}"));
        let target_dir = self.job_dir(&job_id);
        fs::create_dir_all(&tmp_dir)?;

        job.hash(true)?;

        let files: Vec<(PathBuf, PathBuf)> = job
            .files()?
            .iter()
            .filter(|(dest, _)| {
                dest.as_os_str() != MANIFEST_FILE && dest.as_os_str() != METADATA_FILE
            })
            .map(|(dest, src)| (dest.clone(), src.clone()))
            .collect();
        for (dest, src) in &files {
            let dest_path = tmp_dir.join(dest);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(src, &dest_path)?;
        }

        let config_yaml = serde_yaml::to_string(job.config()?)?;
        fs::write(tmp_dir.join(MANIFEST_FILE), config_yaml)?;
        let metadata_yaml = serde_yaml::to_string(job.metadata()?)?;
        fs::write(tmp_dir.join(METADATA_FILE), metadata_yaml)?;
        fs::create_dir_all(tmp_dir.join(OUTPUT_DIR))?;

        let dependencies = job.config()?.dependencies.clone();
        r3_utils::perms::strip_write_permissions(&tmp_dir)?;
        fs::rename(&tmp_dir, &target_dir)?;

        let mut committed = Job::with_id(target_dir, job_id);
        committed.set_dependencies(dependencies)?;
        Ok(committed)
    }

    /// Materialise a committed job into a fresh working directory: user
    /// files are copied, `output/` and every dependency are symlinked
    /// (§4.5 `checkout`, Job branch).
    pub fn checkout_job(&self, job: &mut Job, dest: &Path) -> Result<(), StorageError> {
        if !self.contains(job) {
            return Err(StorageError::NotFound(
                job.id().unwrap_or("<uncommitted>").to_string(),
            ));
        }
        let id = job.id().expect("checked above").to_string();
        let job_dir = self.job_dir(&id);

        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(&job_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name == MANIFEST_FILE || name == METADATA_FILE || name == OUTPUT_DIR {
                continue;
            }
            copy_recursive(&entry.path(), &dest.join(&name))?;
        }
        symlink(job_dir.join(OUTPUT_DIR), dest.join(OUTPUT_DIR))?;

        for dep in job.dependencies()?.to_vec() {
            self.checkout_dependency(&dep, dest)?;
        }
        Ok(())
    }

    /// Materialise a single resolved dependency at `working_root.join(dep.destination())`
    /// (§4.5 `checkout`, JobDep/GitDep branches).
    pub fn checkout_dependency(
        &self,
        dep: &Dependency,
        working_root: &Path,
    ) -> Result<(), StorageError> {
        let target = working_root.join(dep.destination());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match dep {
            Dependency::Job(d) => {
                let source = if d.source.is_empty() {
                    self.job_dir(&d.job)
                } else {
                    self.job_dir(&d.job).join(&d.source)
                };
                symlink(source, target)?;
                Ok(())
            }
            Dependency::Git(d) => {
                let repo_dir = self.root.join(repository_path(&d.repository)?);
                r3_scm::checkout_subpath(&repo_dir, &d.commit, &d.source, &target)?;
                Ok(())
            }
            Dependency::Query(_) | Dependency::QueryAll(_) => {
                Err(StorageError::UnresolvedDependency)
            }
        }
    }

    /// Restore write permissions and delete `job`'s committed directory.
    /// The caller is responsible for checking that no other job depends on
    /// it first (§4.5 `remove`).
    pub fn remove(&self, job: &Job) -> Result<(), StorageError> {
        let id = job
            .id()
            .ok_or_else(|| StorageError::NotFound("<uncommitted>".to_string()))?;
        let job_dir = self.job_dir(id);
        if !job_dir.is_dir() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        r3_utils::perms::restore_write_permissions(&job_dir)?;
        fs::remove_dir_all(&job_dir)?;
        Ok(())
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();
        assert!(storage.root().join("r3.yaml").is_file());
        assert!(storage.root().join("jobs").is_dir());
        assert!(storage.root().join("git").is_dir());
    }

    #[test]
    fn init_fails_if_path_exists() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        assert!(matches!(
            Storage::init(&root),
            Err(StorageError::PathExists(_))
        ));
    }

    #[test]
    fn open_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Storage::open(dir.path()),
            Err(StorageError::NotARepository(_))
        ));
    }

    fn commit_simple_job(storage: &Storage, root: &Path, contents: &str) -> Job {
        fs::write(root.join("run.py"), contents).unwrap();
        let mut job = Job::new(root);
        storage.add(&mut job).unwrap()
    }

    #[test]
    fn add_seals_job_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let committed = commit_simple_job(&storage, &work, "print('hi')\n");

        let job_dir = storage.job_dir(committed.id().unwrap());
        assert!(job_dir.join(OUTPUT_DIR).is_dir());

        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(job_dir.join("run.py")).unwrap().permissions().mode();
        assert_eq!(mode & 0o222, 0, "committed file must have no write bits set");
    }

    #[test]
    fn add_is_hash_stable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();

        let work_a = dir.path().join("a");
        fs::create_dir_all(&work_a).unwrap();
        let mut a = commit_simple_job(&storage, &work_a, "same content\n");

        let work_b = dir.path().join("b");
        fs::create_dir_all(&work_b).unwrap();
        let mut b = commit_simple_job(&storage, &work_b, "same content\n");

        assert_ne!(a.id(), b.id());
        assert_eq!(
            a.config().unwrap().hashes.get("."),
            b.config().unwrap().hashes.get(".")
        );
    }

    #[test]
    fn checkout_copies_files_and_symlinks_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let mut committed = commit_simple_job(&storage, &work, "print('hi')\n");

        let dest = dir.path().join("checkout");
        storage.checkout_job(&mut committed, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("run.py")).unwrap(), "print('hi')\n");
        let meta = fs::symlink_metadata(dest.join(OUTPUT_DIR)).unwrap();
        assert!(meta.file_type().is_symlink());
    }

    #[test]
    fn dependency_exists_reflects_committed_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let committed = commit_simple_job(&storage, &work, "print('hi')\n");

        let present = Dependency::Job(r3_model::JobDependency {
            job: committed.id().unwrap().to_string(),
            source: String::new(),
            destination: PathBuf::from("dep"),
            query: None,
            query_all: None,
        });
        assert!(storage.dependency_exists(&present).unwrap());

        let missing = Dependency::Job(r3_model::JobDependency {
            job: "11111111-1111-1111-1111-111111111111".to_string(),
            source: String::new(),
            destination: PathBuf::from("dep"),
            query: None,
            query_all: None,
        });
        assert!(!storage.dependency_exists(&missing).unwrap());
    }

    #[test]
    fn remove_restores_permissions_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let storage = Storage::init(&root).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let committed = commit_simple_job(&storage, &work, "print('hi')\n");
        let job_dir = storage.job_dir(committed.id().unwrap());
        assert!(job_dir.is_dir());

        storage.remove(&committed).unwrap();
        assert!(!job_dir.exists());
    }
}
