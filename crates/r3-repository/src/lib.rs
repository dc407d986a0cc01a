//! Repository facade (C7, §4.7): composes [`r3_storage::Storage`] and
//! [`r3_index::Index`] into the operations an outer caller (the CLI)
//! actually drives — `commit`, `checkout`, `remove`, `find`, `resolve`, and
//! `rebuild_index`.

mod error;
mod resolve;

pub use error::Error;

use std::path::{Path, PathBuf};

use r3_index::Index;
use r3_model::{Dependency, Job};
use r3_storage::Storage;

/// A content-addressed repository of committed jobs: the composition of
/// on-disk storage and its denormalised search index (§3.6).
pub struct Repository {
    storage: Storage,
    index: Index,
}

impl Repository {
    /// Create a fresh repository at `path`, creating parent directories as
    /// needed (§4.7 `init`).
    pub fn init(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let storage = Storage::init(path)?;
        let index = Index::open(storage.root());
        Ok(Self { storage, index })
    }

    /// Open an existing repository at `path`. Validates §3.1's invariant
    /// (a directory containing `r3.yaml`) without eagerly loading the index
    /// — index state stays lazy per §4.6.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let storage = Storage::open(path)?;
        let index = Index::open(storage.root());
        Ok(Self { storage, index })
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    /// Whether `job` is committed to this repository.
    pub fn contains_job(&self, job: &Job) -> bool {
        self.storage.contains(job)
    }

    /// Whether `dep` refers to something present in this repository. An
    /// unresolved query/query-all dependency is first resolved; resolution
    /// failure (no matching jobs, or a malformed query) reports `false`
    /// rather than propagating the error (§4.7 `contains`).
    pub fn contains_dependency(&mut self, dep: &Dependency) -> Result<bool, Error> {
        let resolved = match self.resolve_dependency(dep) {
            Ok(resolved) => resolved,
            Err(_) => return Ok(false),
        };
        for dep in &resolved {
            if !self.storage.dependency_exists(dep)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Commit `job`: resolve every query, verify every resolved dependency
    /// exists, stamp `committed_at`, copy the job in and seal it read-only,
    /// then record it in the index (§4.7 `commit`). Returns the committed
    /// job alongside any non-fatal warnings (e.g. overwriting an existing
    /// `committed_at`) for the caller to surface.
    pub fn commit(&mut self, job: Job) -> Result<(Job, Vec<String>), Error> {
        let mut warnings = Vec::new();
        let mut job = self.resolve_job(job)?;

        for dep in job.dependencies()?.to_vec() {
            if !self.storage.dependency_exists(&dep)? {
                return Err(Error::MissingDependency(describe_dependency(&dep)));
            }
        }

        if job.metadata()?.committed_at.is_some() {
            warnings.push(format!(
                "job at {} already has a committed_at; overwriting",
                job.root().display()
            ));
        }
        job.metadata_mut()?.committed_at =
            Some(r3_model::format_system_time(std::time::SystemTime::now()));

        let mut committed = self.storage.add(&mut job)?;
        self.index.add(&mut committed)?;
        Ok((committed, warnings))
    }

    /// Rewrite `job`'s dependency list, turning every `QueryDep`/
    /// `QueryAllDep` into one or more concrete `JobDep`s in their original
    /// positional slot (§4.7 `commit` step 1).
    fn resolve_job(&mut self, mut job: Job) -> Result<Job, Error> {
        let dependencies = job.dependencies()?.to_vec();
        let mut resolved = Vec::with_capacity(dependencies.len());
        for dep in &dependencies {
            resolved.extend(self.resolve_dependency(dep)?);
        }
        job.set_dependencies(resolved)?;
        Ok(job)
    }

    /// Materialise a committed job into a fresh working directory (§4.5,
    /// §4.7 `checkout`, Job branch).
    pub fn checkout(&mut self, job: &mut Job, dest: &Path) -> Result<(), Error> {
        Ok(self.storage.checkout_job(job, dest)?)
    }

    /// Materialise a single dependency at `dest.join(dep.destination())`.
    /// An unresolved query/query-all dependency is resolved first; a
    /// `QueryAllDep` checks out every matched job (§4.7 `checkout`).
    pub fn checkout_dependency(&mut self, dep: &Dependency, dest: &Path) -> Result<(), Error> {
        for resolved in self.resolve_dependency(dep)? {
            self.storage.checkout_dependency(&resolved, dest)?;
        }
        Ok(())
    }

    /// Remove a committed job. Fails with `HasDependents` if any other
    /// committed job still depends on it (§4.7 `remove`, §8 property 7).
    pub fn remove(&mut self, job: &Job) -> Result<(), Error> {
        let id = job
            .id()
            .ok_or_else(|| Error::NotFound("<uncommitted job>".to_string()))?;
        if !self.storage.contains_id(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        let dependents = self.index.find_dependents(id)?;
        if !dependents.is_empty() {
            return Err(Error::HasDependents {
                job: id.to_string(),
                dependents,
            });
        }
        self.storage.remove(job)?;
        self.index.remove(id)?;
        Ok(())
    }

    /// Jobs whose tag set is a superset of `tags`, ascending by commit
    /// datetime (§4.7 `find`, delegating to the index).
    pub fn find(&mut self, tags: &[String], latest: bool) -> Result<Vec<Job>, Error> {
        let ids = self.index.find(tags, latest)?;
        Ok(ids
            .into_iter()
            .map(|id| {
                let root = self.storage.job_path(&id);
                Job::with_id(root, id)
            })
            .collect())
    }

    /// Recompute the whole index from the committed jobs under `jobs/`,
    /// discarding whatever was there before (§4.6 `rebuild`, §8 property 8).
    pub fn rebuild_index(&mut self) -> Result<(), Error> {
        let mut jobs = self.storage.jobs()?;
        self.index.rebuild(jobs.iter_mut())?;
        Ok(())
    }
}

/// A human-readable description of a dependency for `MissingDependency`
/// error messages.
fn describe_dependency(dep: &Dependency) -> String {
    match dep {
        Dependency::Job(d) => format!("job {}", d.job),
        Dependency::Git(d) => format!("{}@{}", d.repository, d.commit),
        Dependency::Query(d) => format!("query \"{}\"", d.query),
        Dependency::QueryAll(d) => format!("query_all \"{}\"", d.query_all),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_job(root: &Path, name: &str, contents: &str) {
        fs::write(root.join(name), contents).unwrap();
    }

    #[test]
    fn init_creates_repository() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("repo");
        let repo = Repository::init(&root).unwrap();
        assert!(repo.root().join("r3.yaml").is_file());
    }

    #[test]
    fn open_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Repository::open(dir.path()).is_err());
    }

    #[test]
    fn commit_then_find_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        write_job(&work, "run.py", "print('hi')\n");
        fs::write(
            work.join("metadata.yaml"),
            "tags: [\"experiment\"]\n",
        )
        .unwrap();

        let (committed, warnings) = repo.commit(Job::new(&work)).unwrap();
        assert!(warnings.is_empty());
        assert!(committed.id().is_some());

        let found = repo.find(&["experiment".to_string()], false).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), committed.id());
    }

    #[test]
    fn commit_resolves_query_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let base_work = dir.path().join("base");
        fs::create_dir_all(&base_work).unwrap();
        write_job(&base_work, "run.py", "a\n");
        fs::write(base_work.join("metadata.yaml"), "tags: [\"base\"]\n").unwrap();
        let (base, _) = repo.commit(Job::new(&base_work)).unwrap();
        let base_id = base.id().unwrap().to_string();

        let dependent_work = dir.path().join("dependent");
        fs::create_dir_all(&dependent_work).unwrap();
        write_job(&dependent_work, "run.py", "b\n");
        fs::write(
            dependent_work.join("r3.yaml"),
            "dependencies:\n  - query: \"#base\"\n    source: output\n    destination: prev\nignore: []\n",
        )
        .unwrap();
        let (mut dependent, _) = repo.commit(Job::new(&dependent_work)).unwrap();

        let deps = dependent.dependencies().unwrap();
        assert_eq!(deps.len(), 1);
        match &deps[0] {
            Dependency::Job(d) => {
                assert_eq!(d.job, base_id);
                assert_eq!(d.query.as_deref(), Some("#base"));
                assert_eq!(d.source, "output");
            }
            other => panic!("expected a resolved JobDependency, got {other:?}"),
        }
    }

    #[test]
    fn commit_resolves_query_all_with_per_job_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let mut seed_ids = Vec::new();
        for label in ["a", "b"] {
            let work = dir.path().join(format!("seed-{label}"));
            fs::create_dir_all(&work).unwrap();
            write_job(&work, "run.py", label);
            fs::write(work.join("metadata.yaml"), "tags: [\"x\"]\n").unwrap();
            let (job, _) = repo.commit(Job::new(&work)).unwrap();
            seed_ids.push(job.id().unwrap().to_string());
        }

        let dependent_work = dir.path().join("dependent");
        fs::create_dir_all(&dependent_work).unwrap();
        write_job(&dependent_work, "run.py", "c");
        fs::write(
            dependent_work.join("r3.yaml"),
            "dependencies:\n  - query_all: \"#x\"\n    destination: deps\nignore: []\n",
        )
        .unwrap();
        let (mut dependent, _) = repo.commit(Job::new(&dependent_work)).unwrap();

        let deps = dependent.dependencies().unwrap();
        assert_eq!(deps.len(), 2);
        let destinations: Vec<PathBuf> = deps.iter().map(|d| d.destination().to_path_buf()).collect();
        for id in &seed_ids {
            assert!(destinations.contains(&PathBuf::from("deps").join(id)));
        }
    }

    #[test]
    fn commit_with_unresolvable_query_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        write_job(&work, "run.py", "x");
        fs::write(
            work.join("r3.yaml"),
            "dependencies:\n  - query: \"#nope\"\n    destination: prev\nignore: []\n",
        )
        .unwrap();

        assert!(matches!(
            repo.commit(Job::new(&work)),
            Err(Error::Unresolvable(_))
        ));
    }

    #[test]
    fn remove_blocked_by_dependents_then_succeeds_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let base_work = dir.path().join("base");
        fs::create_dir_all(&base_work).unwrap();
        write_job(&base_work, "run.py", "a");
        fs::write(base_work.join("metadata.yaml"), "tags: [\"base\"]\n").unwrap();
        let (base, _) = repo.commit(Job::new(&base_work)).unwrap();

        let dependent_work = dir.path().join("dependent");
        fs::create_dir_all(&dependent_work).unwrap();
        write_job(&dependent_work, "run.py", "b");
        fs::write(
            dependent_work.join("r3.yaml"),
            "dependencies:\n  - query: \"#base\"\n    destination: prev\nignore: []\n",
        )
        .unwrap();
        let (dependent, _) = repo.commit(Job::new(&dependent_work)).unwrap();

        let err = repo.remove(&base).unwrap_err();
        match err {
            Error::HasDependents { dependents, .. } => {
                assert_eq!(dependents, vec![dependent.id().unwrap().to_string()]);
            }
            other => panic!("expected HasDependents, got {other:?}"),
        }

        repo.remove(&dependent).unwrap();
        repo.remove(&base).unwrap();
        assert!(repo.find(&[], false).unwrap().is_empty());
    }

    #[test]
    fn rebuild_index_recovers_from_corrupt_index_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path().join("repo")).unwrap();

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        write_job(&work, "run.py", "a");
        repo.commit(Job::new(&work)).unwrap();

        fs::write(repo.root().join("index.yaml"), "not: valid: yaml: [").unwrap();
        // A fresh facade picks up the corrupt file lazily; rebuilding
        // replaces it with a correct reconstruction from `jobs/`.
        let mut reopened = Repository::open(repo.root()).unwrap();
        reopened.rebuild_index().unwrap();
        assert_eq!(reopened.find(&[], false).unwrap().len(), 1);
    }
}
