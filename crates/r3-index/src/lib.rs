//! The denormalised `index.yaml` sidecar: tags, commit datetime, and
//! dependency lists projected out of every committed job (C6, §4.6).

mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use r3_model::{Dependency, Job};
use r3_utils::tempfile::TempFile;

pub use error::IndexError;

const INDEX_FILE: &str = "index.yaml";

/// One job's projection: everything `find`/`find_dependents` need without
/// reopening the job directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// Handle onto a repository's `index.yaml`. Loaded lazily; every mutation
/// is followed by a full atomic rewrite.
pub struct Index {
    path: PathBuf,
    entries: Option<BTreeMap<String, Entry>>,
}

impl Index {
    /// An index handle rooted at `repository_root`. Nothing is read from
    /// disk until the first query or mutation.
    pub fn open(repository_root: impl AsRef<Path>) -> Self {
        Self {
            path: repository_root.as_ref().join(INDEX_FILE),
            entries: None,
        }
    }

    fn entries(&mut self) -> Result<&BTreeMap<String, Entry>, IndexError> {
        if self.entries.is_none() {
            self.load()?;
        }
        Ok(self.entries.as_ref().expect("just loaded"))
    }

    fn entries_mut(&mut self) -> Result<&mut BTreeMap<String, Entry>, IndexError> {
        if self.entries.is_none() {
            self.load()?;
        }
        Ok(self.entries.as_mut().expect("just loaded"))
    }

    fn load(&mut self) -> Result<(), IndexError> {
        let map = if self.path.is_file() {
            let text = fs::read_to_string(&self.path)?;
            serde_yaml::from_str(&text)?
        } else {
            BTreeMap::new()
        };
        self.entries = Some(map);
        Ok(())
    }

    fn persist(&mut self) -> Result<(), IndexError> {
        let entries = self.entries()?;
        let yaml = serde_yaml::to_string(entries)?;
        let mut tmp = TempFile::new_for(&self.path)?;
        std::io::Write::write_all(&mut tmp, yaml.as_bytes())?;
        tmp.persist(&self.path)?;
        Ok(())
    }

    /// Whether `job_id` has an index entry.
    pub fn contains(&mut self, job_id: &str) -> Result<bool, IndexError> {
        Ok(self.entries()?.contains_key(job_id))
    }

    /// Project `job` into the index and persist. `job` must already carry
    /// an id (i.e. be committed).
    pub fn add(&mut self, job: &mut Job) -> Result<(), IndexError> {
        let id = job
            .id()
            .ok_or_else(|| IndexError::Model(r3_model::ModelError::HashUnresolved("job id")))?
            .to_string();
        let entry = Entry {
            tags: job.metadata()?.tags.clone(),
            datetime: job.metadata()?.committed_at.clone(),
            dependencies: job.config()?.dependencies.clone(),
        };
        self.entries_mut()?.insert(id, entry);
        self.persist()
    }

    /// Drop `job_id`'s entry, if any, and persist.
    pub fn remove(&mut self, job_id: &str) -> Result<(), IndexError> {
        self.entries_mut()?.remove(job_id);
        self.persist()
    }

    /// Job ids whose tag set is a superset of `tags`, ascending by
    /// `datetime` (ties broken by job id). If `latest`, only the last
    /// match is returned (empty if there were none).
    pub fn find(&mut self, tags: &[String], latest: bool) -> Result<Vec<String>, IndexError> {
        let mut matches: Vec<(&String, &Entry)> = self
            .entries()?
            .iter()
            .filter(|(_, entry)| tags.iter().all(|t| entry.tags.contains(t)))
            .collect();
        matches.sort_by(|a, b| a.1.datetime.cmp(&b.1.datetime).then(a.0.cmp(b.0)));

        if latest {
            Ok(matches.last().map(|(id, _)| (*id).clone()).into_iter().collect())
        } else {
            Ok(matches.into_iter().map(|(id, _)| id.clone()).collect())
        }
    }

    /// Job ids that carry a `JobDependency` pointing at `job_id`.
    pub fn find_dependents(&mut self, job_id: &str) -> Result<Vec<String>, IndexError> {
        Ok(self
            .entries()?
            .iter()
            .filter(|(_, entry)| {
                entry.dependencies.iter().any(|dep| match dep {
                    Dependency::Job(d) => d.job == job_id,
                    _ => false,
                })
            })
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Recompute the whole index from scratch out of `jobs`, discarding any
    /// prior contents, then persist once.
    pub fn rebuild<'a>(
        &mut self,
        jobs: impl IntoIterator<Item = &'a mut Job>,
    ) -> Result<(), IndexError> {
        self.entries = Some(BTreeMap::new());
        for job in jobs {
            let id = job
                .id()
                .ok_or_else(|| IndexError::Model(r3_model::ModelError::HashUnresolved("job id")))?
                .to_string();
            let entry = Entry {
                tags: job.metadata()?.tags.clone(),
                datetime: job.metadata()?.committed_at.clone(),
                dependencies: job.config()?.dependencies.clone(),
            };
            self.entries.as_mut().expect("just reset").insert(id, entry);
        }
        self.persist()
    }
}
