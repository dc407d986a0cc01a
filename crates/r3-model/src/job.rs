use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use r3_hash::{find_files, hash_file, hash_str};

use crate::dependency::Dependency;
use crate::ModelError;

pub const MANIFEST_FILE: &str = "r3.yaml";
pub const METADATA_FILE: &str = "metadata.yaml";
pub const OUTPUT_DIR: &str = "output";

/// The job manifest (`r3.yaml`): dependencies, ignore patterns, and
/// (once committed) the per-file content hashes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobConfig {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// The job metadata file (`metadata.yaml`): tags, commit timestamp, and any
/// other free-form entries, preserved verbatim across round trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The result of resolving a job's `datetime`: either the committed
/// timestamp, or a directory-ctime fallback carrying a warning (§4.4, §7).
pub struct Datetime {
    pub value: String,
    pub warning: Option<String>,
}

/// In-memory representation of a job (§3.3). State is read from disk lazily
/// and cached; `root` may be an uncommitted working directory or a
/// committed job directory under `jobs/<id>/`.
pub struct Job {
    root: PathBuf,
    id: Option<String>,
    config: Option<JobConfig>,
    metadata: Option<Metadata>,
    files: Option<BTreeMap<PathBuf, PathBuf>>,
}

impl Job {
    /// An uncommitted job rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            id: None,
            config: None,
            metadata: None,
            files: None,
        }
    }

    /// A job known to be committed under `id`.
    pub fn with_id(root: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            id: Some(id.into()),
            config: None,
            metadata: None,
            files: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// A job is resolved iff every dependency it carries is resolved.
    pub fn is_resolved(&mut self) -> Result<bool, ModelError> {
        Ok(self.config()?.dependencies.iter().all(Dependency::is_resolved))
    }

    pub fn config(&mut self) -> Result<&JobConfig, ModelError> {
        if self.config.is_none() {
            self.load_config()?;
        }
        Ok(self.config.as_ref().expect("just loaded"))
    }

    pub fn config_mut(&mut self) -> Result<&mut JobConfig, ModelError> {
        if self.config.is_none() {
            self.load_config()?;
        }
        Ok(self.config.as_mut().expect("just loaded"))
    }

    /// Replace the dependency list, e.g. after query resolution (§4.7).
    pub fn set_dependencies(&mut self, dependencies: Vec<Dependency>) -> Result<(), ModelError> {
        self.config_mut()?.dependencies = dependencies;
        Ok(())
    }

    fn load_config(&mut self) -> Result<(), ModelError> {
        let path = self.root.join(MANIFEST_FILE);
        let config = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)?
        } else {
            JobConfig::default()
        };
        self.config = Some(config);
        Ok(())
    }

    pub fn metadata(&mut self) -> Result<&Metadata, ModelError> {
        if self.metadata.is_none() {
            self.load_metadata()?;
        }
        Ok(self.metadata.as_ref().expect("just loaded"))
    }

    pub fn metadata_mut(&mut self) -> Result<&mut Metadata, ModelError> {
        if self.metadata.is_none() {
            self.load_metadata()?;
        }
        Ok(self.metadata.as_mut().expect("just loaded"))
    }

    fn load_metadata(&mut self) -> Result<(), ModelError> {
        let path = self.root.join(METADATA_FILE);
        let metadata = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)?
        } else {
            Metadata::default()
        };
        self.metadata = Some(metadata);
        Ok(())
    }

    /// `destination → absolute source path` for every file under `root`
    /// that belongs to this job, excluding ignored entries and every
    /// dependency's own destination (§4.4).
    pub fn files(&mut self) -> Result<&BTreeMap<PathBuf, PathBuf>, ModelError> {
        if self.files.is_none() {
            let ignore = self.config()?.ignore.clone();
            let dependency_destinations: Vec<String> = self
                .config()?
                .dependencies
                .iter()
                .map(|d| format!("/{}", d.destination().display()))
                .collect();
            let mut patterns = ignore;
            patterns.extend(dependency_destinations);

            let relative = find_files(&self.root, &patterns)?;
            let mut files = BTreeMap::new();
            for rel in relative {
                let abs = self.root.join(&rel);
                files.insert(rel, abs);
            }
            self.files = Some(files);
        }
        Ok(self.files.as_ref().expect("just computed"))
    }

    pub fn dependencies(&mut self) -> Result<&[Dependency], ModelError> {
        Ok(&self.config()?.dependencies)
    }

    /// Compute (or, if cached and `recompute` is false, return) the job
    /// hash, storing every per-entry hash plus the `"."` root entry into
    /// `config.hashes` (§4.4).
    pub fn hash(&mut self, recompute: bool) -> Result<String, ModelError> {
        if !recompute {
            if let Some(cached) = self.config()?.hashes.get(".") {
                return Ok(cached.clone());
            }
        }

        let files: Vec<(PathBuf, PathBuf)> = self
            .files()?
            .iter()
            .filter(|(dest, _)| {
                dest.as_os_str() != MANIFEST_FILE && dest.as_os_str() != METADATA_FILE
            })
            .map(|(dest, src)| (dest.clone(), src.clone()))
            .collect();

        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        for (dest, src) in &files {
            let hash = hash_file(src)?;
            entries.insert(dest.to_string_lossy().into_owned(), hash);
        }
        for dep in &self.config()?.dependencies {
            entries.insert(dep.destination().to_string_lossy().into_owned(), dep.hash()?);
        }

        let index = entries
            .iter()
            .map(|(path, hash)| format!("{path} {hash}\n"))
            .collect::<Vec<_>>()
            .concat();
        // Drop the trailing newline the "\n".join(...) form of the source
        // never had: we built with a trailing separator per line instead
        // of joining, so strip it back off to match exactly.
        let index = index.strip_suffix('\n').unwrap_or(&index).to_string();
        let job_hash = hash_str(&index);

        entries.insert(".".to_string(), job_hash.clone());
        self.config_mut()?.hashes = entries;
        Ok(job_hash)
    }

    /// The job's commit timestamp, falling back to the directory's creation
    /// time (with a warning) if `committed_at` was never set (§4.4, §7).
    pub fn datetime(&mut self) -> Result<Datetime, ModelError> {
        if let Some(committed_at) = self.metadata()?.committed_at.clone() {
            return Ok(Datetime {
                value: committed_at,
                warning: None,
            });
        }

        let created = fs::metadata(&self.root)
            .and_then(|m| m.created().or_else(|_| m.modified()))
            .map_err(ModelError::Io)?;
        Ok(Datetime {
            value: format_system_time(created),
            warning: Some(format!(
                "job at {} has no committed_at; using directory creation time",
                self.root.display()
            )),
        })
    }
}

/// Format a `SystemTime` as `"YYYY-MM-DD HH:MM:SS"` (UTC) without pulling in
/// a date/time crate. Used both for the directory-ctime fallback here and by
/// the repository façade to stamp `committed_at` at commit time.
pub fn format_system_time(time: std::time::SystemTime) -> String {
    let secs = time
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    civil_from_unix(secs as i64)
}

/// Days-from-civil algorithm (Howard Hinnant's public-domain `civil_from_days`),
/// used to format the ctime fallback without a date/time dependency.
fn civil_from_unix(unix_secs: i64) -> String {
    let days = unix_secs.div_euclid(86_400);
    let secs_of_day = unix_secs.rem_euclid(86_400);
    let (h, m, s) = (secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60);

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m_num = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m_num <= 2 { y + 1 } else { y };

    format!("{y:04}-{m_num:02}-{d:02} {h:02}:{m:02}:{s:02}")
}
