use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use r3_hash::hash_str;

use crate::ModelError;

/// A reference from one job to another job, to a commit in a mirrored
/// source-control repository, or to a tag-based query over the repository.
///
/// The four kinds are a closed set known at compile time, so this is a
/// plain enum dispatched with `match` rather than a trait object — there's
/// no need for runtime polymorphism here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Job(JobDependency),
    Git(GitDependency),
    Query(QueryDependency),
    QueryAll(QueryAllDependency),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDependency {
    pub job: String,
    pub source: String,
    pub destination: PathBuf,
    /// Back-pointer to the query this was resolved from, if any.
    pub query: Option<String>,
    pub query_all: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDependency {
    pub repository: String,
    pub commit: String,
    pub source: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDependency {
    pub query: String,
    pub source: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAllDependency {
    pub query_all: String,
    pub destination: PathBuf,
}

impl Dependency {
    /// A dependency is resolved iff it carries a concrete reference
    /// (Job or Git) rather than a tag query still waiting to be matched.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Dependency::Job(_) | Dependency::Git(_))
    }

    pub fn destination(&self) -> &Path {
        match self {
            Dependency::Job(d) => &d.destination,
            Dependency::Git(d) => &d.destination,
            Dependency::Query(d) => &d.destination,
            Dependency::QueryAll(d) => &d.destination,
        }
    }

    /// Content hash of this dependency, as stored in a job's `hashes` map.
    /// Errors for the two unresolved variants — they must be resolved
    /// before a job can be hashed or committed.
    pub fn hash(&self) -> Result<String, ModelError> {
        match self {
            Dependency::Job(d) => Ok(hash_str(&format!("jobs/{}/{}", d.job, d.source))),
            Dependency::Git(d) => {
                let repository_path = repository_path(&d.repository)?;
                Ok(hash_str(&format!(
                    "{repository_path}@{}/{}",
                    d.commit, d.source
                )))
            }
            Dependency::Query(_) => Err(ModelError::HashUnresolved("query")),
            Dependency::QueryAll(_) => Err(ModelError::HashUnresolved("query_all")),
        }
    }
}

/// Derive the local mirror path for a GitHub repository URL (§6.3).
///
/// Both the HTTPS and SSH spellings of the same repository map to the same
/// `repository_path`, which is exactly why `GitDependency::hash` hashes
/// `repository_path` rather than the raw URL: two spellings of one repo
/// must hash identically.
pub fn repository_path(url: &str) -> Result<String, ModelError> {
    if let Some(rest) = url.strip_prefix("https://github.com/") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        if let Some((owner, name)) = rest.split_once('/') {
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') && !name.contains('.')
            {
                return Ok(format!("git/github.com/{owner}/{name}"));
            }
        }
    } else if let Some(rest) = url.strip_prefix("git@github.com:") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        if let Some((owner, name)) = rest.split_once('/') {
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') && !name.contains('.')
            {
                return Ok(format!("git/github.com/{owner}/{name}"));
            }
        }
    }
    Err(ModelError::UnrecognisedUrl(url.to_string()))
}

/// Flat, serde-derived mirror of a dependency's on-disk mapping shape
/// (§3.4, §6.2). The kind is disambiguated by precedence
/// (`job`, then `query`, then `query_all`, then `repository`) rather than
/// by requiring exactly one field to be present: a `JobDep` resolved from a
/// query carries both `job` and `query`/`query_all` as a back-pointer
/// (§4.3, §6.2).
#[derive(Debug, Serialize, Deserialize)]
struct RawDependency {
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_all: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    destination: PathBuf,
}

impl Serialize for Dependency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawDependency::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawDependency::deserialize(deserializer)?;
        Dependency::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl From<Dependency> for RawDependency {
    fn from(dep: Dependency) -> Self {
        match dep {
            Dependency::Job(d) => RawDependency {
                job: Some(d.job),
                repository: None,
                commit: None,
                query: d.query,
                query_all: d.query_all,
                source: Some(d.source),
                destination: d.destination,
            },
            Dependency::Git(d) => RawDependency {
                job: None,
                repository: Some(d.repository),
                commit: Some(d.commit),
                query: None,
                query_all: None,
                source: Some(d.source),
                destination: d.destination,
            },
            Dependency::Query(d) => RawDependency {
                job: None,
                repository: None,
                commit: None,
                query: Some(d.query),
                query_all: None,
                source: Some(d.source),
                destination: d.destination,
            },
            Dependency::QueryAll(d) => RawDependency {
                job: None,
                repository: None,
                commit: None,
                query: None,
                query_all: Some(d.query_all),
                source: None,
                destination: d.destination,
            },
        }
    }
}

impl TryFrom<RawDependency> for Dependency {
    type Error = ModelError;

    fn try_from(raw: RawDependency) -> Result<Self, Self::Error> {
        // Precedence, not exclusivity: `job` wins over `query`/`query_all`
        // because a query-resolved JobDep stores both, the back-pointer
        // alongside the concrete id it resolved to.
        if let Some(job) = raw.job {
            return Ok(Dependency::Job(JobDependency {
                job,
                // Preserved for backward compatibility: a JobDep with no
                // explicit source refers to the whole job root.
                source: raw.source.unwrap_or_default(),
                destination: raw.destination,
                query: raw.query,
                query_all: raw.query_all,
            }));
        }
        if let Some(query) = raw.query {
            return Ok(Dependency::Query(QueryDependency {
                query,
                source: raw.source.unwrap_or_else(|| ".".to_string()),
                destination: raw.destination,
            }));
        }
        if let Some(query_all) = raw.query_all {
            return Ok(Dependency::QueryAll(QueryAllDependency {
                query_all,
                destination: raw.destination,
            }));
        }
        if let Some(repository) = raw.repository {
            let commit = raw.commit.ok_or_else(|| {
                ModelError::InvalidDependencyKind("repository without commit".to_string())
            })?;
            return Ok(Dependency::Git(GitDependency {
                repository,
                commit,
                source: raw.source.unwrap_or_default(),
                destination: raw.destination,
            }));
        }
        Err(ModelError::InvalidDependencyKind(
            "none of job/repository/query/query_all present".to_string(),
        ))
    }
}
