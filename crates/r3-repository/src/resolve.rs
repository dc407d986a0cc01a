//! Query parsing and dependency resolution (§4.7 "Query resolution rules").

use r3_model::{Dependency, JobDependency, QueryAllDependency, QueryDependency};

use crate::{Error, Repository};

/// Split a query string on ASCII spaces into its tag set. Every token must
/// start with `#`; a blank query or any token missing the `#` prefix is
/// `InvalidQuery`.
pub(crate) fn parse_query(query: &str) -> Result<Vec<String>, Error> {
    let tokens: Vec<&str> = query.split(' ').filter(|s| !s.is_empty()).collect();
    if tokens.is_empty() {
        return Err(Error::InvalidQuery(query.to_string()));
    }
    tokens
        .into_iter()
        .map(|token| {
            token
                .strip_prefix('#')
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidQuery(query.to_string()))
        })
        .collect()
}

impl Repository {
    /// Resolve a single dependency into zero or more `JobDependency`
    /// values. `Job`/`Git` dependencies resolve to themselves, unchanged.
    pub(crate) fn resolve_dependency(&mut self, dep: &Dependency) -> Result<Vec<Dependency>, Error> {
        match dep {
            Dependency::Job(_) | Dependency::Git(_) => Ok(vec![dep.clone()]),
            Dependency::Query(q) => Ok(vec![Dependency::Job(self.resolve_query(q)?)]),
            Dependency::QueryAll(qa) => Ok(self
                .resolve_query_all(qa)?
                .into_iter()
                .map(Dependency::Job)
                .collect()),
        }
    }

    /// `QueryDep` resolves to the single latest matching job (§4.7).
    fn resolve_query(&mut self, dep: &QueryDependency) -> Result<JobDependency, Error> {
        let tags = parse_query(&dep.query)?;
        let matches = self.index.find(&tags, true)?;
        let job = matches
            .into_iter()
            .next()
            .ok_or_else(|| Error::Unresolvable(dep.query.clone()))?;
        Ok(JobDependency {
            job,
            source: dep.source.clone(),
            destination: dep.destination.clone(),
            query: Some(dep.query.clone()),
            query_all: None,
        })
    }

    /// `QueryAllDep` resolves to one `JobDependency` per matching job,
    /// ordered ascending by commit datetime (§4.7, §8 property 6). Each
    /// result's destination is suffixed with `/<job_id>` to disambiguate
    /// multiple matches landing under one destination — applied even when
    /// only one job matches (§8 boundary case).
    fn resolve_query_all(&mut self, dep: &QueryAllDependency) -> Result<Vec<JobDependency>, Error> {
        let tags = parse_query(&dep.query_all)?;
        let matches = self.index.find(&tags, false)?;
        if matches.is_empty() {
            return Err(Error::Unresolvable(dep.query_all.clone()));
        }
        Ok(matches
            .into_iter()
            .map(|job| JobDependency {
                destination: dep.destination.join(&job),
                job,
                source: ".".to_string(),
                query: None,
                query_all: Some(dep.query_all.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_splits_and_strips_hashes() {
        assert_eq!(
            parse_query("#foo #bar").unwrap(),
            vec!["foo".to_string(), "bar".to_string()]
        );
    }

    #[test]
    fn parse_query_rejects_blank() {
        assert!(matches!(parse_query(""), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn parse_query_rejects_token_without_hash() {
        assert!(matches!(parse_query("#foo bar"), Err(Error::InvalidQuery(_))));
    }
}
