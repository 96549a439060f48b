// Job catalog adapter - Job lookup against the configured job table

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::errors::LookupError;
use crate::ports::JobLookup;

/// In-memory job id to recording table
#[derive(Debug, Default, Clone)]
pub struct JobCatalog {
    jobs: HashMap<u64, String>,
}

impl JobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[jobs]` table of the configuration; non-numeric ids are skipped
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut catalog = Self::new();
        for (job, file) in entries {
            match job.parse::<u64>() {
                Ok(id) => catalog.insert(id, file.clone()),
                Err(_) => warn!("Ignoring job entry with non-numeric id '{}'", job),
            }
        }
        catalog
    }

    pub fn insert(&mut self, job_id: u64, file: impl Into<String>) {
        self.jobs.insert(job_id, file.into());
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobLookup for JobCatalog {
    async fn lookup(&self, job_id: u64) -> Result<String, LookupError> {
        match self.jobs.get(&job_id) {
            Some(file) => {
                debug!("Job {} resolves to {}", job_id, file);
                Ok(file.clone())
            }
            None => Err(LookupError::NotFound(job_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_lookup() {
        let mut table = BTreeMap::new();
        table.insert("7".to_string(), "/srv/rec/7.ts".to_string());
        table.insert("seven".to_string(), "/srv/rec/x.ts".to_string());

        let catalog = JobCatalog::from_entries(&table);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup(7).await.unwrap(), "/srv/rec/7.ts");
        assert_eq!(catalog.lookup(8).await, Err(LookupError::NotFound(8)));
    }
}
