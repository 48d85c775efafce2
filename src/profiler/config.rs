use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::history::record::RecordFilter;
use crate::parser::dialect::DialectKind;

/// Settings of a profiling run, loadable from a JSON file.
///
/// Every field is optional in the file:
///
/// ```json
/// { "dialect": "snowflake", "statuses": ["FINISHED"], "statement_types": ["SELECT"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Dialect the query texts are parsed with.
    pub dialect: DialectKind,
    /// Which records are ingested and summarized.
    #[serde(flatten)]
    pub filter: RecordFilter,
}

impl ProfileConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ProfileError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which nothing could ever be profiled.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.filter.statuses.is_empty() {
            return Err(ProfileError::Config(
                "at least one query status must be profiled".to_string(),
            ));
        }
        if self
            .filter
            .statement_types
            .iter()
            .all(|kind| kind.trim().is_empty())
        {
            return Err(ProfileError::Config(
                "at least one statement type must be profiled".to_string(),
            ));
        }
        Ok(())
    }
}
