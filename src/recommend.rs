//! pip configuration commands for a chosen mirror.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ResolveError;
use crate::models::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commands {
    /// One-off install against the mirror
    pub temp: String,
    /// Persist the mirror as pip's global index
    pub global: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub source: Endpoint,
    pub commands: Commands,
}

/// Looks mirrors up in the static endpoint list. No I/O.
#[derive(Debug, Clone)]
pub struct Recommender {
    endpoints: Arc<[Endpoint]>,
}

impl Recommender {
    pub fn new(endpoints: Arc<[Endpoint]>) -> Self {
        Self { endpoints }
    }

    /// Exact, case-sensitive match on name or url; the first configured match wins.
    pub fn resolve(&self, identifier: &str) -> Result<Recommendation, ResolveError> {
        if identifier.is_empty() {
            return Err(ResolveError::MissingIdentifier);
        }

        let source = self
            .endpoints
            .iter()
            .find(|ep| ep.name == identifier || ep.url == identifier)
            .ok_or_else(|| ResolveError::NotFound(identifier.to_string()))?;

        Ok(Recommendation {
            commands: commands_for(&source.url),
            source: source.clone(),
        })
    }
}

pub fn commands_for(url: &str) -> Commands {
    Commands {
        temp: format!("pip install <package> -i {}", url),
        global: format!("pip config set global.index-url {}", url),
    }
}
