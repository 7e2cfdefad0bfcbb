use crate::error::{EngineError, Result};

/// Runtime settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// Number of students fetched per page during cohort recalculation.
    pub page_size: u32,
}

impl Config {
    pub fn new(database_url: String, max_connections: u32, page_size: u32) -> Result<Self> {
        if database_url.trim().is_empty() {
            return Err(EngineError::Configuration(
                "DATABASE_URL must not be empty".to_string(),
            ));
        }
        if max_connections == 0 {
            return Err(EngineError::Configuration(
                "max connections must be at least 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(EngineError::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
            page_size,
        })
    }
}
