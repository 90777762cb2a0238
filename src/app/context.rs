use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{DynlensError, Result};
use crate::config::Config;
use crate::store::SqliteStore;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        Ok(Self {
            store: Arc::new(SqliteStore::new(&db_path)?),
            config,
        })
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Ok(Self {
            store: Arc::new(SqliteStore::in_memory()?),
            config,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| DynlensError::Config("Could not find data directory".into()))?;
        let dynlens_dir = data_dir.join("dynlens");
        std::fs::create_dir_all(&dynlens_dir)?;
        Ok(dynlens_dir.join("cache.db"))
    }
}
