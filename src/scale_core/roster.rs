//! Cat roster loading from a JSON snapshot file

use super::types::Cat;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum RosterError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        RosterError::Io(err)
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::Parse(err)
    }
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::Io(e) => write!(f, "Roster IO error: {}", e),
            RosterError::Parse(e) => write!(f, "Roster parse error: {}", e),
        }
    }
}

impl std::error::Error for RosterError {}

/// Read `[{"id", "name", "weights": [{"timestamp", "weight"}]}]`
pub fn load_roster(path: &Path) -> Result<Vec<Cat>, RosterError> {
    let content = std::fs::read_to_string(path)?;
    parse_roster(&content)
}

async fn load_roster_async(path: &Path) -> Result<Vec<Cat>, RosterError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_roster(&content)
}

fn parse_roster(content: &str) -> Result<Vec<Cat>, RosterError> {
    let cats: Vec<Cat> = serde_json::from_str(content)?;
    Ok(cats)
}

/// Immutable roster handed to each classification, optionally backed by a file.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    path: Option<PathBuf>,
    cats: Arc<Vec<Cat>>,
}

impl RosterSnapshot {
    pub fn from_cats(cats: Vec<Cat>) -> Self {
        Self {
            path: None,
            cats: Arc::new(cats),
        }
    }

    pub fn from_file(path: PathBuf) -> Result<Self, RosterError> {
        let cats = load_roster(&path)?;
        log::info!("🐈 Loaded {} cats from {}", cats.len(), path.display());
        Ok(Self {
            path: Some(path),
            cats: Arc::new(cats),
        })
    }

    pub fn cats(&self) -> Arc<Vec<Cat>> {
        Arc::clone(&self.cats)
    }

    /// Re-read the backing file. A failed read keeps the previous snapshot.
    pub async fn reload(&mut self) {
        let Some(path) = &self.path else {
            return;
        };

        match load_roster_async(path).await {
            Ok(cats) => {
                if cats != *self.cats {
                    log::info!("🐈 Roster changed, {} cats", cats.len());
                }
                self.cats = Arc::new(cats);
            }
            Err(e) => log::warn!("Keeping previous roster, reload failed: {}", e),
        }
    }
}
