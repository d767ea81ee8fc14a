// src/publish/ledger.rs
//! Append-only publication ledger. One entry per published article, unique
//! by item id, newest first, capped at the most recent 500 entries. Writes
//! are whole-file and atomic (tmp + rename); a missing or corrupt file
//! starts an empty ledger rather than failing the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const LEDGER_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub original_link: String,
    pub original_source: String,
    pub topic: String,
    pub generated_at: String,
    pub word_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    articles: Vec<LedgerEntry>,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    db: LedgerFile,
}

impl Ledger {
    /// Load the ledger at `path`. A missing file yields an empty ledger; a
    /// corrupt one is logged and replaced on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let db = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<LedgerFile>(&s) {
                Ok(db) => db,
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "corrupt ledger; starting empty");
                    LedgerFile::default()
                }
            },
            Err(_) => LedgerFile::default(),
        };
        Self { path, db }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.db.articles.iter().any(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.db.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.articles.is_empty()
    }

    /// Newest-first view of the ledger.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.db.articles
    }

    /// Record a newly published article. Refuses duplicates; the caller is
    /// expected to have checked [`Ledger::contains`] first, so a duplicate
    /// here is a bug upstream.
    pub fn record(&mut self, entry: LedgerEntry) -> Result<()> {
        if self.contains(&entry.id) {
            anyhow::bail!("ledger already contains id {}", entry.id);
        }
        self.db.articles.insert(0, entry);
        self.db.articles.truncate(LEDGER_CAP);
        self.save()
    }

    fn save(&mut self) -> Result<()> {
        self.db.last_updated = Some(chrono::Utc::now().to_rfc3339());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.db).context("serializing ledger")?;
        write_atomic(&self.path, json.as_bytes())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}
