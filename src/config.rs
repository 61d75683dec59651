// Runtime settings - where data lives, how expensive password hashing is,
// and which categories are accepted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use argon2::Params;
use serde::{Deserialize, Serialize};

use crate::domain::{CategoryPolicy, PasswordHasher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database: PathBuf,
    pub hashing: HashingSettings,
    pub categories: CategoryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("pocketbook.db"),
            hashing: HashingSettings::default(),
            categories: CategoryPolicy::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingSettings {
    pub fn hasher(&self) -> Result<PasswordHasher> {
        PasswordHasher::new(self.memory_kib, self.iterations, self.parallelism).map_err(|e| {
            anyhow::anyhow!(
                "invalid hashing cost (memory {} KiB, {} iterations, parallelism {}): {}",
                self.memory_kib,
                self.iterations,
                self.parallelism,
                e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database, PathBuf::from("pocketbook.db"));
        assert!(settings.hashing.hasher().is_ok());
        assert!(settings.categories.accepts("food"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "database": "/tmp/ledger.db", "categories": { "mode": "free_text" } }"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.database, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(settings.categories, CategoryPolicy::FreeText);
        assert_eq!(settings.hashing, HashingSettings::default());
    }

    #[test]
    fn test_invalid_hashing_cost() {
        let hashing = HashingSettings {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(hashing.hasher().is_err());
    }
}
