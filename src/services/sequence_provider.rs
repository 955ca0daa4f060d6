// マイグレーション系列プロバイダー
//
// コンテキストごとの「期待されるマイグレーション系列」を提供する。
// 系列は構築時に序数順へ正規化し、以後は不変として扱う。

use crate::core::migration::{normalize_sequence, MigrationId};
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// マイグレーションIDの先頭に付くタイムスタンプの桁数
const TIMESTAMP_LENGTH: usize = 14;

/// 期待されるマイグレーション系列の提供元
pub trait MigrationSequenceProvider: Send + Sync + Debug {
    /// コンテキストの短縮名
    fn name(&self) -> &str;

    /// コンテキストの完全修飾名
    fn qualified_name(&self) -> &str;

    /// 序数順に並んだ期待系列
    fn expected_sequence(&self) -> &[MigrationId];
}

/// 固定リストから構築するプロバイダー
#[derive(Debug, Clone)]
pub struct StaticSequenceProvider {
    name: String,
    qualified_name: String,
    sequence: Vec<MigrationId>,
}

impl StaticSequenceProvider {
    pub fn new<I>(name: &str, qualified_name: &str, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MigrationId>,
    {
        Self {
            name: name.to_string(),
            qualified_name: qualified_name.to_string(),
            sequence: normalize_sequence(ids.into_iter().map(Into::into)),
        }
    }
}

impl MigrationSequenceProvider for StaticSequenceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    fn expected_sequence(&self) -> &[MigrationId] {
        &self.sequence
    }
}

/// マイグレーションディレクトリから構築するプロバイダー
///
/// `{14桁タイムスタンプ}_{説明}` 形式のディレクトリ、または同形式の `.sql` ファイルを
/// 1件のマイグレーションとして扱う。IDは拡張子を除いた名前全体。
#[derive(Debug, Clone)]
pub struct DirectorySequenceProvider {
    inner: StaticSequenceProvider,
}

impl DirectorySequenceProvider {
    /// ディレクトリを走査して期待系列を読み込む
    pub fn load(name: &str, qualified_name: &str, migrations_dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(migrations_dir).with_context(|| {
            format!("Failed to read migrations directory: {:?}", migrations_dir)
        })?;

        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("Invalid migration entry name: {:?}", path))?;

            // 隠しファイル（.meta.yaml など）は対象外
            if file_name.starts_with('.') {
                continue;
            }

            let candidate = if path.is_dir() {
                file_name
            } else if let Some(stem) = file_name.strip_suffix(".sql") {
                stem
            } else {
                continue;
            };

            if !is_migration_name(candidate) {
                warn!(
                    "Skipping entry not named as a migration in {:?}: {}",
                    migrations_dir, file_name
                );
                continue;
            }

            if !seen.insert(candidate.to_string()) {
                return Err(anyhow!(
                    "Duplicate migration id '{}' in {:?}",
                    candidate,
                    migrations_dir
                ));
            }

            ids.push(MigrationId::from(candidate));
        }

        debug!(
            "Loaded {} migrations for context '{}' from {:?}",
            ids.len(),
            name,
            migrations_dir
        );

        Ok(Self {
            inner: StaticSequenceProvider::new(name, qualified_name, ids),
        })
    }
}

impl MigrationSequenceProvider for DirectorySequenceProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn qualified_name(&self) -> &str {
        self.inner.qualified_name()
    }

    fn expected_sequence(&self) -> &[MigrationId] {
        self.inner.expected_sequence()
    }
}

/// `{14桁の数字}_{1文字以上の説明}` 形式か
fn is_migration_name(name: &str) -> bool {
    match name.split_once('_') {
        Some((timestamp, description)) => {
            timestamp.len() == TIMESTAMP_LENGTH
                && timestamp.chars().all(|c| c.is_ascii_digit())
                && !description.is_empty()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_static_provider_normalizes_sequence() {
        let provider = StaticSequenceProvider::new(
            "AppDbContext",
            "MyApp.Data.AppDbContext",
            ["20260103000000_c", "20260101000000_a", "20260103000000_c"],
        );

        assert_eq!(provider.name(), "AppDbContext");
        assert_eq!(provider.qualified_name(), "MyApp.Data.AppDbContext");
        assert_eq!(
            provider.expected_sequence(),
            &[
                MigrationId::from("20260101000000_a"),
                MigrationId::from("20260103000000_c"),
            ]
        );
    }

    #[test]
    fn test_directory_provider_reads_dirs_and_sql_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("20260101000000_init")).unwrap();
        fs::write(temp_dir.path().join("20260102000000_add_users.sql"), "SELECT 1;").unwrap();
        fs::write(temp_dir.path().join("README.md"), "docs").unwrap();
        fs::write(temp_dir.path().join(".meta.yaml"), "x: 1").unwrap();
        fs::create_dir(temp_dir.path().join("drafts")).unwrap();

        let provider =
            DirectorySequenceProvider::load("AppDbContext", "AppDbContext", temp_dir.path())
                .unwrap();

        assert_eq!(
            provider.expected_sequence(),
            &[
                MigrationId::from("20260101000000_init"),
                MigrationId::from("20260102000000_add_users"),
            ]
        );
    }

    #[test]
    fn test_directory_provider_rejects_duplicate_ids() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("20260101000000_init")).unwrap();
        fs::write(temp_dir.path().join("20260101000000_init.sql"), "SELECT 1;").unwrap();

        let result =
            DirectorySequenceProvider::load("AppDbContext", "AppDbContext", temp_dir.path());

        assert!(result.unwrap_err().to_string().contains("Duplicate"));
    }

    #[test]
    fn test_directory_provider_missing_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = DirectorySequenceProvider::load(
            "AppDbContext",
            "AppDbContext",
            &temp_dir.path().join("missing"),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_is_migration_name() {
        assert!(is_migration_name("20260101000000_init"));
        assert!(is_migration_name("20260101000000_add_users_table"));
        assert!(!is_migration_name("2026010100000_short"));
        assert!(!is_migration_name("20260101000000_"));
        assert!(!is_migration_name("20260101000000"));
        assert!(!is_migration_name("v1_init"));
    }
}
