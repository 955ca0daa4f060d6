// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の構造、検証、
// 環境別のデータベース接続設定とコンテキスト定義の管理を行います。

use crate::core::error::ConfigError;
use crate::core::naming;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// 履歴テーブル識別子として許可する形式（`table` または `schema.table`）
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

/// SQL識別子として安全に埋め込めるかどうか
pub fn is_safe_identifier(name: &str) -> bool {
    Regex::new(IDENTIFIER_PATTERN)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

/// SSL接続モード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    Disable,
    #[serde(rename = "prefer")]
    Prefer,
    Require,
    #[serde(rename = "verify-ca")]
    VerifyCa,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
            SslMode::VerifyCa => write!(f, "verify-ca"),
            SslMode::VerifyFull => write!(f, "verify-full"),
        }
    }
}

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl Dialect {
    /// Dialectに応じたデフォルトポートを返す
    ///
    /// - PostgreSQL: 5432
    /// - MySQL: 3306
    /// - SQLite: None（ファイルベースのためポート不要）
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::PostgreSQL => Some(5432),
            Dialect::MySQL => Some(3306),
            Dialect::SQLite => None,
        }
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// データベース方言
    pub dialect: Dialect,

    /// スクリプト内で拒否するバッチ区切りトークン
    #[serde(default = "default_batch_separator")]
    pub batch_separator: String,

    /// マイグレーション履歴テーブルの設定
    #[serde(default)]
    pub history: HistoryTableConfig,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,

    /// コンテキスト定義（論理名 → マイグレーション系列と接続先）
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextConfig>,
}

fn default_batch_separator() -> String {
    naming::DEFAULT_BATCH_SEPARATOR.to_string()
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = naming::CONFIG_FILE;

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig, ConfigError> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            let mut available: Vec<String> = self.environments.keys().cloned().collect();
            available.sort();
            ConfigError::EnvironmentNotFound {
                name: environment.to_string(),
                available,
            }
        })
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        // バージョンチェック
        if self.version.is_empty() {
            return Err(ConfigError::MissingVersion);
        }

        // 環境設定チェック
        if self.environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }

        // コンテキスト定義チェック
        if self.contexts.is_empty() {
            return Err(ConfigError::NoContexts);
        }

        if self.batch_separator.trim().is_empty() {
            return Err(ConfigError::EmptyBatchSeparator);
        }

        self.history.validate()?;

        // 各環境のデータベース設定を検証
        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .map_err(|source| ConfigError::InvalidEnvironment {
                    environment: env_name.clone(),
                    source: Box::new(source),
                })?;
        }

        // 各コンテキストの定義を検証
        for (name, context) in &self.contexts {
            context
                .validate(name, &self.environments)
                .map_err(|reason| ConfigError::InvalidContext {
                    context: name.clone(),
                    reason,
                })?;
        }

        Ok(())
    }
}

/// マイグレーション履歴テーブル設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTableConfig {
    /// テーブル名（`schema.table` 形式も可）
    #[serde(default = "default_history_table")]
    pub table: String,

    /// マイグレーションIDを保持するカラム名
    #[serde(default = "default_history_column")]
    pub column: String,
}

fn default_history_table() -> String {
    naming::DEFAULT_HISTORY_TABLE.to_string()
}

fn default_history_column() -> String {
    naming::DEFAULT_HISTORY_COLUMN.to_string()
}

impl Default for HistoryTableConfig {
    fn default() -> Self {
        Self {
            table: default_history_table(),
            column: default_history_column(),
        }
    }
}

impl HistoryTableConfig {
    /// 識別子がSQLに埋め込める形式か検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.table, &self.column] {
            if !is_safe_identifier(name) {
                return Err(ConfigError::InvalidHistoryIdentifier { name: name.clone() });
            }
        }
        // カラム名はスキーマ修飾を許可しない
        if self.column.contains('.') {
            return Err(ConfigError::InvalidHistoryIdentifier {
                name: self.column.clone(),
            });
        }
        Ok(())
    }
}

/// コンテキスト定義
///
/// `migrations_dir` と `migrations` のどちらか一方でマイグレーション系列を与えます。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    /// 完全修飾名（名前解決時に短縮名と同様に照合される）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,

    /// マイグレーションディレクトリ（プロジェクトルートからの相対パス）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_dir: Option<PathBuf>,

    /// マイグレーションIDの明示的な列挙
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations: Option<Vec<String>>,

    /// 接続先環境（未指定の場合はコマンドの --env を使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ContextConfig {
    /// コンテキスト定義を検証し、不正な場合はその理由を返す
    fn validate(
        &self,
        name: &str,
        environments: &HashMap<String, DatabaseConfig>,
    ) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("context name must not be empty".to_string());
        }

        match (&self.migrations_dir, &self.migrations) {
            (Some(_), Some(_)) => {
                return Err("specify either 'migrations_dir' or 'migrations', not both".to_string())
            }
            (None, None) => {
                return Err("one of 'migrations_dir' or 'migrations' is required".to_string())
            }
            _ => {}
        }

        if let Some(env) = &self.environment {
            if !environments.contains_key(env) {
                return Err(format!("environment '{}' is not defined", env));
            }
        }

        Ok(())
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host", skip_serializing_if = "String::is_empty")]
    pub host: String,

    /// ポート番号（Noneの場合はDialectのデフォルトポートを使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// データベース名（SQLiteの場合はファイルパス）
    pub database: String,

    /// ユーザー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// パスワード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// SSL接続モード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<SslMode>,

    /// 最大コネクション数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            database: String::new(),
            user: None,
            password: None,
            timeout: None,
            ssl_mode: None,
            max_connections: None,
        }
    }
}

impl DatabaseConfig {
    /// Dialectに応じた解決済みポート番号を取得
    ///
    /// portがSomeの場合はその値を返し、Noneの場合はDialectのデフォルトポートを返します。
    /// SQLiteなどデフォルトポートがないDialectの場合は0を返します。
    pub fn resolved_port(&self, dialect: Dialect) -> u16 {
        self.port
            .unwrap_or_else(|| dialect.default_port().unwrap_or(0))
    }

    /// Validate database configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.is_empty() {
            return Err(ConfigError::MissingDatabaseName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let mut environments = HashMap::new();
        environments.insert(
            "development".to_string(),
            DatabaseConfig {
                database: "app.db".to_string(),
                ..Default::default()
            },
        );

        let mut contexts = BTreeMap::new();
        contexts.insert(
            "AppDbContext".to_string(),
            ContextConfig {
                migrations: Some(vec!["20260101000000_Init".to_string()]),
                ..Default::default()
            },
        );

        Config {
            version: "1.0".to_string(),
            dialect: Dialect::SQLite,
            batch_separator: "GO".to_string(),
            history: HistoryTableConfig::default(),
            environments,
            contexts,
        }
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::PostgreSQL.to_string(), "postgresql");
        assert_eq!(Dialect::MySQL.to_string(), "mysql");
        assert_eq!(Dialect::SQLite.to_string(), "sqlite");
    }

    #[test]
    fn test_dialect_default_port() {
        assert_eq!(Dialect::PostgreSQL.default_port(), Some(5432));
        assert_eq!(Dialect::MySQL.default_port(), Some(3306));
        assert_eq!(Dialect::SQLite.default_port(), None);
    }

    #[test]
    fn test_resolved_port_without_explicit_port() {
        let config = DatabaseConfig {
            database: "test".to_string(),
            ..Default::default()
        };

        // Noneの場合はDialectのデフォルトポートを返す
        assert_eq!(config.resolved_port(Dialect::PostgreSQL), 5432);
        assert_eq!(config.resolved_port(Dialect::MySQL), 3306);
        assert_eq!(config.resolved_port(Dialect::SQLite), 0);
    }

    #[test]
    fn test_resolved_port_with_explicit_port() {
        let config = DatabaseConfig {
            port: Some(5433),
            database: "test".to_string(),
            ..Default::default()
        };

        assert_eq!(config.resolved_port(Dialect::PostgreSQL), 5433);
    }

    #[test]
    fn test_validate_sample_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_contexts() {
        let mut config = sample_config();
        config.contexts.clear();

        assert!(matches!(config.validate(), Err(ConfigError::NoContexts)));
    }

    #[test]
    fn test_validate_rejects_context_with_both_sources() {
        let mut config = sample_config();
        if let Some(context) = config.contexts.get_mut("AppDbContext") {
            context.migrations_dir = Some(PathBuf::from("migrations"));
        }

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidContext { .. }));
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_validate_rejects_unknown_context_environment() {
        let mut config = sample_config();
        if let Some(context) = config.contexts.get_mut("AppDbContext") {
            context.environment = Some("production".to_string());
        }

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn test_validate_rejects_unsafe_history_table() {
        let mut config = sample_config();
        config.history.table = "schema_migrations; DROP TABLE users".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHistoryIdentifier { .. })
        ));
    }

    #[test]
    fn test_is_safe_identifier() {
        assert!(is_safe_identifier("schema_migrations"));
        assert!(is_safe_identifier("dbo.__EFMigrationsHistory"));
        assert!(!is_safe_identifier("1table"));
        assert!(!is_safe_identifier("a.b.c"));
        assert!(!is_safe_identifier("name'--"));
        assert!(!is_safe_identifier(""));
    }

    #[test]
    fn test_get_database_config_lists_available_environments() {
        let config = sample_config();
        let err = config.get_database_config("staging").unwrap_err();

        assert!(err.to_string().contains("staging"));
        assert!(err.to_string().contains("development"));
    }

    #[test]
    fn test_history_defaults_when_omitted() {
        let yaml = r#"
version: "1.0"
dialect: sqlite
environments:
  development:
    database: app.db
contexts:
  AppDbContext:
    migrations: ["20260101000000_Init"]
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();

        assert_eq!(config.history, HistoryTableConfig::default());
        assert_eq!(config.batch_separator, "GO");
        assert!(config.validate().is_ok());
    }
}
