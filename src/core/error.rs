// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、ApplyError, DatabaseError, ConfigError, RegistryError を定義します。

use crate::core::migration::MigrationId;
use thiserror::Error;

/// 適用要求で検証対象となるマイグレーションIDの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationRole {
    /// 適用前にDBが到達しているはずのID
    Base,
    /// 適用後にDBが到達するはずのID
    Target,
}

impl std::fmt::Display for MigrationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationRole::Base => write!(f, "BaseMigrationId"),
            MigrationRole::Target => write!(f, "TargetMigrationId"),
        }
    }
}

/// 適用エラー
///
/// 適用要求の各段階（整合性・安全性・履歴・実行）で発生する失敗を表現します。
/// いずれもハンドラーで `ApplyOutcome` に回収され、呼び出し元には真偽値とメッセージで返ります。
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    /// スクリプトのハッシュが申告値と一致しない
    #[error("SHA256 mismatch. declared={declared}, actual={actual}")]
    IntegrityMismatch {
        /// 呼び出し元が申告したハッシュ
        declared: String,
        /// 実際に計算したハッシュ
        actual: String,
    },

    /// バッチ区切りトークンを含む
    #[error("SQL contains '{token}' batch separator at line {line}. Rejected for safety.")]
    UnsupportedSyntax {
        /// 検出したトークン
        token: String,
        /// 検出行（1始まり）
        line: usize,
    },

    /// コンテキストが登録されていない
    #[error("Context '{name}' not found. Candidates: {}", .candidates.join(", "))]
    UnknownContext {
        /// 指定されたコンテキスト名
        name: String,
        /// 登録済みコンテキスト名
        candidates: Vec<String>,
    },

    /// マイグレーションIDがコード側の系列に存在しない
    #[error("{role} not found in code: {id}")]
    UnknownMigrationId {
        /// IDの役割
        role: MigrationRole,
        /// 指定されたID
        id: String,
    },

    /// target が base より前に並ぶ
    #[error("TargetMigrationId must be >= BaseMigrationId (base='{base}', target='{target}').")]
    OutOfOrder {
        /// 指定されたbase
        base: String,
        /// 指定されたtarget
        target: String,
    },

    /// DB側の適用履歴がコード側の系列の接頭辞になっていない
    #[error(
        "DB migration history does not match code migrations (not a prefix). Wrong branch/assembly? \
         last_applied='{last_applied}', applied=[{}], expected=[{}]",
        join_ids(.applied),
        join_ids(.expected)
    )]
    HistoryDivergence {
        /// DBの最終適用ID
        last_applied: String,
        /// DBの適用履歴
        applied: Vec<MigrationId>,
        /// コード側の系列
        expected: Vec<MigrationId>,
    },

    /// DBの最終適用IDが要求のbaseと一致しない
    #[error(
        "Base mismatch. DB last applied is '{last_applied}', but request base is '{base}'. \
         applied=[{}], expected=[{}]",
        join_ids(.applied),
        join_ids(.expected)
    )]
    BaseMismatch {
        /// DBの最終適用ID
        last_applied: String,
        /// 要求のbase
        base: String,
        /// DBの適用履歴
        applied: Vec<MigrationId>,
        /// コード側の系列
        expected: Vec<MigrationId>,
    },

    /// 適用履歴を読み取れなかった
    #[error("Failed to read migration history: {message}")]
    HistoryUnavailable {
        /// エラーメッセージ
        message: String,
    },

    /// スクリプト実行中のエラー（ロールバック済み）
    #[error("Rolled back: {message}")]
    ExecutionFailure {
        /// 原因となったエラーメッセージ
        message: String,
    },

    /// 実行は完了したが適用後の状態が期待と異なる（ロールバック済み）
    #[error(
        "Post-check failed. Last migration='{}', expected='{expected}'. Rolled back.",
        .observed.as_ref().map(|id| id.as_str()).unwrap_or("")
    )]
    PostCheckFailed {
        /// トランザクション内で観測した最終適用ID
        observed: Option<MigrationId>,
        /// 期待したID
        expected: MigrationId,
    },
}

impl ApplyError {
    /// 失敗した段階の名前
    pub fn kind(&self) -> &'static str {
        match self {
            ApplyError::IntegrityMismatch { .. } => "IntegrityMismatch",
            ApplyError::UnsupportedSyntax { .. } => "UnsupportedSyntax",
            ApplyError::UnknownContext { .. } => "UnknownContext",
            ApplyError::UnknownMigrationId { .. } => "UnknownMigrationId",
            ApplyError::OutOfOrder { .. } => "OutOfOrder",
            ApplyError::HistoryDivergence { .. } => "HistoryDivergence",
            ApplyError::BaseMismatch { .. } => "BaseMismatch",
            ApplyError::HistoryUnavailable { .. } => "HistoryUnavailable",
            ApplyError::ExecutionFailure { .. } => "ExecutionFailure",
            ApplyError::PostCheckFailed { .. } => "PostCheckFailed",
        }
    }

    /// 実行段階（トランザクション開始後）の失敗かどうか
    pub fn is_execution_stage(&self) -> bool {
        matches!(
            self,
            ApplyError::ExecutionFailure { .. } | ApplyError::PostCheckFailed { .. }
        )
    }

    /// 履歴の不整合による失敗かどうか
    pub fn is_history_mismatch(&self) -> bool {
        matches!(
            self,
            ApplyError::HistoryDivergence { .. } | ApplyError::BaseMismatch { .. }
        )
    }
}

impl From<RegistryError> for ApplyError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::ContextNotFound { name, candidates } => {
                ApplyError::UnknownContext { name, candidates }
            }
            other => ApplyError::UnknownContext {
                name: other.to_string(),
                candidates: Vec::new(),
            },
        }
    }
}

impl From<DatabaseError> for ApplyError {
    fn from(error: DatabaseError) -> Self {
        ApplyError::HistoryUnavailable {
            message: error.to_string(),
        }
    }
}

fn join_ids(ids: &[MigrationId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Invalid table name error
    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName {
        /// テーブル名
        name: String,
        /// 不正な理由
        reason: String,
    },
}

/// 設定エラー
///
/// 設定ファイルの読み込み・検証時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// バージョン未指定
    #[error("Config file version is not specified")]
    MissingVersion,

    /// 環境設定なし
    #[error("At least one environment configuration is required")]
    NoEnvironments,

    /// コンテキスト定義なし
    #[error("At least one context definition is required")]
    NoContexts,

    /// バッチ区切りトークンが空
    #[error("batch_separator must not be empty")]
    EmptyBatchSeparator,

    /// 環境が見つからない
    #[error("Environment '{name}' not found. Available environments: {available:?}")]
    EnvironmentNotFound {
        /// 指定された環境名
        name: String,
        /// 利用可能な環境名リスト
        available: Vec<String>,
    },

    /// データベース名未指定
    #[error("Database name is not specified")]
    MissingDatabaseName,

    /// 履歴テーブル識別子が不正
    #[error("Invalid history table identifier '{name}'")]
    InvalidHistoryIdentifier {
        /// 識別子
        name: String,
    },

    /// 環境別設定の検証エラー
    #[error("Invalid config for environment '{environment}': {source}")]
    InvalidEnvironment {
        /// 環境名
        environment: String,
        /// 原因
        #[source]
        source: Box<ConfigError>,
    },

    /// コンテキスト定義の検証エラー
    #[error("Invalid config for context '{context}': {reason}")]
    InvalidContext {
        /// コンテキスト名
        context: String,
        /// 不正な理由
        reason: String,
    },
}

/// コンテキストレジストリエラー
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// 指定名に一致するコンテキストがない
    #[error("Context '{name}' not found. Candidates: {}", .candidates.join(", "))]
    ContextNotFound {
        /// 指定された名前
        name: String,
        /// 登録済みの候補（完全修飾名）
        candidates: Vec<String>,
    },

    /// 名前が既存のコンテキストと衝突する
    #[error("Context '{name}' conflicts with already registered context '{existing}'")]
    DuplicateContext {
        /// 登録しようとした名前
        name: String,
        /// 衝突した既存コンテキスト
        existing: String,
    },
}
