// マイグレーション適用のドメインモデル
//
// マイグレーションID、適用要求、検証・実行レポート、適用結果を定義します。

use crate::core::error::ApplyError;
use crate::core::naming::NO_MIGRATIONS_APPLIED;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// マイグレーションID
///
/// `20260216044017_AddIndexes` のような不透明な文字列。
/// 順序は文字列の序数比較（バイト列の辞書順）のみで決まり、数値として解釈しない。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    /// 新しいマイグレーションIDを作成
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 「未適用」を表す番兵ID
    pub fn none_applied() -> Self {
        Self(NO_MIGRATIONS_APPLIED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MigrationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MigrationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 系列を序数順に整列し重複を除去する
pub fn normalize_sequence(ids: impl IntoIterator<Item = MigrationId>) -> Vec<MigrationId> {
    let mut sequence: Vec<MigrationId> = ids.into_iter().collect();
    sequence.sort();
    sequence.dedup();
    sequence
}

/// 適用要求
///
/// 1回の呼び出しごとに作成され、結果を返した時点で破棄されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// 論理コンテキスト名
    pub context: String,
    /// 適用前にDBが到達しているはずのID
    pub base_migration_id: String,
    /// 適用後にDBが到達するはずのID
    pub target_migration_id: String,
    /// スクリプト本文
    pub sql: String,
    /// 呼び出し元が申告するSHA-256（16進、大文字小文字不問）
    pub sha256: String,
    /// 検証のみ行いDBを変更しない
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplyRequest {
    pub fn base_id(&self) -> MigrationId {
        MigrationId::from(self.base_migration_id.as_str())
    }

    pub fn target_id(&self) -> MigrationId {
        MigrationId::from(self.target_migration_id.as_str())
    }
}

/// 実行の状態遷移
///
/// `Idle → Executing → {CommitVerified → Committed | PostCheckFailed → RolledBack | ExecutionException → RolledBack}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Executing,
    CommitVerified,
    Committed,
    PostCheckFailed,
    ExecutionException,
    RolledBack,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::Idle => "idle",
            ExecutionState::Executing => "executing",
            ExecutionState::CommitVerified => "commit_verified",
            ExecutionState::Committed => "committed",
            ExecutionState::PostCheckFailed => "post_check_failed",
            ExecutionState::ExecutionException => "execution_exception",
            ExecutionState::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// コミット済み実行の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// 最終状態（成功時は常に Committed）
    pub state: ExecutionState,
    /// コミット後の最終適用ID
    pub last_applied: MigrationId,
    /// 実行開始時刻
    pub started_at: DateTime<Utc>,
    /// 所要時間（ミリ秒）
    pub duration_ms: i64,
}

impl ExecutionReport {
    pub fn message(&self) -> String {
        format!("Committed. Now at '{}'.", self.last_applied)
    }
}

/// 適用結果
///
/// 呼び出し元に返す終端の値。失敗時のメッセージは失敗段階の名前で始まります。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub success: bool,
    pub message: String,
}

impl ApplyOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(error: &ApplyError) -> Self {
        Self {
            success: false,
            message: format!("{}: {}", error.kind(), error),
        }
    }
}
