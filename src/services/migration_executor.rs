// マイグレーション実行サービス
//
// スクリプトを1トランザクション内で1バッチとして実行し、
// 同じトランザクション内で適用履歴を読み直して期待した到達点か確認してからコミットする。
// ロック取得後にも base を確認し直すため、検証後に他の適用が先にコミットした場合は実行しない。
// 確認に失敗した場合・実行中にエラーが発生した場合はロールバックする。

use crate::adapters::database::TargetDatabase;
use crate::core::error::ApplyError;
use crate::core::migration::{ExecutionReport, ExecutionState, MigrationId};
use chrono::Utc;
use sqlx::{Any, Transaction};
use tracing::{debug, info, warn};

/// マイグレーション実行サービス
#[derive(Debug, Clone, Default)]
pub struct MigrationExecutor {}

impl MigrationExecutor {
    /// 新しいMigrationExecutorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// スクリプトを実行し、到達点を検証してコミット
    ///
    /// # Arguments
    ///
    /// * `target` - 適用先データベース
    /// * `script` - スクリプト本文（1バッチとして実行）
    /// * `base` - 実行前の最終適用IDとして検証済みの値
    /// * `expected_target` - 実行後の最終適用IDとして期待する値
    ///
    /// # Returns
    ///
    /// コミット済みの場合は実行結果、それ以外はロールバック済みのエラー
    pub async fn execute(
        &self,
        target: &TargetDatabase,
        script: &str,
        base: &MigrationId,
        expected_target: &MigrationId,
    ) -> Result<ExecutionReport, ApplyError> {
        let started_at = Utc::now();
        let mut state = ExecutionState::Idle;
        debug!("Executor state: {}", state);

        let mut tx = target
            .pool()
            .begin()
            .await
            .map_err(|e| ApplyError::ExecutionFailure {
                message: format!("Failed to start transaction: {}", e),
            })?;

        state = transition(state, ExecutionState::Executing);

        let applied = match self.run_in_transaction(&mut tx, target, script, base).await {
            Ok(applied) => applied,
            Err(message) => {
                state = transition(state, ExecutionState::ExecutionException);
                rollback(tx).await;
                transition(state, ExecutionState::RolledBack);
                return Err(ApplyError::ExecutionFailure { message });
            }
        };

        if let Some(duplicate) = find_duplicate(&applied) {
            let message = format!(
                "Migration '{}' is recorded more than once in the history.",
                duplicate
            );
            state = transition(state, ExecutionState::PostCheckFailed);
            rollback(tx).await;
            transition(state, ExecutionState::RolledBack);
            return Err(ApplyError::ExecutionFailure { message });
        }

        if applied.last() != Some(expected_target) {
            state = transition(state, ExecutionState::PostCheckFailed);
            rollback(tx).await;
            transition(state, ExecutionState::RolledBack);
            return Err(ApplyError::PostCheckFailed {
                observed: applied.last().cloned(),
                expected: expected_target.clone(),
            });
        }

        state = transition(state, ExecutionState::CommitVerified);

        if let Err(e) = tx.commit().await {
            // コミット失敗時はドライバー側でトランザクションが破棄される
            transition(state, ExecutionState::ExecutionException);
            return Err(ApplyError::ExecutionFailure {
                message: format!("Failed to commit transaction: {}", e),
            });
        }

        let state = transition(state, ExecutionState::Committed);
        let duration_ms = (Utc::now() - started_at).num_milliseconds();
        info!(
            last_applied = %expected_target,
            dialect = %target.dialect(),
            duration_ms,
            "Committed"
        );

        Ok(ExecutionReport {
            state,
            last_applied: expected_target.clone(),
            started_at,
            duration_ms,
        })
    }

    /// トランザクション内でロック・base再確認・実行・再読み取りを行い、観測した適用履歴を返す
    async fn run_in_transaction(
        &self,
        tx: &mut Transaction<'static, Any>,
        target: &TargetDatabase,
        script: &str,
        base: &MigrationId,
    ) -> Result<Vec<MigrationId>, String> {
        let history = target.history();

        let before = if history
            .table_exists(&mut **tx)
            .await
            .map_err(|e| e.to_string())?
        {
            history
                .acquire_lock(&mut **tx)
                .await
                .map_err(|e| e.to_string())?;
            history
                .read_applied(&mut **tx)
                .await
                .map_err(|e| e.to_string())?
        } else {
            Vec::new()
        };

        // ロック待ちの間に他の適用がコミットしていれば履歴が進んでいる
        let last_applied = before
            .last()
            .cloned()
            .unwrap_or_else(MigrationId::none_applied);
        if &last_applied != base {
            return Err(format!(
                "History changed before execution. DB last applied is '{}', but request base is '{}'.",
                last_applied, base
            ));
        }
        debug!(last_applied = %last_applied, "Base confirmed under lock");

        sqlx::raw_sql(script)
            .execute(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;

        if !history
            .table_exists(&mut **tx)
            .await
            .map_err(|e| e.to_string())?
        {
            return Ok(Vec::new());
        }

        history
            .read_applied(&mut **tx)
            .await
            .map_err(|e| e.to_string())
    }
}

/// 履歴中に二重に記録されたIDを探す
///
/// 一意制約のない履歴テーブルでは、スクリプトが適用済みIDを再度記録しうる。
/// 履歴は序数順に並んでいるため、重複は隣接する。
fn find_duplicate(applied: &[MigrationId]) -> Option<&MigrationId> {
    applied
        .windows(2)
        .find(|pair| pair[0] == pair[1])
        .map(|pair| &pair[0])
}

/// 状態遷移を記録
fn transition(from: ExecutionState, to: ExecutionState) -> ExecutionState {
    debug!("Executor state: {} -> {}", from, to);
    to
}

/// ロールバック（失敗しても元のエラーを優先する）
async fn rollback(tx: Transaction<'static, Any>) {
    if let Err(e) = tx.rollback().await {
        warn!("Failed to roll back transaction: {}", e);
    }
}
