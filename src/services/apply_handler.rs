// 適用ハンドラー
//
// 整合性検証 → 安全性スクリーニング → 履歴検証 → （dry runでなければ）実行
// の順に処理し、結果を ApplyOutcome として返す。

use crate::core::error::ApplyError;
use crate::core::migration::{ApplyOutcome, ApplyRequest};
use crate::services::context_registry::ContextRegistry;
use crate::services::history_validator::HistoryValidator;
use crate::services::migration_executor::MigrationExecutor;
use crate::services::script_integrity::ScriptIntegrityVerifier;
use crate::services::script_screener::ScriptScreener;
use std::sync::Arc;
use tracing::{info, warn};

/// dry run成功時のメッセージ
pub const DRY_RUN_MESSAGE: &str = "DryRun OK. Validation passed.";

/// 適用ハンドラー
#[derive(Debug, Clone)]
pub struct ApplyHandler {
    verifier: ScriptIntegrityVerifier,
    screener: ScriptScreener,
    validator: HistoryValidator,
    executor: MigrationExecutor,
}

impl ApplyHandler {
    /// 新しいApplyHandlerを作成
    ///
    /// # Arguments
    ///
    /// * `registry` - 起動時に構築したコンテキストレジストリ
    /// * `batch_separator` - 拒否するバッチ区切りトークン
    pub fn new(registry: Arc<ContextRegistry>, batch_separator: &str) -> Self {
        Self {
            verifier: ScriptIntegrityVerifier::new(),
            screener: ScriptScreener::with_separator(batch_separator),
            validator: HistoryValidator::new(registry),
            executor: MigrationExecutor::new(),
        }
    }

    pub fn registry(&self) -> &ContextRegistry {
        self.validator.registry()
    }

    /// 適用要求を処理
    ///
    /// すべての失敗は ApplyOutcome に回収される。
    pub async fn handle(&self, request: &ApplyRequest) -> ApplyOutcome {
        match self.try_handle(request).await {
            Ok(message) => ApplyOutcome::success(message),
            Err(error) => {
                warn!(
                    context = %request.context,
                    base_id = %request.base_migration_id,
                    target_id = %request.target_migration_id,
                    stage = error.kind(),
                    "Apply rejected: {}",
                    error
                );
                ApplyOutcome::failure(&error)
            }
        }
    }

    /// 適用要求を処理し、失敗段階を型付きエラーで返す
    pub async fn try_handle(&self, request: &ApplyRequest) -> Result<String, ApplyError> {
        self.verifier.check(&request.sql, &request.sha256)?;
        self.screener.check(&request.sql)?;

        let report = self.validator.validate(request).await?;
        info!(
            context = %report.context.name(),
            last_applied = %report.last_applied,
            target_id = %request.target_migration_id,
            dry_run = request.dry_run,
            "Validation passed"
        );

        if request.dry_run {
            return Ok(DRY_RUN_MESSAGE.to_string());
        }

        let execution = self
            .executor
            .execute(
                report.context.target(),
                &request.sql,
                &report.last_applied,
                &request.target_id(),
            )
            .await?;

        Ok(execution.message())
    }
}
