// applyコマンドハンドラー
//
// 1本のマイグレーションスクリプトを base → target として適用します。
// - 引数またはJSONファイルから適用要求を組み立て
// - ハッシュ省略時はファイルから計算
// - 適用ハンドラーで検証・実行し、結果を表示

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::migration::{ApplyOutcome, ApplyRequest};
use crate::services::apply_handler::ApplyHandler;
use crate::services::script_integrity::ScriptIntegrityVerifier;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// applyコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutput {
    pub context: String,
    pub base_migration_id: String,
    pub target_migration_id: String,
    pub dry_run: bool,
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ApplyOutput {
    fn to_text(&self) -> String {
        if self.success {
            format!("{} {}", "✓".green(), self.message)
        } else {
            format!("{} {}", "✗".red(), self.message.red())
        }
    }
}

/// 適用要求の入力元
#[derive(Debug, Clone)]
pub enum ApplyInput {
    /// コマンドライン引数で指定
    Inline {
        context: String,
        base: String,
        target: String,
        sql_path: PathBuf,
        sha256: Option<String>,
        dry_run: bool,
    },
    /// JSONファイルで指定
    RequestFile(PathBuf),
}

/// applyコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ApplyCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 適用要求の入力元
    pub input: ApplyInput,
    /// 環境名
    pub env: String,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// applyコマンドハンドラー
#[derive(Debug, Clone)]
pub struct ApplyCommandHandler {}

impl ApplyCommandHandler {
    /// 新しいApplyCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// applyコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は結果メッセージ。適用が拒否・ロールバックされた場合はエラー
    pub async fn execute(&self, command: &ApplyCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let request = self.build_request(&command.input, &command.project_path)?;

        debug!(
            context = %request.context,
            base_id = %request.base_migration_id,
            target_id = %request.target_migration_id,
            dry_run = request.dry_run,
            "Apply request"
        );

        let registry = context.build_registry(&command.env).await?;
        let handler = ApplyHandler::new(registry.clone(), &context.config.batch_separator);
        let outcome = handler.handle(&request).await;
        registry.close().await;

        self.render(&request, outcome, &command.format)
    }

    /// 入力元から適用要求を組み立てる
    fn build_request(&self, input: &ApplyInput, project_path: &Path) -> Result<ApplyRequest> {
        match input {
            ApplyInput::Inline {
                context,
                base,
                target,
                sql_path,
                sha256,
                dry_run,
            } => {
                let sql_path = resolve_path(project_path, sql_path);
                let sql = fs::read_to_string(&sql_path)
                    .with_context(|| format!("Failed to read SQL file: {:?}", sql_path))?;
                let sha256 = match sha256 {
                    Some(hash) => hash.clone(),
                    None => ScriptIntegrityVerifier::new().compute(&sql),
                };

                Ok(ApplyRequest {
                    context: context.clone(),
                    base_migration_id: base.clone(),
                    target_migration_id: target.clone(),
                    sql,
                    sha256,
                    dry_run: *dry_run,
                })
            }
            ApplyInput::RequestFile(path) => {
                let path = resolve_path(project_path, path);
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read request file: {:?}", path))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse request file: {:?}", path))
            }
        }
    }

    /// 適用結果を出力形式に変換
    fn render(
        &self,
        request: &ApplyRequest,
        outcome: ApplyOutcome,
        format: &OutputFormat,
    ) -> Result<String> {
        let output = ApplyOutput {
            context: request.context.clone(),
            base_migration_id: request.base_migration_id.clone(),
            target_migration_id: request.target_migration_id.clone(),
            dry_run: request.dry_run,
            success: outcome.success,
            message: outcome.message,
        };

        if output.success {
            render_output(&output, format)
        } else {
            Err(anyhow!("{}", output.message))
        }
    }
}

impl Default for ApplyCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_path(project_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_path.join(path)
    }
}
