// statusコマンドハンドラー
//
// コンテキストのマイグレーション状態を表示します。
// - 期待系列とDBの適用履歴の照合
// - 最終適用IDと未適用マイグレーションの表示
// - 履歴が期待系列の接頭辞でない場合の警告

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::migration::MigrationId;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// statusコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub context: String,
    pub qualified_name: String,
    pub dialect: String,
    /// 最終適用ID（未適用の場合は "0"）
    pub last_applied: MigrationId,
    pub applied: Vec<MigrationId>,
    pub expected: Vec<MigrationId>,
    pub pending: Vec<MigrationId>,
    /// 適用履歴が期待系列の接頭辞になっているか
    pub consistent: bool,
}

impl StatusOutput {
    /// 期待系列と適用履歴から状態を組み立てる
    pub fn build(
        context: &str,
        qualified_name: &str,
        dialect: &str,
        expected: &[MigrationId],
        applied: Vec<MigrationId>,
    ) -> Self {
        let consistent = expected.starts_with(&applied);
        let pending = if consistent {
            expected[applied.len()..].to_vec()
        } else {
            expected
                .iter()
                .filter(|id| !applied.contains(id))
                .cloned()
                .collect()
        };
        let last_applied = applied
            .last()
            .cloned()
            .unwrap_or_else(MigrationId::none_applied);

        Self {
            context: context.to_string(),
            qualified_name: qualified_name.to_string(),
            dialect: dialect.to_string(),
            last_applied,
            applied,
            expected: expected.to_vec(),
            pending,
            consistent,
        }
    }
}

impl CommandOutput for StatusOutput {
    fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} ({}, {})\n",
            self.context.bold(),
            self.qualified_name,
            self.dialect
        ));
        output.push_str(&format!("Last applied: {}\n\n", self.last_applied));

        for id in &self.expected {
            if self.applied.contains(id) {
                output.push_str(&format!("  {} {}\n", "✓".green(), id));
            } else {
                output.push_str(&format!("  {} {}\n", "·".yellow(), id));
            }
        }
        for id in self.applied.iter().filter(|id| !self.expected.contains(id)) {
            output.push_str(&format!(
                "  {} {} {}\n",
                "✗".red(),
                id,
                "(unknown to code)".red()
            ));
        }

        output.push_str(&format!(
            "\nApplied: {}, Pending: {}, Expected: {}",
            self.applied.len(),
            self.pending.len(),
            self.expected.len()
        ));
        if !self.consistent {
            output.push_str(&format!(
                "\n{}",
                "Warning: DB history is not a prefix of the known migrations.".red()
            ));
        }
        output
    }
}

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// コンテキスト名
    pub context: String,
    /// 環境名
    pub env: String,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// statusコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let registry = context.build_registry(&command.env).await?;

        let handle = registry.resolve(&command.context)?;
        let applied = handle
            .target()
            .read_applied_log()
            .await
            .with_context(|| "Failed to read migration history")?;

        let output = StatusOutput::build(
            handle.name(),
            handle.qualified_name(),
            &handle.target().dialect().to_string(),
            handle.provider().expected_sequence(),
            applied,
        );
        registry.close().await;

        render_output(&output, &command.format)
    }
}
