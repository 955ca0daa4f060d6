// contextsコマンドハンドラー
//
// 登録済みコンテキストの一覧を表示します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::services::context_registry::ContextRegistry;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

/// コンテキスト一覧のエントリ
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub name: String,
    pub qualified_name: String,
    pub dialect: String,
    pub migrations: usize,
}

/// contextsコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ContextsOutput {
    pub contexts: Vec<ContextEntry>,
}

impl ContextsOutput {
    /// レジストリから一覧を作成（名前順）
    pub fn from_registry(registry: &ContextRegistry) -> Self {
        let mut contexts: Vec<ContextEntry> = registry
            .contexts()
            .map(|c| ContextEntry {
                name: c.name().to_string(),
                qualified_name: c.qualified_name().to_string(),
                dialect: c.target().dialect().to_string(),
                migrations: c.provider().expected_sequence().len(),
            })
            .collect();
        contexts.sort_by(|a, b| a.name.cmp(&b.name));
        Self { contexts }
    }
}

impl CommandOutput for ContextsOutput {
    fn to_text(&self) -> String {
        if self.contexts.is_empty() {
            return "No contexts registered.".to_string();
        }

        self.contexts
            .iter()
            .map(|c| {
                format!(
                    "{}  {}  {}  {} migration(s)",
                    c.name, c.qualified_name, c.dialect, c.migrations
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// contextsコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ContextsCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// contextsコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct ContextsCommandHandler {}

impl ContextsCommandHandler {
    /// 新しいContextsCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// contextsコマンドを実行
    pub async fn execute(&self, command: &ContextsCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let registry = context.build_registry(&command.env).await?;

        let output = ContextsOutput::from_registry(&registry);
        registry.close().await;

        render_output(&output, &command.format)
    }
}
