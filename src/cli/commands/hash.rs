// hashコマンドハンドラー
//
// マイグレーションスクリプトのSHA-256を表示します。

use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::services::script_integrity::ScriptIntegrityVerifier;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// hashコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct HashOutput {
    pub path: PathBuf,
    pub sha256: String,
}

impl CommandOutput for HashOutput {
    fn to_text(&self) -> String {
        self.sha256.clone()
    }
}

/// hashコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct HashCommand {
    /// スクリプトファイル
    pub sql_path: PathBuf,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// hashコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct HashCommandHandler {
    verifier: ScriptIntegrityVerifier,
}

impl HashCommandHandler {
    /// 新しいHashCommandHandlerを作成
    pub fn new() -> Self {
        Self {
            verifier: ScriptIntegrityVerifier::new(),
        }
    }

    /// hashコマンドを実行
    pub fn execute(&self, command: &HashCommand) -> Result<String> {
        let sql = fs::read_to_string(&command.sql_path)
            .with_context(|| format!("Failed to read SQL file: {:?}", command.sql_path))?;

        let output = HashOutput {
            path: command.sql_path.clone(),
            sha256: self.verifier.compute(&sql),
        };
        render_output(&output, &command.format)
    }
}
