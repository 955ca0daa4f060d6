// スクリプト安全性スクリーニングサービス
//
// 実行層はスクリプト全体を1つのバッチとしてドライバーに渡すため、
// ドライバーが解釈しないバッチ区切り行（既定: GO）を含むスクリプトは分割せずに拒否する。

use crate::core::error::ApplyError;
use crate::core::naming::DEFAULT_BATCH_SEPARATOR;

/// スクリプト安全性スクリーニングサービス
#[derive(Debug, Clone)]
pub struct ScriptScreener {
    separator: String,
}

impl ScriptScreener {
    /// 既定のバッチ区切りトークンで作成
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_BATCH_SEPARATOR)
    }

    /// バッチ区切りトークンを指定して作成
    pub fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.trim().to_string(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// バッチ区切り行の位置（1始まりの行番号）を返す
    ///
    /// 前後の空白を除いた行がトークンと大文字小文字を区別せず一致する場合のみ検出する。
    pub fn find_separator(&self, script: &str) -> Option<usize> {
        script
            .lines()
            .position(|line| line.trim().eq_ignore_ascii_case(&self.separator))
            .map(|index| index + 1)
    }

    /// バッチ区切りを含まない場合に true
    pub fn screen(&self, script: &str) -> bool {
        self.find_separator(script).is_none()
    }

    /// スクリーニングし、区切りを含む場合は UnsupportedSyntax を返す
    pub fn check(&self, script: &str) -> Result<(), ApplyError> {
        match self.find_separator(script) {
            None => Ok(()),
            Some(line) => Err(ApplyError::UnsupportedSyntax {
                token: self.separator.clone(),
                line,
            }),
        }
    }
}

impl Default for ScriptScreener {
    fn default() -> Self {
        Self::new()
    }
}
