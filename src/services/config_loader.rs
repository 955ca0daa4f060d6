// 設定ファイル読み込みサービス
//
// core::config の純粋性を保つため、ファイルI/Oはこのサービスに集約する。

use crate::core::config::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// 設定ファイル読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// YAMLファイルから設定を読み込み、検証する
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_yaml(&content)
    }

    /// YAML文字列から設定を読み込み、検証する
    pub fn from_yaml(content: &str) -> Result<Config> {
        let config: Config =
            serde_saphyr::from_str(content).with_context(|| "Failed to parse config file")?;
        config
            .validate()
            .with_context(|| "Invalid config file")?;
        Ok(config)
    }
}
