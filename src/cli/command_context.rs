// コマンド共通コンテキスト
//
// 設定ファイル読み込みやレジストリ構築の重複をCLI層で集約する。

use crate::core::config::Config;
use crate::services::config_loader::ConfigLoader;
use crate::services::context_registry::ContextRegistry;
use crate::services::registry_loader::RegistryLoader;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// プロジェクトルートから設定を読み込んでコンテキストを作成
    pub fn load(project_path: PathBuf) -> Result<Self> {
        Self::load_with_config(project_path, None)
    }

    /// カスタム設定ファイルパスを指定してコンテキストを作成
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if !config_path.exists() {
            return Err(anyhow!(
                "Config file not found: {:?}. Create {} in the project root or pass --config.",
                config_path,
                Config::DEFAULT_CONFIG_PATH
            ));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// コンテキストレジストリを構築
    ///
    /// 接続先DBへ到達できない場合はエラー。
    pub async fn build_registry(&self, env: &str) -> Result<Arc<ContextRegistry>> {
        let registry = RegistryLoader::new()
            .load(&self.config, &self.project_path, env)
            .await
            .with_context(|| "Failed to build context registry")?;
        Ok(Arc::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();

        let err = CommandContext::load(temp_dir.path().to_path_buf()).unwrap_err();

        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_with_custom_config_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        std::fs::write(
            &config_path,
            r#"
version: "1.0"
dialect: sqlite
environments:
  development:
    database: app.db
contexts:
  AppDbContext:
    migrations: ["20260101000000_init"]
"#,
        )
        .unwrap();

        let context =
            CommandContext::load_with_config(temp_dir.path().to_path_buf(), Some(config_path.clone()))
                .unwrap();

        assert_eq!(context.config_path, config_path);
        assert_eq!(context.config.contexts.len(), 1);
    }
}
