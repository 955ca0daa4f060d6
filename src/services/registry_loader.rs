// コンテキストレジストリ構築サービス
//
// 設定ファイルのコンテキスト定義から、起動時に一度だけレジストリを構築する。
// 接続先DBへ到達できない場合は起動失敗として扱う。

use crate::adapters::database::{DatabaseConnectionService, TargetDatabase};
use crate::adapters::migration_history::MigrationHistoryService;
use crate::core::config::{Config, ContextConfig, DatabaseConfig, Dialect};
use crate::services::context_registry::ContextRegistry;
use crate::services::database_config_resolver::DatabaseConfigResolver;
use crate::services::sequence_provider::{
    DirectorySequenceProvider, MigrationSequenceProvider, StaticSequenceProvider,
};
use anyhow::{anyhow, Context, Result};
use sqlx::AnyPool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// コンテキストレジストリ構築サービス
#[derive(Debug, Clone, Default)]
pub struct RegistryLoader {
    db_service: DatabaseConnectionService,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self {
            db_service: DatabaseConnectionService::new(),
        }
    }

    /// 設定からレジストリを構築
    ///
    /// # Arguments
    ///
    /// * `config` - 検証済みの設定
    /// * `project_path` - 相対パス解決の基準ディレクトリ
    /// * `default_env` - コンテキストに環境指定がない場合に使う環境名
    pub async fn load(
        &self,
        config: &Config,
        project_path: &Path,
        default_env: &str,
    ) -> Result<ContextRegistry> {
        let history = MigrationHistoryService::new(config.dialect, &config.history)
            .with_context(|| "Invalid migration history table settings")?;

        // 同じ環境を参照するコンテキストは接続プールを共有する
        let mut pools: HashMap<String, AnyPool> = HashMap::new();
        let mut builder = ContextRegistry::builder();

        for (name, context) in &config.contexts {
            let provider = self.load_provider(name, context, project_path)?;
            let env = context.environment.as_deref().unwrap_or(default_env);

            let pool = match pools.get(env) {
                Some(pool) => pool.clone(),
                None => {
                    let pool = self.connect(config, project_path, env).await?;
                    pools.insert(env.to_string(), pool.clone());
                    pool
                }
            };

            debug!(
                context = %name,
                environment = %env,
                migrations = provider.expected_sequence().len(),
                "Registering context"
            );

            builder = builder
                .register(provider, TargetDatabase::new(pool, history.clone()))
                .with_context(|| format!("Failed to register context '{}'", name))?;
        }

        let registry = builder.build();
        info!("Registered {} context(s)", registry.len());
        Ok(registry)
    }

    /// コンテキスト定義から系列プロバイダーを作成
    fn load_provider(
        &self,
        name: &str,
        context: &ContextConfig,
        project_path: &Path,
    ) -> Result<Arc<dyn MigrationSequenceProvider>> {
        let qualified_name = context.qualified_name.as_deref().unwrap_or(name);

        match (&context.migrations_dir, &context.migrations) {
            (Some(dir), None) => {
                let dir = project_path.join(dir);
                let provider = DirectorySequenceProvider::load(name, qualified_name, &dir)
                    .with_context(|| format!("Failed to load migrations for context '{}'", name))?;
                Ok(Arc::new(provider))
            }
            (None, Some(ids)) => Ok(Arc::new(StaticSequenceProvider::new(
                name,
                qualified_name,
                ids.iter().map(String::as_str),
            ))),
            _ => Err(anyhow!(
                "Context '{}' must define exactly one of 'migrations_dir' or 'migrations'",
                name
            )),
        }
    }

    /// 環境の接続プールを作成し、疎通を確認する
    async fn connect(&self, config: &Config, project_path: &Path, env: &str) -> Result<AnyPool> {
        let db_config = config
            .get_database_config(env)
            .with_context(|| format!("Config for environment '{}' not found", env))?;
        let db_config = resolve_sqlite_path(
            config.dialect,
            DatabaseConfigResolver::apply_env_overrides(&db_config),
            project_path,
        );

        let pool = self
            .db_service
            .create_pool(config.dialect, &db_config)
            .await
            .with_context(|| format!("Failed to connect to database for environment '{}'", env))?;
        self.db_service
            .test_connection(&pool)
            .await
            .with_context(|| format!("Database for environment '{}' is not reachable", env))?;

        Ok(pool)
    }
}

/// SQLiteの相対パスをプロジェクトルート基準に解決
fn resolve_sqlite_path(
    dialect: Dialect,
    mut config: DatabaseConfig,
    project_path: &Path,
) -> DatabaseConfig {
    if dialect == Dialect::SQLite && config.database != ":memory:" {
        let path = PathBuf::from(&config.database);
        if path.is_relative() {
            config.database = project_path.join(path).to_string_lossy().to_string();
        }
    }
    config
}
