// データベース接続アダプター
//
// SQLxを使用したデータベース接続の管理を行います。
// PostgreSQL、MySQL、SQLiteに対応した統一されたインターフェースと、
// コンテキストごとの適用先DB（TargetDatabase）を提供します。

use crate::adapters::connection_string::build_connection_string;
use crate::adapters::migration_history::MigrationHistoryService;
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::DatabaseError;
use crate::core::migration::MigrationId;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool};
use std::time::Duration;

/// 接続取得の既定タイムアウト（秒）
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// 既定の最大コネクション数
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, DatabaseError> {
        let connection_string = build_connection_string(dialect, config);

        self.create_pool_options(config)
            .connect(&connection_string)
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!("Failed to create connection pool: {}", dialect),
                cause: e.to_string(),
            })
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, pool: &AnyPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Connection {
                message: "Database connection test failed".to_string(),
                cause: e.to_string(),
            })
    }

    /// 設定に応じたプールオプションを作成
    pub fn create_pool_options(&self, config: &DatabaseConfig) -> PoolOptions<Any> {
        let timeout = config.timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS);
        PoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .acquire_timeout(Duration::from_secs(timeout))
    }
}

/// 適用先データベース
///
/// 接続プールと履歴テーブルへのアクセス方法の組。
/// プールはクローンしても同じ接続群を共有する。
#[derive(Debug, Clone)]
pub struct TargetDatabase {
    pool: AnyPool,
    history: MigrationHistoryService,
}

impl TargetDatabase {
    pub fn new(pool: AnyPool, history: MigrationHistoryService) -> Self {
        Self { pool, history }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn history(&self) -> &MigrationHistoryService {
        &self.history
    }

    pub fn dialect(&self) -> Dialect {
        self.history.dialect()
    }

    /// 適用済みマイグレーション履歴を読み取る
    ///
    /// 履歴テーブルが存在しない場合は空の履歴として扱う。
    pub async fn read_applied_log(&self) -> Result<Vec<MigrationId>, DatabaseError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::Connection {
                message: "Failed to acquire connection".to_string(),
                cause: e.to_string(),
            })?;

        if !self.history.table_exists(&mut *conn).await? {
            return Ok(Vec::new());
        }

        self.history.read_applied(&mut *conn).await
    }

    /// 接続プールを閉じる
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
