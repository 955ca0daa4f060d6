// マイグレーション履歴アダプター
//
// 対象DBのマイグレーション履歴テーブルの読み取りと、トランザクション内の直列化ロックを担当する。
// 履歴テーブルへの書き込みは行わない（適用スクリプト自身が記録する）。

use crate::core::config::{is_safe_identifier, Dialect, HistoryTableConfig};
use crate::core::error::DatabaseError;
use crate::core::migration::MigrationId;
use sqlx::{Any, Executor, Row};

/// マイグレーション履歴サービス
///
/// テーブル名・カラム名は構築時に検証済みのため、SQLへ直接埋め込む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationHistoryService {
    dialect: Dialect,
    table: String,
    column: String,
}

impl MigrationHistoryService {
    /// 新しいMigrationHistoryServiceを作成
    pub fn new(dialect: Dialect, config: &HistoryTableConfig) -> Result<Self, DatabaseError> {
        if !is_safe_identifier(&config.table) {
            return Err(DatabaseError::InvalidTableName {
                name: config.table.clone(),
                reason: "must be `table` or `schema.table` made of [A-Za-z0-9_]".to_string(),
            });
        }
        if !is_safe_identifier(&config.column) || config.column.contains('.') {
            return Err(DatabaseError::InvalidTableName {
                name: config.column.clone(),
                reason: "history column must be a plain identifier".to_string(),
            });
        }

        Ok(Self {
            dialect,
            table: config.table.clone(),
            column: config.column.clone(),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// 方言に応じて識別子をクォート（`schema.table` は要素ごと）
    fn quote(&self, name: &str) -> String {
        let (open, close) = match self.dialect {
            Dialect::MySQL => ('`', '`'),
            Dialect::PostgreSQL | Dialect::SQLite => ('"', '"'),
        };
        name.split('.')
            .map(|part| format!("{}{}{}", open, part, close))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// スキーマ修飾とテーブル名に分解
    fn split_table(&self) -> (Option<&str>, &str) {
        match self.table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, self.table.as_str()),
        }
    }

    /// 適用済みマイグレーション取得のSELECT SQLを生成
    pub fn generate_get_applied_sql(&self) -> String {
        let column = self.quote(&self.column);
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            column,
            self.quote(&self.table),
            column
        )
    }

    /// 履歴テーブル存在確認SQLを生成
    pub fn generate_check_table_exists_sql(&self) -> String {
        let (schema, table) = self.split_table();
        match self.dialect {
            Dialect::PostgreSQL => match schema {
                Some(schema) => format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}'",
                    schema, table
                ),
                None => format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_schema = ANY(current_schemas(false)) AND table_name = '{}'",
                    table
                ),
            },
            Dialect::MySQL => match schema {
                Some(schema) => format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}'",
                    schema, table
                ),
                None => format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = '{}'",
                    table
                ),
            },
            Dialect::SQLite => match schema {
                Some(schema) => format!(
                    "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name = '{}'",
                    self.quote(schema),
                    table
                ),
                None => format!(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                    table
                ),
            },
        }
    }

    /// 同時適用を直列化するロックSQLを生成
    ///
    /// - PostgreSQL: 自己競合するテーブルロック（読み取りは妨げない）
    /// - MySQL: 履歴全行の排他行ロック（InnoDBのネクストキーロックで挿入も待たせる）
    /// - SQLite: DB単位の書き込みロックに任せるため None
    pub fn generate_lock_sql(&self) -> Option<String> {
        match self.dialect {
            Dialect::PostgreSQL => Some(format!(
                "LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE",
                self.quote(&self.table)
            )),
            Dialect::MySQL => Some(format!(
                "SELECT {} FROM {} FOR UPDATE",
                self.quote(&self.column),
                self.quote(&self.table)
            )),
            Dialect::SQLite => None,
        }
    }

    /// 履歴テーブルが存在するか確認
    pub async fn table_exists<'e, E>(&self, executor: E) -> Result<bool, DatabaseError>
    where
        E: Executor<'e, Database = Any>,
    {
        let sql = self.generate_check_table_exists_sql();

        let row = sqlx::query(&sql)
            .fetch_optional(executor)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to check migration history table: {}", e),
                sql: Some(sql.clone()),
            })?;

        Ok(row.is_some())
    }

    /// 適用済みマイグレーションを読み取る
    ///
    /// DBの照合順序に依存しないよう、取得後に序数比較で並べ直す。
    pub async fn read_applied<'e, E>(&self, executor: E) -> Result<Vec<MigrationId>, DatabaseError>
    where
        E: Executor<'e, Database = Any>,
    {
        let sql = self.generate_get_applied_sql();

        let rows = sqlx::query(&sql)
            .fetch_all(executor)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to read migration history: {}", e),
                sql: Some(sql.clone()),
            })?;

        let mut applied = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get(0).map_err(|e| DatabaseError::Query {
                message: format!("Failed to decode migration id: {}", e),
                sql: Some(sql.clone()),
            })?;
            applied.push(MigrationId::from(id));
        }
        applied.sort();

        Ok(applied)
    }

    /// 直列化ロックを取得（履歴テーブルが存在する場合のみ）
    pub async fn acquire_lock<'e, E>(&self, executor: E) -> Result<(), DatabaseError>
    where
        E: Executor<'e, Database = Any>,
    {
        let Some(sql) = self.generate_lock_sql() else {
            return Ok(());
        };

        sqlx::query(&sql)
            .execute(executor)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to lock migration history table: {}", e),
                sql: Some(sql.clone()),
            })?;

        Ok(())
    }
}
