// 命名ポリシー
//
// 設定ファイル名と既定の識別子の単一ソースを提供します。

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".strata-gate.yaml";

/// 既定のマイグレーション履歴テーブル名
pub const DEFAULT_HISTORY_TABLE: &str = "schema_migrations";

/// 既定のマイグレーション履歴カラム名
pub const DEFAULT_HISTORY_COLUMN: &str = "version";

/// 既定のバッチ区切りトークン（sqlcmd / SSMS 由来）
pub const DEFAULT_BATCH_SEPARATOR: &str = "GO";

/// 既定の対象環境
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// マイグレーション未適用を表す番兵値
pub const NO_MIGRATIONS_APPLIED: &str = "0";
