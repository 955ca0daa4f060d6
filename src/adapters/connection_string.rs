// 接続文字列ビルダー
//
// DatabaseConfig と Dialect から接続文字列を生成する。

use crate::core::config::{DatabaseConfig, Dialect};
use urlencoding::encode;

/// 接続文字列を生成
///
/// ユーザー名とパスワードはパーセントエンコードされます。
/// これにより、`@`, `:`, `/`, `#`, `?` などの特殊文字を含むパスワードでも
/// 正しく接続文字列が構築されます。
pub fn build_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    match dialect {
        Dialect::PostgreSQL => {
            let auth = build_auth(config, "postgres");
            let port = config.resolved_port(dialect);
            let base = format!(
                "postgresql://{}@{}:{}/{}",
                auth, config.host, port, config.database
            );
            match &config.ssl_mode {
                Some(mode) => format!("{}?sslmode={}", base, mode),
                None => base,
            }
        }
        Dialect::MySQL => {
            let auth = build_auth(config, "root");
            let port = config.resolved_port(dialect);
            format!(
                "mysql://{}@{}:{}/{}",
                auth, config.host, port, config.database
            )
        }
        // 対象DBは既存であることが前提のため mode=rwc は付与しない
        Dialect::SQLite => format!("sqlite://{}", config.database),
    }
}

fn build_auth(config: &DatabaseConfig, default_user: &str) -> String {
    let user = config.user.as_deref().unwrap_or(default_user);
    let encoded_user = encode(user);
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => {
            format!("{}:{}", encoded_user, encode(password))
        }
        _ => encoded_user.to_string(),
    }
}
