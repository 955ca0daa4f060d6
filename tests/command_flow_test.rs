/// 設定ファイルからのレジストリ構築とコマンド実行の統合テスト
///
/// 一時ディレクトリにプロジェクト（設定ファイル、マイグレーションディレクトリ、SQLiteファイル）を作成し、
/// RegistryLoader と各コマンドハンドラーを通した動作を確認します。

#[cfg(test)]
mod command_flow_tests {
    use serde_json::Value;
    use sqlx::any::AnyPoolOptions;
    use std::fs;
    use std::path::{Path, PathBuf};
    use strata_gate::cli::commands::apply::{ApplyCommand, ApplyCommandHandler, ApplyInput};
    use strata_gate::cli::commands::contexts::{ContextsCommand, ContextsCommandHandler};
    use strata_gate::cli::commands::status::{StatusCommand, StatusCommandHandler};
    use strata_gate::cli::OutputFormat;
    use strata_gate::core::config::Config;
    use strata_gate::core::migration::MigrationId;
    use strata_gate::services::config_loader::ConfigLoader;
    use strata_gate::services::registry_loader::RegistryLoader;
    use tempfile::TempDir;

    const INIT: &str = "20260101000000_Init";
    const ADD_INDEXES: &str = "20260216044017_AddIndexes";

    const CONFIG: &str = r#"
version: "1.0"
dialect: sqlite
environments:
  development:
    database: data/app.db
contexts:
  AppDbContext:
    qualified_name: MyApp.Data.AppDbContext
    migrations_dir: migrations/app
  AuditContext:
    migrations:
      - 20260101000000_AuditInit
"#;

    /// テスト用のプロジェクトディレクトリを作成し、SQLiteに INIT まで適用済みの履歴を用意
    async fn setup_project() -> (TempDir, PathBuf) {
        sqlx::any::install_default_drivers();
        let temp_dir = TempDir::new().unwrap();
        let project_path = temp_dir.path().to_path_buf();

        fs::write(project_path.join(Config::DEFAULT_CONFIG_PATH), CONFIG).unwrap();

        let migrations_dir = project_path.join("migrations").join("app");
        fs::create_dir_all(migrations_dir.join(INIT)).unwrap();
        fs::create_dir_all(migrations_dir.join(ADD_INDEXES)).unwrap();

        // 空ファイルはSQLiteの空データベースとして開ける
        fs::create_dir_all(project_path.join("data")).unwrap();
        let db_path = project_path.join("data").join("app.db");
        fs::write(&db_path, "").unwrap();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();
        sqlx::raw_sql(&format!(
            "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY);
CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);
INSERT INTO schema_migrations (version) VALUES ('{}');",
            INIT
        ))
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        fs::write(
            project_path.join("add_indexes.sql"),
            format!(
                "CREATE INDEX ix_users_email ON users (email);
INSERT INTO schema_migrations (version) VALUES ('{}');",
                ADD_INDEXES
            ),
        )
        .unwrap();

        (temp_dir, project_path)
    }

    fn apply_command(project_path: &Path, base: &str, target: &str, dry_run: bool) -> ApplyCommand {
        ApplyCommand {
            project_path: project_path.to_path_buf(),
            config_path: None,
            input: ApplyInput::Inline {
                context: "AppDbContext".to_string(),
                base: base.to_string(),
                target: target.to_string(),
                sql_path: PathBuf::from("add_indexes.sql"),
                sha256: None,
                dry_run,
            },
            env: "development".to_string(),
            format: OutputFormat::Json,
        }
    }

    fn status_command(project_path: &Path) -> StatusCommand {
        StatusCommand {
            project_path: project_path.to_path_buf(),
            config_path: None,
            context: "MyApp.Data.AppDbContext".to_string(),
            env: "development".to_string(),
            format: OutputFormat::Json,
        }
    }

    /// 設定ファイルからレジストリを構築できる
    #[tokio::test]
    async fn test_registry_loader_registers_all_contexts() {
        let (_temp_dir, project_path) = setup_project().await;
        let config =
            ConfigLoader::from_file(&project_path.join(Config::DEFAULT_CONFIG_PATH)).unwrap();

        let registry = RegistryLoader::new()
            .load(&config, &project_path, "development")
            .await
            .unwrap();

        assert_eq!(registry.len(), 2);
        let app = registry.resolve("appdbcontext").unwrap();
        assert_eq!(app.qualified_name(), "MyApp.Data.AppDbContext");
        assert_eq!(
            app.provider().expected_sequence(),
            &[MigrationId::from(INIT), MigrationId::from(ADD_INDEXES)]
        );
        let audit = registry.resolve("AuditContext").unwrap();
        assert_eq!(audit.qualified_name(), "AuditContext");

        registry.close().await;
    }

    /// 接続先DBに到達できない場合は起動失敗
    #[tokio::test]
    async fn test_registry_loader_fails_when_database_unreachable() {
        let (_temp_dir, project_path) = setup_project().await;
        fs::remove_file(project_path.join("data").join("app.db")).unwrap();
        let config =
            ConfigLoader::from_file(&project_path.join(Config::DEFAULT_CONFIG_PATH)).unwrap();

        let result = RegistryLoader::new()
            .load(&config, &project_path, "development")
            .await;

        assert!(result.is_err());
    }

    /// 存在しない環境を指定すると失敗
    #[tokio::test]
    async fn test_registry_loader_unknown_environment() {
        let (_temp_dir, project_path) = setup_project().await;
        let config =
            ConfigLoader::from_file(&project_path.join(Config::DEFAULT_CONFIG_PATH)).unwrap();

        let err = RegistryLoader::new()
            .load(&config, &project_path, "production")
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("production"));
    }

    /// dry run → apply → status → 再送 の一連の流れ
    #[tokio::test]
    async fn test_apply_and_status_flow() {
        let (_temp_dir, project_path) = setup_project().await;
        let handler = ApplyCommandHandler::new();

        // dry run では履歴は変わらない
        let output = handler
            .execute(&apply_command(&project_path, INIT, ADD_INDEXES, true))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "DryRun OK. Validation passed.");

        let status = StatusCommandHandler::new()
            .execute(&status_command(&project_path))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&status).unwrap();
        assert_eq!(value["last_applied"], INIT);
        assert_eq!(value["pending"][0], ADD_INDEXES);

        // 適用
        let output = handler
            .execute(&apply_command(&project_path, INIT, ADD_INDEXES, false))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value["message"],
            format!("Committed. Now at '{}'.", ADD_INDEXES).as_str()
        );

        let status = StatusCommandHandler::new()
            .execute(&status_command(&project_path))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&status).unwrap();
        assert_eq!(value["last_applied"], ADD_INDEXES);
        assert_eq!(value["consistent"], true);
        assert!(value["pending"].as_array().unwrap().is_empty());

        // 再送は BaseMismatch でエラー終了
        let err = handler
            .execute(&apply_command(&project_path, INIT, ADD_INDEXES, false))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("BaseMismatch:"));
    }

    /// JSONの適用要求ファイルで申告ハッシュが異なる場合は IntegrityMismatch
    #[tokio::test]
    async fn test_apply_request_file_with_wrong_hash() {
        let (_temp_dir, project_path) = setup_project().await;
        let request = serde_json::json!({
            "context": "AppDbContext",
            "baseMigrationId": INIT,
            "targetMigrationId": ADD_INDEXES,
            "sql": "SELECT 1;",
            "sha256": "0000000000000000000000000000000000000000000000000000000000000000"
        });
        fs::write(project_path.join("request.json"), request.to_string()).unwrap();

        let err = ApplyCommandHandler::new()
            .execute(&ApplyCommand {
                project_path: project_path.clone(),
                config_path: None,
                input: ApplyInput::RequestFile(PathBuf::from("request.json")),
                env: "development".to_string(),
                format: OutputFormat::Json,
            })
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("IntegrityMismatch:"));
    }

    /// contextsコマンドは登録済みコンテキストを名前順に列挙する
    #[tokio::test]
    async fn test_contexts_command() {
        let (_temp_dir, project_path) = setup_project().await;

        let output = ContextsCommandHandler::new()
            .execute(&ContextsCommand {
                project_path: project_path.clone(),
                config_path: None,
                env: "development".to_string(),
                format: OutputFormat::Json,
            })
            .await
            .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        let contexts = value["contexts"].as_array().unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0]["name"], "AppDbContext");
        assert_eq!(contexts[0]["dialect"], "sqlite");
        assert_eq!(contexts[0]["migrations"], 2);
        assert_eq!(contexts[1]["name"], "AuditContext");
    }
}
