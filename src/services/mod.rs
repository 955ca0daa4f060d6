// Services Layer
// 適用要求の検証・実行と、起動時の構築処理を担うサービス層

pub mod apply_handler;
pub mod config_loader;
pub mod context_registry;
pub mod database_config_resolver;
pub mod history_validator;
pub mod migration_executor;
pub mod registry_loader;
pub mod script_integrity;
pub mod script_screener;
pub mod sequence_provider;
