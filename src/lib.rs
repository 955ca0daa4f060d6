// Strata Gateライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: ドメインモデル（マイグレーションID、適用要求、設定、エラー）
// - adapters: 対象データベースへのアクセス（接続、履歴テーブル）
// - services: 整合性検証・安全性スクリーニング・履歴検証・実行・適用ハンドラー

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
