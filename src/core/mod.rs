// Core Domain
// マイグレーション適用の型定義・設定・エラー・命名の純粋なドメイン層

pub mod config;
pub mod error;
pub mod migration;
pub mod naming;
