use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use std::env;
use std::path::PathBuf;
use std::process;
use strata_gate::cli::commands::apply::{ApplyCommand, ApplyCommandHandler, ApplyInput};
use strata_gate::cli::commands::contexts::{ContextsCommand, ContextsCommandHandler};
use strata_gate::cli::commands::hash::{HashCommand, HashCommandHandler};
use strata_gate::cli::commands::status::{StatusCommand, StatusCommandHandler};
use strata_gate::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化（標準エラー出力）
///
/// RUST_LOG が未設定の場合は warn、--verbose 指定時は debug。
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    match cli.command {
        Commands::Apply {
            request,
            context,
            base,
            target,
            sql,
            sha256,
            dry_run,
            env,
        } => {
            let input = match request {
                Some(path) => ApplyInput::RequestFile(path),
                None => ApplyInput::Inline {
                    context: context.context("--context is required")?,
                    base: base.context("--base is required")?,
                    target: target.context("--target is required")?,
                    sql_path: sql.context("--sql is required")?,
                    sha256,
                    dry_run,
                },
            };
            let handler = ApplyCommandHandler::new();
            let command = ApplyCommand {
                project_path,
                config_path,
                input,
                env,
                format: cli.format,
            };
            handler.execute(&command).await
        }

        Commands::Hash { sql } => {
            let handler = HashCommandHandler::new();
            let command = HashCommand {
                sql_path: sql,
                format: cli.format,
            };
            handler.execute(&command)
        }

        Commands::Status { context, env } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                project_path,
                config_path,
                context,
                env,
                format: cli.format,
            };
            handler.execute(&command).await
        }

        Commands::Contexts { env } => {
            let handler = ContextsCommandHandler::new();
            let command = ContextsCommand {
                project_path,
                config_path,
                env,
                format: cli.format,
            };
            handler.execute(&command).await
        }
    }
}
