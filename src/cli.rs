// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use crate::core::naming::DEFAULT_ENVIRONMENT;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// Strata Gate - Guarded migration script applier
///
/// Applies one pre-generated migration script to a target database,
/// only when the database is exactly at the declared base migration.
#[derive(Parser, Debug)]
#[command(name = "strata-gate")]
#[command(author = "Strata Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Guarded migration script applier")]
#[command(long_about = "Strata Gate - Guarded migration script applier

Applies a single pre-generated migration script (base -> target) to a
target database inside one transaction.

Before executing, Strata Gate:
  • Verifies the SHA-256 of the script
  • Rejects scripts containing batch separator lines (GO)
  • Checks the applied history is a prefix of the known migrations
  • Checks the database is exactly at the declared base migration

After executing, the history is re-read inside the transaction and the
change is committed only if the target migration is now the last one.

Supported databases: PostgreSQL, MySQL, SQLite")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Describe contexts in .strata-gate.yaml
  2. Compute the script hash:       strata-gate hash --sql up.sql
  3. Validate without applying:     strata-gate apply --context AppDbContext --base <ID> --target <ID> --sql up.sql --dry-run
  4. Apply:                         strata-gate apply --context AppDbContext --base <ID> --target <ID> --sql up.sql
  5. Check the history:             strata-gate status --context AppDbContext

For detailed help on each command, use: strata-gate <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply one migration script (base -> target)
    ///
    /// Verifies integrity and history, then executes the script in a single
    /// transaction and commits only if the target migration is recorded.
    ///
    /// EXAMPLES:
    ///   # Apply the next migration
    ///   strata-gate apply --context AppDbContext --base 20260101000000_Init \
    ///     --target 20260216044017_AddIndexes --sql up.sql
    ///
    ///   # Validate only
    ///   strata-gate apply --context AppDbContext --base 20260101000000_Init \
    ///     --target 20260216044017_AddIndexes --sql up.sql --dry-run
    ///
    ///   # Submit a JSON request
    ///   strata-gate apply --request request.json --env production
    Apply {
        /// Apply request JSON file (context, baseMigrationId, targetMigrationId, sql, sha256, dryRun)
        #[arg(
            long,
            value_name = "FILE",
            conflicts_with_all = ["context", "base", "target", "sql", "sha256", "dry_run"]
        )]
        request: Option<PathBuf>,

        /// Context name (short or qualified)
        #[arg(long, value_name = "NAME", required_unless_present = "request")]
        context: Option<String>,

        /// Migration the database must currently be at
        #[arg(long, value_name = "ID", required_unless_present = "request")]
        base: Option<String>,

        /// Migration the database will be at after the script
        #[arg(long, value_name = "ID", required_unless_present = "request")]
        target: Option<String>,

        /// Migration script file
        #[arg(long, value_name = "FILE", required_unless_present = "request")]
        sql: Option<PathBuf>,

        /// Expected SHA-256 of the script (computed from the file if omitted)
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,

        /// Validate only, do not touch the database
        #[arg(long)]
        dry_run: bool,

        /// Target environment (used by contexts without an explicit environment)
        #[arg(short, long, value_name = "ENV", default_value = DEFAULT_ENVIRONMENT)]
        env: String,
    },

    /// Print the SHA-256 of a migration script
    ///
    /// EXAMPLES:
    ///   strata-gate hash --sql up.sql
    Hash {
        /// Migration script file
        #[arg(long, value_name = "FILE")]
        sql: PathBuf,
    },

    /// Show migration history of a context
    ///
    /// Compares the applied history in the database with the known
    /// migrations and shows the last applied and pending migrations.
    ///
    /// EXAMPLES:
    ///   strata-gate status --context AppDbContext
    ///   strata-gate status --context AppDbContext --env production
    Status {
        /// Context name (short or qualified)
        #[arg(long, value_name = "NAME")]
        context: String,

        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = DEFAULT_ENVIRONMENT)]
        env: String,
    },

    /// List registered contexts
    ///
    /// EXAMPLES:
    ///   strata-gate contexts
    Contexts {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = DEFAULT_ENVIRONMENT)]
        env: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_requires_script_arguments_without_request() {
        let result = Cli::try_parse_from(["strata-gate", "apply", "--context", "AppDbContext"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_request_conflicts_with_inline_arguments() {
        let result = Cli::try_parse_from([
            "strata-gate",
            "apply",
            "--request",
            "request.json",
            "--context",
            "AppDbContext",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_apply_inline() {
        let cli = Cli::try_parse_from([
            "strata-gate",
            "--format",
            "json",
            "apply",
            "--context",
            "AppDbContext",
            "--base",
            "20260101000000_Init",
            "--target",
            "20260216044017_AddIndexes",
            "--sql",
            "up.sql",
            "--dry-run",
        ])
        .unwrap();

        assert!(matches!(cli.format, OutputFormat::Json));
        match cli.command {
            Commands::Apply {
                request,
                context,
                base,
                dry_run,
                env,
                ..
            } => {
                assert!(request.is_none());
                assert_eq!(context.as_deref(), Some("AppDbContext"));
                assert_eq!(base.as_deref(), Some("20260101000000_Init"));
                assert!(dry_run);
                assert_eq!(env, "development");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
