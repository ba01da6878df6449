///! dbadmin CLI
///!
///! Command-line client for the ERP database administration API

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use dbadmin_cli::api::ApiClient;
use dbadmin_cli::commands::{
    self, audit::AuditCommands, backup::BackupCommands, database::DatabaseCommands,
    migration::MigrationCommands, tenant::TenantCommands, Context,
};
use dbadmin_cli::config::Config;
use dbadmin_cli::logging::LoggingConfig;
use dbadmin_cli::output::{self, OutputFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// API server address (defaults to the config file value)
    #[arg(short, long, env = "DBADMIN_SERVER")]
    server: Option<String>,

    /// API base path
    #[arg(long)]
    base_path: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long)]
    output: Option<String>,

    /// Bearer token
    #[arg(long, env = "DBADMIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Config file (defaults to ~/.config/dbadmin/cli.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip confirmation prompts for destructive actions
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Also write JSON logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show system overview
    Stats,
    /// Manage backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Manage schema migrations
    Migration {
        #[command(subcommand)]
        command: MigrationCommands,
    },
    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },
    /// Audit log operations
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Browse database tables
    Db {
        #[command(subcommand)]
        command: DatabaseCommands,
    },
    /// Interactive shell with all panels
    Shell {
        /// Directory for downloads and exports
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show or save CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Save,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        file_dir: cli.log_dir.clone(),
        ..Default::default()
    }
    .verbose(cli.verbose);

    let _guard = match logging.init() {
        Ok(guard) => guard,
        Err(e) => {
            output::print_error(&format!("Failed to initialize logging: {:#}", e));
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Config file values overridden by flags and environment
fn effective_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&path)?;

    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(base_path) = &cli.base_path {
        config.base_path = base_path.clone();
    }
    if let Some(format) = &cli.output {
        config.default_output = format.clone();
    }
    if cli.token.is_some() {
        config.token = cli.token.clone();
    }

    Ok((config, path))
}

async fn run(cli: Cli) -> Result<()> {
    let (config, config_path) = effective_config(&cli)?;
    debug!(server = %config.server, base_path = %config.base_path, "using configuration");

    let client = ApiClient::new(&config.server, &config.base_path, config.timeout())?
        .with_token(config.token.clone());
    let ctx = Context::new(
        Arc::new(client),
        config.panel_options(),
        OutputFormat::parse(&config.default_output),
        cli.yes,
    );

    match cli.command {
        Commands::Stats => commands::stats::handle_stats_command(&ctx).await?,
        Commands::Backup { command } => {
            commands::backup::handle_backup_command(command, &ctx).await?
        }
        Commands::Migration { command } => {
            commands::migration::handle_migration_command(command, &ctx).await?
        }
        Commands::Tenant { command } => {
            commands::tenant::handle_tenant_command(command, &ctx).await?
        }
        Commands::Audit { command } => commands::audit::handle_audit_command(command, &ctx).await?,
        Commands::Db { command } => {
            commands::database::handle_database_command(command, &ctx).await?
        }
        Commands::Shell { dir } => commands::shell::run_shell(&ctx, dir).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let mut shown = config.clone();
                if shown.token.is_some() {
                    shown.token = Some("********".to_string());
                }
                println!("# {}", config_path.display());
                println!("{}", toml::to_string_pretty(&shown)?);
            }
            ConfigCommands::Save => {
                config.save_to(&config_path)?;
                output::print_success(&format!("Configuration saved to {}", config_path.display()));
            }
        },
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
