use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use roo_task_man::cli::{
    handle_backup_command, handle_config_command, handle_delete_command, handle_dump_command,
    handle_export_command, handle_import_command, handle_inspect_command, handle_list_command,
    handle_show_command, BackupCommands, ExportCommands,
};
use roo_task_man::config::settings::default_settings_file;
use roo_task_man::config::{EditorPaths, Settings, SettingsOverrides};

#[derive(Parser)]
#[command(
    name = "roo-task-man",
    version,
    about = "Export, import and register Roo Code tasks",
    long_about = "roo-task-man packs Roo Code task folders into portable zip archives, \
                  imports them on another machine, and registers them in the editor's \
                  state database so they show up in the task history."
)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, env = "ROO_TASK_MAN_CONFIG")]
    config: Option<PathBuf>,

    /// Extension identifier (default: RooVeterinaryInc.roo-cline)
    #[arg(long, global = true)]
    plugin_id: Option<String>,

    /// Editor channel: code, insiders, vscodium, cursor, windsurf, trae, custom
    #[arg(long, visible_alias = "editor", global = true)]
    code_channel: Option<String>,

    /// Task storage root, overriding the editor's global storage
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory containing decorator hooks
    #[arg(long, global = true)]
    hooks_dir: Option<PathBuf>,

    /// Default directory for exported archives
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks, newest first
    #[command(alias = "ls")]
    List,

    /// Show details for one task
    Show {
        /// Task ID
        id: String,
    },

    /// Delete a task directory
    Delete {
        /// Task ID
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export tasks to zip archives
    #[command(subcommand)]
    Export(ExportCommands),

    /// Import an archive and register its tasks with the editor
    Import {
        /// Archive to import
        zip: PathBuf,

        /// Workspace recorded for the imported tasks (default: current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Only extract files; leave the editor state untouched
        #[arg(long)]
        no_register: bool,
    },

    /// List the tasks in an archive without extracting it
    Inspect {
        /// Archive to inspect
        zip: PathBuf,
    },

    /// Write task titles and prompts as markdown
    Dump {
        /// Output markdown file
        file: PathBuf,

        /// Comma separated task IDs
        #[arg(long)]
        ids: Option<String>,

        /// Creation date range, FROM..TO (YYYY-MM-DD or YYYYMMDD)
        #[arg(long)]
        date_range: Option<String>,
    },

    /// State database backup commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Show current configuration and paths
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "warn,roo_task_man=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = cli.config.clone().unwrap_or_else(default_settings_file);
    let (mut settings, load_error) = match Settings::load_or_default(&config_file) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    settings.apply_overrides(SettingsOverrides {
        plugin_id: cli.plugin_id,
        code_channel: cli.code_channel,
        data_dir: cli.data_dir,
        hooks_dir: cli.hooks_dir,
        export_dir: cli.export_dir,
        debug: cli.debug,
    });

    init_logging(settings.debug);
    if let Some(e) = load_error {
        tracing::warn!(file = %config_file.display(), error = %e, "using default settings");
    }

    let paths = EditorPaths::from_settings(&settings).context("failed to resolve editor paths")?;

    match cli.command {
        Commands::List => handle_list_command(&paths, &settings)?,
        Commands::Show { id } => handle_show_command(&paths, &settings, &id)?,
        Commands::Delete { id, force } => handle_delete_command(&paths, &id, force)?,
        Commands::Export(cmd) => handle_export_command(&paths, &settings, cmd)?,
        Commands::Import {
            zip,
            workspace,
            no_register,
        } => handle_import_command(&paths, &settings, &zip, workspace, no_register)?,
        Commands::Inspect { zip } => handle_inspect_command(&zip)?,
        Commands::Dump {
            file,
            ids,
            date_range,
        } => handle_dump_command(&paths, &settings, &file, ids.as_deref(), date_range.as_deref())?,
        Commands::Backup(cmd) => handle_backup_command(&paths, &settings, cmd)?,
        Commands::Config { save } => handle_config_command(&paths, &settings, &config_file, save)?,
    }

    Ok(())
}
