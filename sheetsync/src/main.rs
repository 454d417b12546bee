use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use sheetsync_core::remote::SheetsApiClient;
use sheetsync_core::state::TOKEN_ENV;
use sheetsync_core::{
    BatchReport, CalamineReader, Credentials, FolderCache, Session, SyncConfig, rehearsal_client,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

mod formatter;

/// Environment variable naming the folder that holds the task file
const FOLDER_ENV: &str = "SHEETSYNC_FOLDER";

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(
    about = "Copy spreadsheet ranges into Google Sheets tabs from a task table",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Folder holding the task file and the source workbooks (remembered for later runs)
    #[arg(short = 'd', long, value_name = "DIR")]
    folder: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Task file name inside the folder
    #[arg(short, long, value_name = "NAME")]
    task_file: Option<String>,

    /// Credential file to install before running: a service-account key or
    /// a JSON object with an "access_token"
    #[arg(long, value_name = "FILE")]
    credentials: Option<PathBuf>,

    /// Plan and read every source but write to an in-memory copy of the destinations
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(name) = &cli.task_file {
        config.task_table.file_name = name.clone();
    }

    let cache = FolderCache::new(&config.state.folder_cache);
    let Some(folder) = resolve_folder(cli.folder.clone(), &cache)? else {
        println!("No folder selected. Exiting...");
        return Ok(());
    };
    info!("Using folder {}", folder.display());

    let session = Session::new(config, folder);
    let report = if cli.dry_run {
        rehearse(&session)?
    } else {
        run_remote(&session, cli.credentials.as_deref())?
    };

    match cli.format {
        OutputFormat::Human => formatter::print_human(&report, cli.dry_run),
        OutputFormat::Json => formatter::print_json(&report, cli.dry_run)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let config = if let Some(config_path) = path {
        SyncConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Fall back to sheetsync.toml in the working directory
        let default_config_path = PathBuf::from("sheetsync.toml");
        if default_config_path.exists() {
            SyncConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            SyncConfig::default()
        }
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// `--folder`, then the environment, then the cache file, then a prompt
fn resolve_folder(cli_folder: Option<PathBuf>, cache: &FolderCache) -> Result<Option<PathBuf>> {
    if let Some(folder) = cli_folder {
        cache.store(&folder)?;
        return Ok(Some(folder));
    }

    if let Some(folder) = std::env::var_os(FOLDER_ENV).filter(|v| !v.is_empty()) {
        debug!("Folder taken from {FOLDER_ENV}");
        return Ok(Some(PathBuf::from(folder)));
    }

    if let Some(folder) = cache.load()? {
        debug!("Folder taken from {}", cache.path().display());
        return Ok(Some(folder));
    }

    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let answer = dialoguer::Input::<String>::new()
        .with_prompt("Folder containing the task file")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read folder from the terminal")?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    let folder = PathBuf::from(answer);
    if !folder.is_dir() {
        anyhow::bail!("Not a directory: {}", folder.display());
    }
    cache.store(&folder)?;
    Ok(Some(folder))
}

fn run_remote(session: &Session, install_from: Option<&Path>) -> Result<BatchReport> {
    let state = &session.config().state;
    if let Some(source) = install_from {
        Credentials::install(source, &state.credentials)?;
    }

    let credentials = Credentials::load(&state.credentials, std::env::var(TOKEN_ENV).ok())
        .context("No usable credentials")?;
    if let Credentials::ServiceAccount(key) = &credentials {
        info!("Signing in as {}", key.client_email);
    }
    let client = SheetsApiClient::new(&session.config().remote, credentials)
        .context("Failed to build the Sheets API client")?;

    session
        .run(&CalamineReader, &client)
        .with_context(|| format!("Failed to run {}", session.task_file().display()))
}

fn rehearse(session: &Session) -> Result<BatchReport> {
    let table = session
        .load_table(&CalamineReader)
        .with_context(|| format!("Failed to run {}", session.task_file().display()))?;
    let plan = session.plan(&table);
    let client = rehearsal_client(&plan);

    session
        .run_plan(table.path, plan, &CalamineReader, &client)
        .context("Dry run failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["sheetsync", "-d", "/data", "--dry-run", "-vv", "-f", "json"]);
        assert_eq!(cli.folder, Some(PathBuf::from("/data")));
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_folder_argument_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FolderCache::new(dir.path().join("xlFile.txt"));

        let folder = resolve_folder(Some(dir.path().to_path_buf()), &cache).unwrap();
        assert_eq!(folder.as_deref(), Some(dir.path()));
        assert_eq!(cache.load().unwrap().as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/sheetsync.toml"))).is_err());
    }
}
