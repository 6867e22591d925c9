//! tagsweep - strips release-group keywords from MKV metadata and attaches
//! external subtitles, driven by mkvtoolnix.
//!
//! The decision logic (keyword matching, subtitle grouping, mux planning)
//! is pure and lives in [`matcher`], [`media`] and [`pipeline`]; the
//! [`tools`] module is the only place that runs external programs.

pub mod cli;
pub mod config;
pub mod error;
pub mod matcher;
pub mod media;
pub mod pipeline;
pub mod prompt;
pub mod tools;
pub mod validation;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{AttachArgs, Cli, Commands, RewriteArgs};
use crate::config::{AppConfig, ConfigManager, Operation};
use crate::error::ConfigError;
use crate::media::language::{self, LanguagePolicy};
use crate::pipeline::{AttachOptions, RewriteOptions, RunSummary};
use crate::prompt::Prompter;
use crate::tools::{MkvTool, MkvToolnix};
use crate::validation::paths::is_valid_directory;
use crate::validation::ToolCapabilities;

type TerminalPrompter = Prompter<io::StdinLock<'static>, io::Stdout>;

/// Runs tagsweep with the provided CLI arguments.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    setup_logging(cli.log_level(), cli.json_logs)?;

    match &cli.command {
        Some(Commands::ConfigShow) => show_config(&cli.config),
        Some(Commands::ConfigValidate) => validate_config(&cli.config),
        _ => run_pipeline(&cli).await,
    }
}

/// Initializes the tracing subscriber; logs go to stderr.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_writer(io::stderr);

    let installed = if json {
        builder
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.with_target(false).try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

/// Loads the configuration, resolves missing values and runs one pipeline.
async fn run_pipeline(cli: &Cli) -> Result<ExitCode> {
    let manager = ConfigManager::load(&cli.config)?;
    let config = manager.config();
    info!(config = %manager.config_path().display(), "Configuration loaded and validated");

    let interactive = !cli.no_prompt && io::stdin().is_terminal();
    let mut prompter = interactive.then(Prompter::stdio);

    let operation = match &cli.command {
        Some(Commands::Rewrite(_)) => Operation::Rewrite,
        Some(Commands::Attach(_)) => Operation::Attach,
        _ => resolve("OPTION", None, config.option, prompter.as_mut(), |p| p.operation())?,
    };

    let summary = match (&cli.command, operation) {
        (Some(Commands::Rewrite(args)), _) => run_rewrite(&manager, args, prompter.as_mut()).await?,
        (Some(Commands::Attach(args)), _) => run_attach(config, args, prompter.as_mut()).await?,
        (_, Operation::Rewrite) => {
            run_rewrite(&manager, &RewriteArgs::default(), prompter.as_mut()).await?
        }
        (_, Operation::Attach) => {
            run_attach(config, &AttachArgs::default(), prompter.as_mut()).await?
        }
    };

    println!("\n{}", summary);
    info!(?summary, "Run finished");

    if cli.strict_exit && summary.has_failures() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_rewrite(
    manager: &ConfigManager,
    args: &RewriteArgs,
    mut prompter: Option<&mut TerminalPrompter>,
) -> Result<RunSummary> {
    let config = manager.config();
    let keywords = manager.keywords()?;

    let required = [MkvTool::Mkvinfo, MkvTool::Mkvmerge, MkvTool::Mkvpropedit];
    detect_tools(config, &required)?;

    let dir = resolve_dir(args.dir.clone(), config, prompter.as_deref_mut())?;
    let replacement = match resolve(
        "REPLACEMENT",
        args.replacement.clone(),
        config.replacement.clone(),
        prompter,
        |p| p.replacement(),
    ) {
        Ok(replacement) => replacement,
        Err(e) if is_missing_value(&e) => String::new(),
        Err(e) => return Err(e),
    };

    let options = RewriteOptions {
        replacement,
        remove_attachments: config.rewrite.remove_attachments && !args.keep_attachments,
        strip_empty_brackets: config.rewrite.strip_empty_brackets,
    };

    info!(
        dir = %dir.display(),
        keywords = keywords.len(),
        replacement = %options.replacement,
        "Starting metadata rewrite"
    );

    let tool = MkvToolnix::new(config.tools.clone(), config.labels.clone());
    Ok(pipeline::rewrite_directory(&tool, &dir, &keywords, &options).await?)
}

async fn run_attach(
    config: &AppConfig,
    args: &AttachArgs,
    mut prompter: Option<&mut TerminalPrompter>,
) -> Result<RunSummary> {
    detect_tools(config, &[MkvTool::Mkvmerge])?;

    let code = args
        .default_language
        .as_deref()
        .unwrap_or(&config.subtitles.default_language);
    let default_language = language::from_code(code).ok_or_else(|| ConfigError::Invalid {
        key: "DEFAULT_SUB_LANGUAGE".to_string(),
        message: format!("'{}' is not an ISO 639-1 language code", code),
    })?;

    let policy = LanguagePolicy::from_codes(&config.subtitles.languages);
    if !config
        .subtitles
        .languages
        .iter()
        .any(|c| language::from_code(c) == Some(default_language))
    {
        warn!(
            language = code,
            "Default subtitle language is not in SUB_LANGUAGES; no track will be default"
        );
    }

    let dir = resolve_dir(args.dir.clone(), config, prompter.as_deref_mut())?;
    let delete_subs = match resolve(
        "DELETE_SUBS",
        args.delete_policy(),
        config.delete_subs,
        prompter,
        |p| p.delete_subs(),
    ) {
        Ok(delete) => delete,
        Err(e) if is_missing_value(&e) => true,
        Err(e) => return Err(e),
    };

    let options = AttachOptions {
        delete_subs,
        policy,
        default_language,
        default_track_name: config
            .subtitles
            .default_track_name
            .clone()
            .unwrap_or_else(|| language::track_display_name(default_language)),
    };

    info!(
        dir = %dir.display(),
        delete_subs,
        default_language = code,
        "Starting subtitle attach"
    );

    let muxer = MkvToolnix::new(config.tools.clone(), config.labels.clone());
    Ok(pipeline::attach_directory(&muxer, &dir, &options).await?)
}

/// Picks a value from the command line, then the configuration, then a prompt.
fn resolve<T, F>(
    key: &str,
    cli: Option<T>,
    configured: Option<T>,
    prompter: Option<&mut TerminalPrompter>,
    ask: F,
) -> Result<T>
where
    F: FnOnce(&mut TerminalPrompter) -> io::Result<T>,
{
    if let Some(value) = cli.or(configured) {
        return Ok(value);
    }

    match prompter {
        Some(p) => ask(p).with_context(|| format!("Failed to read {} from the terminal", key)),
        None => Err(ConfigError::MissingValue { key: key.to_string() }.into()),
    }
}

fn resolve_dir(
    cli: Option<PathBuf>,
    config: &AppConfig,
    prompter: Option<&mut TerminalPrompter>,
) -> Result<PathBuf> {
    if let Some(dir) = &cli {
        if !is_valid_directory(dir) {
            return Err(ConfigError::Invalid {
                key: "DIR_PATH".to_string(),
                message: format!("'{}' is not a readable directory", dir.display()),
            }
            .into());
        }
    }

    resolve("DIR_PATH", cli, config.dir_path.clone(), prompter, |p| p.directory())
}

fn is_missing_value(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::MissingValue { .. }))
}

/// Probes the required tools; any failure aborts before files are touched.
fn detect_tools(config: &AppConfig, required: &[MkvTool]) -> Result<()> {
    let capabilities = ToolCapabilities::detect(&config.tools, required)
        .context("mkvtoolnix is required; install it or set MKVMERGE/MKVINFO/MKVPROPEDIT")?;

    for (tool, version) in &capabilities.versions {
        info!(%tool, %version, "Found tool");
    }
    Ok(())
}

/// Validates the configuration file and prints the report.
fn validate_config(config_path: &Path) -> Result<ExitCode> {
    let values = config::loader::load_values(config_path)?;
    let result = validation::validate_config(&values);

    println!("{}", validation::report::format_report(&result));

    if result.is_valid() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Displays the resolved configuration.
fn show_config(config_path: &Path) -> Result<ExitCode> {
    let manager = ConfigManager::load(config_path)?;
    let yaml = serde_yaml::to_string(manager.config())?;
    println!("{}", yaml);
    Ok(ExitCode::SUCCESS)
}
