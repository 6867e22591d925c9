//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strip release tags from MKV metadata and attach external subtitles.
#[derive(Parser, Debug)]
#[command(name = "tagsweep", version, about, long_about = None)]
pub struct Cli {
    /// Path to the key-value configuration file.
    #[arg(short, long, default_value = ".env", env = "TAGSWEEP_CONFIG", global = true)]
    pub config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Never prompt; fail when a required value is missing.
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Exit with status 1 when any file or group failed.
    #[arg(long, global = true)]
    pub strict_exit: bool,

    /// Operation to run. Without one, an interactive menu asks.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Strip keywords from track names, the title and attachments.
    Rewrite(RewriteArgs),

    /// Mux subtitle files into the videos they belong to.
    Attach(AttachArgs),

    /// Display the resolved configuration.
    #[command(name = "config-show")]
    ConfigShow,

    /// Validate the configuration file without touching any media.
    #[command(name = "config-validate")]
    ConfigValidate,
}

/// Arguments for the rewrite subcommand.
#[derive(Args, Debug, Default)]
pub struct RewriteArgs {
    /// Directory holding the MKV files.
    pub dir: Option<PathBuf>,

    /// Text that replaces matched keywords (empty deletes them).
    #[arg(long)]
    pub replacement: Option<String>,

    /// Leave attachments alone even if their names match.
    #[arg(long)]
    pub keep_attachments: bool,
}

/// Arguments for the attach subcommand.
#[derive(Args, Debug, Default)]
pub struct AttachArgs {
    /// Directory holding the videos (and optionally a `subs` folder).
    pub dir: Option<PathBuf>,

    /// Delete subtitle files after a successful mux.
    #[arg(long, conflicts_with = "keep_subs")]
    pub delete_subs: bool,

    /// Keep subtitle files after a successful mux.
    #[arg(long)]
    pub keep_subs: bool,

    /// ISO 639-1 code of the language whose track becomes default.
    #[arg(long)]
    pub default_language: Option<String>,
}

impl AttachArgs {
    /// Deletion policy given on the command line, if any.
    pub fn delete_policy(&self) -> Option<bool> {
        match (self.delete_subs, self.keep_subs) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["tagsweep"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn rewrite_accepts_empty_replacement() {
        let args = ["tagsweep", "-vv", "rewrite", "/media", "--replacement", ""];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Some(Commands::Rewrite(args)) => {
                assert_eq!(args.dir, Some(PathBuf::from("/media")));
                assert_eq!(args.replacement.as_deref(), Some(""));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn attach_delete_flags_conflict() {
        let both = ["tagsweep", "attach", "--delete-subs", "--keep-subs"];
        assert!(Cli::try_parse_from(both).is_err());

        let keep = ["tagsweep", "attach", "--keep-subs", "--no-prompt"];
        let cli = Cli::try_parse_from(keep).unwrap();
        assert!(cli.no_prompt);
        match cli.command {
            Some(Commands::Attach(args)) => assert_eq!(args.delete_policy(), Some(false)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
