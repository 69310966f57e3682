// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `stackrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stackrun",
    version,
    about = "Run infrastructure deployment tools and report their progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Stackrun.toml` in the current working directory. A missing
    /// default file means built-in defaults; an explicit path must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STACKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log every output line instead of drawing a progress bar.
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the deployment tool with arbitrary arguments in one directory.
    Exec {
        /// Working directory of the process.
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,

        /// Directory to delete once the process is done.
        #[arg(long, value_name = "DIR")]
        scratch: Option<PathBuf>,

        /// Label attached to every progress event.
        #[arg(long, value_name = "NAME", default_value = "")]
        name: String,

        /// Arguments passed to the tool.
        #[arg(last = true, required = true)]
        args: Vec<String>,
    },

    /// Deploy every stack of one or more apps concurrently.
    Deploy(AppArgs),

    /// Destroy every stack of one or more apps concurrently.
    Destroy(AppArgs),

    /// Bootstrap the toolkit stack for one app.
    Bootstrap {
        #[arg(long, value_name = "DIR")]
        app_dir: PathBuf,

        #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },

    /// Clear the tool's cached context of one app.
    ClearContext {
        #[arg(long, value_name = "DIR")]
        app_dir: PathBuf,
    },

    /// Print the flattened outputs of a deployment outputs file.
    Outputs {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AppArgs {
    /// App directory; repeat to run several apps at once.
    #[arg(long = "app-dir", value_name = "DIR", required = true)]
    pub app_dirs: Vec<PathBuf>,

    /// Context entry passed to every run as `-c KEY=VALUE`.
    #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_collects_trailing_args() {
        let args = CliArgs::try_parse_from([
            "stackrun", "exec", "--dir", "/app", "--name", "ctx", "--", "deploy", "--all",
        ])
        .unwrap();

        match args.command {
            Command::Exec { dir, name, args, scratch } => {
                assert_eq!(dir, PathBuf::from("/app"));
                assert_eq!(name, "ctx");
                assert_eq!(args, vec!["deploy", "--all"]);
                assert!(scratch.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn deploy_accepts_several_apps_and_context() {
        let args = CliArgs::try_parse_from([
            "stackrun", "--verbose", "deploy", "--app-dir", "a", "--app-dir", "b", "-c",
            "k=v",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Deploy(app) => {
                assert_eq!(app.app_dirs.len(), 2);
                assert_eq!(app.context, vec!["k=v"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn deploy_requires_an_app_dir() {
        assert!(CliArgs::try_parse_from(["stackrun", "deploy"]).is_err());
    }
}
