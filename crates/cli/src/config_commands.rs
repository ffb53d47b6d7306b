use {anyhow::Result, clap::Subcommand};

use linebot_config::{LineBotConfig, Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the resolved configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the resolved configuration with credentials redacted.
    Show,
    /// Print the user config directory.
    Path,
}

pub fn handle_config(action: ConfigAction, config: &LineBotConfig) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config, verbose),
        ConfigAction::Show => show(config),
        ConfigAction::Path => {
            match linebot_config::config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => eprintln!("no home directory; only ./linebot.toml is searched"),
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &LineBotConfig, verbose: bool) -> Result<()> {
    let result = config.validate();

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

fn show(config: &LineBotConfig) -> Result<()> {
    let mut value = serde_json::to_value(config)?;
    if let Some(channel) = value.get_mut("channel").and_then(|c| c.as_object_mut()) {
        for secret in channel.values_mut() {
            *secret = serde_json::Value::String("[REDACTED]".into());
        }
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
