// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use folio::cli::{self, USAGE};
use folio::config::{Config, StorageBackend, ValidatedConfig};
use folio::runtime_paths::RuntimePaths;
use folio::service::ContentService;
use log::{LevelFilter, debug};
use std::io::Write;
use std::path::PathBuf;

struct ParsedArgs {
    runtime_root: PathBuf,
    tokens: Vec<String>,
    help: bool,
}

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed = match parse_args_from(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("{}", USAGE);
            return 2;
        }
    };
    if parsed.help {
        print!("{}", USAGE);
        return 0;
    }

    let command = match cli::parse_command(&parsed.tokens) {
        Ok(command) => command,
        Err(error) => {
            eprintln!("❌ {}", error);
            eprintln!("{}", USAGE);
            return error.exit_code();
        }
    };

    let runtime_paths = match RuntimePaths::from_root(&parsed.runtime_root) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("❌ {}", error);
            return 1;
        }
    };
    let config = match Config::load_and_validate(&runtime_paths.root) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("❌ Failed to load configuration: {}", error);
            return 1;
        }
    };

    if let Err(error) = check_cli_backend(&config) {
        eprintln!("❌ {}", error);
        return 1;
    }

    if let Err(error) = init_logging(config.log_level) {
        eprintln!("❌ Failed to initialize logger: {}", error);
        return 1;
    }
    log_startup_info(&config, &runtime_paths);

    let service = ContentService::from_config(&runtime_paths, &config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = cli::execute(command, &service, &mut out);
    let _ = out.flush();
    match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("❌ {}", error);
            error.exit_code()
        }
    }
}

/// Every command is its own process, so a memory backend would start empty each time.
fn check_cli_backend(config: &ValidatedConfig) -> Result<(), String> {
    match config.storage.backend {
        StorageBackend::Filesystem => Ok(()),
        StorageBackend::Memory => Err(
            "storage.backend 'memory' keeps nothing between commands; use 'filesystem'"
                .to_string(),
        ),
    }
}

fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    // stdout carries command output; logs go to stderr. RUST_LOG overrides the config level.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
}

fn log_startup_info(config: &ValidatedConfig, runtime_paths: &RuntimePaths) {
    debug!("Runtime root: {}", runtime_paths.root.display());
    debug!(
        "Storage: {:?} backend, inline threshold {} bytes",
        config.storage.backend, config.storage.inline_threshold_bytes
    );
    debug!("Static files: {}", runtime_paths.static_dir.display());
    debug!("Templates: {}", runtime_paths.templates_dir.display());
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");
    let mut tokens = Vec::new();
    let mut help = false;

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else if is_help_flag(&arg) {
            help = true;
        } else {
            tokens.push(arg);
        }
    }

    if tokens.is_empty() || (tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("help")) {
        help = true;
    }

    Ok(ParsedArgs {
        runtime_root: make_runtime_root_absolute(runtime_root)?,
        tokens,
        help,
    })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(runtime_root: PathBuf) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}

#[cfg(test)]
mod tests {
    use super::{check_cli_backend, parse_args_from};
    use folio::config::{StorageBackend, ValidatedConfig};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_command_means_help() {
        let parsed = parse_args_from(Vec::new()).expect("parse args");
        assert!(parsed.help);
        assert!(parsed.runtime_root.is_absolute());
    }

    #[test]
    fn runtime_root_can_appear_anywhere() {
        let parsed = parse_args_from(args(&["list", "-C", "runtime", "--json"])).expect("parse args");
        assert!(!parsed.help);
        assert!(parsed.runtime_root.ends_with("runtime"));
        assert_eq!(parsed.tokens, args(&["list", "--json"]));
    }

    #[test]
    fn missing_root_value_is_an_error() {
        assert!(parse_args_from(args(&["-C"])).is_err());
    }

    #[test]
    fn memory_backend_is_refused() {
        let mut config = ValidatedConfig::default();
        assert!(check_cli_backend(&config).is_ok());
        config.storage.backend = StorageBackend::Memory;
        assert!(check_cli_backend(&config).unwrap_err().contains("memory"));
    }
}
