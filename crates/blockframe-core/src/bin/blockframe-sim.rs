//! `blockframe-sim`: replay embedding scenarios against a headless host

use anyhow::Context;
use blockframe_core::logging;
use blockframe_core::scenario::{replay, Scenario};
use blockframe_core::EmbedConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    Command::new("blockframe-sim")
        .version(blockframe_core::VERSION)
        .about("Replay block embedding scenarios against a headless host")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a timed scenario and print the resulting timeline")
                .arg(
                    Arg::new("scenario")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Scenario JSON file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<EmbedConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => EmbedConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(EmbedConfig::default()),
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = load_config(matches)?;

    match matches.subcommand() {
        Some(("replay", args)) => {
            logging::init(&config.logging).context("initializing logging")?;

            let path = args
                .get_one::<PathBuf>("scenario")
                .context("missing scenario path")?;
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            let scenario = Scenario::from_json(&raw)?;
            let report = replay(&scenario, config)?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            Ok(if report.rejected.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("config", _)) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
