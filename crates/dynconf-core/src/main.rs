//! `dynconf` command-line reconciler

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dynconf_core::{ConfigTree, Plan, Reconciler, ReconcilerConfig, StaticInfo};
use dynconf_model::{flatten, without_index_markers};
use dynconf_schema::base_version;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Exit status when the plan needs a restart
const EXIT_RESTART: u8 = 2;

fn schema_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("schemas")
            .long("schemas")
            .value_parser(value_parser!(PathBuf))
            .help("Directory of <version>.json schema files (overrides config)"),
    )
    .arg(
        Arg::new("version")
            .long("version")
            .required(true)
            .help("Server build version of the node"),
    )
    .arg(
        Arg::new("desired")
            .long("desired")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Desired configuration (YAML or JSON)"),
    )
    .arg(
        Arg::new("current")
            .long("current")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Current node configuration (YAML or JSON)"),
    )
}

fn cli() -> Command {
    Command::new("dynconf")
        .version(dynconf_core::VERSION)
        .about("Reconcile desired node configuration into dynamic set-config commands")
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Reconciler configuration file (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v debug, -vv trace)"),
        )
        .subcommand(
            Command::new("flatten")
                .about("Print the flat keys of a configuration file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration file (YAML or JSON)"),
                ),
        )
        .subcommand(
            Command::new("version")
                .about("Print the base version of a server build version")
                .arg(Arg::new("build").required(true).help("Server build version")),
        )
        .subcommand(schema_args(
            Command::new("diff").about("Print the change-set between two configurations as JSON"),
        ))
        .subcommand(
            schema_args(Command::new("plan").about("Print the commands that apply the change-set"))
                .arg(
                    Arg::new("log-sinks")
                        .long("log-sinks")
                        .help("Node log sinks as id=name pairs, e.g. 0=stderr,1=/var/log/x.log"),
                ),
        )
}

fn init_logging(filter: &str, verbose: u8) {
    let level = match verbose {
        0 => filter,
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_tree(path: &Path) -> Result<ConfigTree> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tree = if path.extension().is_some_and(|ext| ext == "json") {
        ConfigTree::from_json_str(&text)
    } else {
        ConfigTree::from_yaml(&text)
    };
    tree.with_context(|| format!("parsing {}", path.display()))
}

fn parse_log_sinks(pairs: &str) -> Result<StaticInfo> {
    let mut sinks = HashMap::new();
    for pair in pairs.split(',').filter(|p| !p.is_empty()) {
        let Some((id, name)) = pair.split_once('=') else {
            bail!("log sink '{pair}' is not id=name");
        };
        sinks.insert(id.trim().to_string(), name.trim().to_string());
    }
    Ok(StaticInfo::new().with_log_sinks(sinks))
}

fn reconciler(config: ReconcilerConfig, args: &ArgMatches) -> Result<Reconciler> {
    let config = match args.get_one::<PathBuf>("schemas") {
        Some(dir) => config.with_schema_dir(dir),
        None => config,
    };
    Reconciler::from_config(config).context("loading schema registry")
}

struct Inputs {
    desired: ConfigTree,
    current: ConfigTree,
    version: String,
}

fn inputs(args: &ArgMatches) -> Result<Inputs> {
    let path = |name: &str| {
        args.get_one::<PathBuf>(name)
            .with_context(|| format!("missing --{name}"))
    };
    Ok(Inputs {
        desired: read_tree(path("desired")?)?,
        current: read_tree(path("current")?)?,
        version: args
            .get_one::<String>("version")
            .context("missing --version")?
            .clone(),
    })
}

fn run(matches: &ArgMatches, config: ReconcilerConfig) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("flatten", args)) => {
            let file = args.get_one::<PathBuf>("file").context("missing file")?;
            let flat = without_index_markers(&flatten(&read_tree(file)?));
            for (key, value) in &flat {
                println!("{key} = {}", value.to_json());
            }
        }
        Some(("version", args)) => {
            let build = args.get_one::<String>("build").context("missing version")?;
            println!("{}", base_version(build)?);
        }
        Some(("diff", args)) => {
            let reconciler = reconciler(config, args)?;
            let Inputs { desired, current, version } = inputs(args)?;
            let report = reconciler.diff(&desired, &current, &version)?;
            println!("{}", serde_json::to_string_pretty(&report.changes)?);
        }
        Some(("plan", args)) => {
            let reconciler = reconciler(config, args)?;
            let Inputs { desired, current, version } = inputs(args)?;
            let info = args
                .get_one::<String>("log-sinks")
                .map(|pairs| parse_log_sinks(pairs))
                .transpose()?;
            let info = info.as_ref().map(|i| i as &dyn dynconf_core::InfoSource);
            match reconciler.plan(&desired, &current, &version, info)? {
                Plan::Dynamic { commands } => {
                    for command in commands {
                        println!("{command}");
                    }
                }
                Plan::RequiresRestart { keys } => {
                    eprintln!("restart required for {} key(s):", keys.len());
                    for key in keys {
                        eprintln!("  {key}");
                    }
                    return Ok(ExitCode::from(EXIT_RESTART));
                }
            }
        }
        _ => bail!("unknown subcommand"),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ReconcilerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReconcilerConfig::default(),
    };
    init_logging(&config.log_filter, matches.get_count("verbose"));

    run(&matches, config)
}
