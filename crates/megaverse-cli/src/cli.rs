//! Argument definitions

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use megaverse_core::{CanvasConfig, Color, Direction, UnknownTokenError};
use std::path::PathBuf;

pub(crate) fn build() -> Command {
    Command::new("megaverse")
        .version(megaverse_core::VERSION)
        .about("Reconcile a Megaverse canvas against its goal map")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("API base URL"),
        )
        .arg(
            Arg::new("candidate-id")
                .long("candidate-id")
                .global(true)
                .help("Candidate identifier"),
        )
        .arg(
            Arg::new("parallelism")
                .long("parallelism")
                .short('p')
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Maximum simultaneous remote calls"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("create")
                .about("Create a single astral object")
                .subcommand_required(true)
                .subcommand(
                    Command::new("polyanet")
                        .about("Create a polyanet")
                        .arg(coordinate("row"))
                        .arg(coordinate("column")),
                )
                .subcommand(
                    Command::new("cometh")
                        .about("Create a cometh")
                        .arg(coordinate("row"))
                        .arg(coordinate("column"))
                        .arg(
                            Arg::new("direction")
                                .required(true)
                                .value_parser(parse_direction)
                                .help("up, down, left or right"),
                        ),
                )
                .subcommand(
                    Command::new("soloon")
                        .about("Create a soloon")
                        .arg(coordinate("row"))
                        .arg(coordinate("column"))
                        .arg(
                            Arg::new("color")
                                .required(true)
                                .value_parser(parse_color)
                                .help("white, blue, red or purple"),
                        ),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete whatever occupies a cell")
                .arg(coordinate("row"))
                .arg(coordinate("column")),
        )
        .subcommand(
            Command::new("deleteall")
                .visible_alias("clear")
                .about("Delete every occupied cell"),
        )
        .subcommand(
            Command::new("replicate")
                .visible_alias("replicategoal")
                .about("Clear the canvas and recreate the goal map"),
        )
        .subcommand(
            Command::new("xshape")
                .about("Draw an X of polyanets over a square goal map")
                .arg(
                    Arg::new("margin")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Cells skipped at each end of both diagonals"),
                ),
        )
        .subcommand(
            Command::new("goal")
                .about("Show the goal map's dimensions and entity counts")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn coordinate(name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(usize))
}

fn parse_direction(raw: &str) -> Result<Direction, UnknownTokenError> {
    raw.parse()
}

fn parse_color(raw: &str) -> Result<Color, UnknownTokenError> {
    raw.parse()
}

/// Layer configuration: file, then `MEGAVERSE_*` variables from `env`,
/// then flags.
///
/// # Errors
/// Unreadable or invalid configuration.
pub(crate) fn resolve_config<F>(
    matches: &ArgMatches,
    env: F,
) -> Result<CanvasConfig, megaverse_core::CanvasError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CanvasConfig::load(path)?,
        None => CanvasConfig::new(),
    };
    let mut config = config.apply_env_from(env)?;

    if let Some(url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(url.clone());
    }
    if let Some(id) = matches.get_one::<String>("candidate-id") {
        config = config.with_candidate_id(id.clone());
    }
    if let Some(parallelism) = matches.get_one::<usize>("parallelism") {
        config = config.with_parallel_degree(*parallelism);
    }

    config.validate()?;
    Ok(config)
}
