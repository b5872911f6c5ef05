use clap::{App, Arg, SubCommand};
use num_enum::TryFromPrimitive;
use tracing::Level;

mod command_audit;
mod command_demo;
mod command_split;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone, Debug)]
#[repr(u8)]
enum Verbosity {
    Warn = 0,
    Info = 1,
    Debug = 2,
}

impl From<Verbosity> for Level {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Warn => Level::WARN,
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }
}

fn main() {
    let matches = App::new("mpcvote")
        .version("0.1")
        .about("Additive secret-sharing voting: client helpers, simulation and board audit")
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("split")
                .about("Split a vote into shares, commitments and proof")
                .arg(
                    Arg::with_name("VOTE")
                        .index(1)
                        .required(true)
                        .help("The vote value, usually 0 or 1"),
                )
                .arg(
                    Arg::with_name("authorities")
                        .short("n")
                        .long("authorities")
                        .takes_value(true)
                        .default_value("3")
                        .help("Number of authorities"),
                ),
        )
        .subcommand(
            SubCommand::with_name("demo")
                .about("Run a complete election in-process with random 0/1 votes")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("10")
                        .help("Number of voters"),
                )
                .arg(
                    Arg::with_name("authorities")
                        .short("n")
                        .long("authorities")
                        .takes_value(true)
                        .help("Number of authorities (defaults to MPCVOTE_AUTHORITIES or 3)"),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .help("Write the bulletin board to this file (CBOR if it ends in .cbor, else JSON)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("audit")
                .about("Audit a bulletin board snapshot")
                .arg(
                    Arg::with_name("BOARD")
                        .index(1)
                        .required(true)
                        .help("Bulletin board file in JSON or CBOR format"),
                ),
        )
        .get_matches();

    let occurrences = matches.occurrences_of("v").min(2) as u8;
    let verbosity = Verbosity::try_from_primitive(occurrences).unwrap_or(Verbosity::Debug);
    tracing_subscriber::fmt()
        .with_max_level(Level::from(verbosity))
        .with_writer(std::io::stderr)
        .init();

    // Subcommands
    match matches.subcommand() {
        ("split", Some(matches)) => command_split::command_split(matches),
        ("demo", Some(matches)) => command_demo::command_demo(matches),
        ("audit", Some(matches)) => command_audit::command_audit(matches),
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(1);
        }
    }
}

/// Parse a numeric argument or exit with a message
fn parse_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, command: &str) -> Option<T> {
    let value = matches.value_of(name)?;
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("mpcvote {}: invalid {}: {}", command, name, value);
            std::process::exit(1);
        }
    }
}
