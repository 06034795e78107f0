use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

pub fn build_cli() -> Command {
    Command::new("rsfec")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reed-Solomon erasure coding for files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("encode")
                .visible_alias("e")
                .about("Split a file into data shards and add parity shards")
                .arg(
                    Arg::new("input")
                        .help("File to encode")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Number of data shards")
                        .value_name("COUNT")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("parity")
                        .short('p')
                        .long("parity")
                        .help("Number of parity shards")
                        .value_name("COUNT")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("cauchy")
                        .long("cauchy")
                        .help("Use a Cauchy generator matrix instead of Vandermonde")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("out_dir")
                        .short('o')
                        .long("out-dir")
                        .help("Directory for the shard files (default: next to the input)")
                        .value_name("DIR"),
                )
                .arg(
                    Arg::new("stripe_size")
                        .short('s')
                        .long("stripe-size")
                        .help("Bytes per shard in one codec call")
                        .value_name("BYTES")
                        .value_parser(value_parser!(usize)),
                )
                .arg(scalar_arg()),
        )
        .subcommand(
            Command::new("reconstruct")
                .visible_alias("r")
                .about("Rebuild a file from its surviving shard files")
                .arg(
                    Arg::new("input")
                        .help("Original file path the shards were named after")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Where to write the rebuilt file (default: the input path)")
                        .value_name("FILE"),
                )
                .arg(scalar_arg()),
        )
        .subcommand(
            Command::new("verify")
                .visible_alias("v")
                .about("Check that all shards are present and parity is consistent")
                .arg(
                    Arg::new("input")
                        .help("Original file path the shards were named after")
                        .required(true)
                        .index(1),
                )
                .arg(scalar_arg()),
        )
}

fn scalar_arg() -> Arg {
    Arg::new("scalar")
        .long("scalar")
        .help("Force the scalar kernel")
        .action(ArgAction::SetTrue)
}

pub fn parse_args() -> ArgMatches {
    build_cli().get_matches()
}
