//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` that can be composed into commands.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Descriptor pool, JSON or compiled binary (-p/--pool).
pub fn pool_arg() -> Arg {
    Arg::new("pool")
        .short('p')
        .long("pool")
        .value_name("POOL")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Descriptor pool (JSON or compiled binary)")
}

/// Fully qualified message name (-m/--message).
pub fn message_arg() -> Arg {
    Arg::new("message")
        .short('m')
        .long("message")
        .value_name("NAME")
        .help("Fully qualified message name")
}

/// Encoded input file, `-` for stdin (positional).
pub fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("INPUT")
        .default_value("-")
        .value_parser(value_parser!(PathBuf))
        .help("Encoded message file, or - for stdin")
}

/// Output file (-o/--output).
pub fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Output file")
}

/// Messages whose classes reject direct access (--opaque, repeatable).
pub fn opaque_arg() -> Arg {
    Arg::new("opaque")
        .long("opaque")
        .value_name("NAME")
        .action(ArgAction::Append)
        .help("Build this message with opaque reflection (repeatable)")
}

/// Maximum bytes per string callback (--chunk).
pub fn chunk_arg() -> Arg {
    Arg::new("chunk")
        .long("chunk")
        .value_name("BYTES")
        .value_parser(value_parser!(u64).range(1..))
        .help("Deliver string data in chunks of at most BYTES")
}

/// Maximum submessage nesting (--max-depth).
pub fn max_depth_arg() -> Arg {
    Arg::new("max_depth")
        .long("max-depth")
        .value_name("N")
        .value_parser(value_parser!(u32))
        .help("Maximum submessage nesting depth [default: 64]")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

/// Log verbosity (-v, -vv).
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .global(true)
        .help("Log setup decisions to stderr (-vv for decoder events)")
}
