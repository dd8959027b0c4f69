//! Command builders for the CLI.

use clap::Command;

use super::args::*;

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("pbridge")
        .about("Decode protocol buffer messages straight into compiled message memory")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(verbose_arg())
        .subcommand(inspect_command())
        .subcommand(decode_command())
        .subcommand(compile_command())
}

/// List messages of a pool, or show how each field of one message is written.
pub fn inspect_command() -> Command {
    Command::new("inspect")
        .about("Show the write plan of a message")
        .override_usage(
            "\
  pbridge inspect -p <POOL>
  pbridge inspect -p <POOL> -m <NAME>",
        )
        .after_help(
            r#"EXAMPLES:
  pbridge inspect -p schema.json                      # list messages
  pbridge inspect -p schema.json -m demo.Person       # direct vs reflection per field
  pbridge inspect -p schema.json -m demo.Person --opaque demo.Person"#,
        )
        .arg(pool_arg())
        .arg(message_arg())
        .arg(opaque_arg())
        .arg(color_arg())
}

/// Decode an encoded message and print it as text.
pub fn decode_command() -> Command {
    Command::new("decode")
        .about("Decode an encoded message and print it")
        .override_usage(
            "\
  pbridge decode -p <POOL> -m <NAME> [INPUT]",
        )
        .after_help(
            r#"EXAMPLES:
  pbridge decode -p schema.json -m demo.Person person.bin
  cat person.bin | pbridge decode -p schema.pbdp -m demo.Person
  pbridge decode -p schema.json -m demo.Person person.bin --chunk 4"#,
        )
        .arg(pool_arg())
        .arg(message_arg().required(true))
        .arg(input_arg())
        .arg(chunk_arg())
        .arg(max_depth_arg())
        .arg(opaque_arg())
        .arg(color_arg())
}

/// Compile a JSON pool into the binary format.
pub fn compile_command() -> Command {
    Command::new("compile")
        .about("Compile a JSON descriptor pool to the binary format")
        .override_usage(
            "\
  pbridge compile -p <POOL> -o <FILE>",
        )
        .after_help(
            r#"EXAMPLES:
  pbridge compile -p schema.json -o schema.pbdp"#,
        )
        .arg(pool_arg())
        .arg(output_arg())
}
