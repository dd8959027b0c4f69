mod cli;
mod commands;
mod error;
mod logger;

use cli::{CompileParams, DecodeParams, InspectParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();
    logger::init(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("inspect", m)) => {
            let params = InspectParams::from_matches(m);
            commands::inspect::run(params.into());
        }
        Some(("decode", m)) => {
            let params = DecodeParams::from_matches(m);
            commands::decode::run(params.into());
        }
        Some(("compile", m)) => {
            let params = CompileParams::from_matches(m);
            commands::compile::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}
