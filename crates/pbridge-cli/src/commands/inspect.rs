use std::fmt::Write;
use std::path::PathBuf;

use pbridge_core::Colors;
use pbridge_lib::new_write_handlers;

use super::pool_loader::{build_factory, load_pool};
use crate::error::CliError;

pub struct InspectArgs {
    pub pool_path: PathBuf,
    pub message: Option<String>,
    pub opaque: Vec<String>,
    pub color: bool,
}

pub fn run(args: InspectArgs) {
    match execute(&args) {
        Ok(out) => print!("{out}"),
        Err(e) => e.exit(),
    }
}

pub fn execute(args: &InspectArgs) -> Result<String, CliError> {
    let pool = load_pool(&args.pool_path)?;
    let colors = Colors::new(args.color);

    let Some(name) = &args.message else {
        let mut out = String::new();
        for msg in pool.messages() {
            let _ = writeln!(
                out,
                "{}{}{} ({} fields)",
                colors.blue,
                msg.full_name(),
                colors.reset,
                msg.field_count()
            );
        }
        return Ok(out);
    };

    let factory = build_factory(pool, &args.opaque)?;
    let prototype = factory
        .find_prototype(name)
        .ok_or_else(|| CliError::UnknownMessage(name.clone()))?;
    let handlers = new_write_handlers(prototype)?;
    Ok(handlers.report(colors))
}
