use std::path::PathBuf;

use pbridge_core::Colors;
use pbridge_decoder::DecodeLimits;
use pbridge_lib::new_write_handlers;
use pbridge_reflect::text;

use super::pool_loader::{build_factory, load_pool, read_input};
use crate::error::CliError;

pub struct DecodeArgs {
    pub pool_path: PathBuf,
    pub message: String,
    pub input: PathBuf,
    pub chunk: Option<usize>,
    pub max_depth: Option<u32>,
    pub opaque: Vec<String>,
    pub color: bool,
}

impl DecodeArgs {
    fn limits(&self) -> DecodeLimits {
        let mut limits = DecodeLimits::new();
        if let Some(depth) = self.max_depth {
            limits = limits.max_depth(depth);
        }
        if let Some(chunk) = self.chunk {
            limits = limits.string_chunk(chunk);
        }
        limits
    }
}

pub fn run(args: DecodeArgs) {
    match execute(&args) {
        Ok(out) => print!("{out}"),
        Err(e) => e.exit(),
    }
}

pub fn execute(args: &DecodeArgs) -> Result<String, CliError> {
    let pool = load_pool(&args.pool_path)?;
    let factory = build_factory(pool, &args.opaque)?;
    let prototype = factory
        .find_prototype(&args.message)
        .ok_or_else(|| CliError::UnknownMessage(args.message.clone()))?;

    let handlers = new_write_handlers(prototype)?;
    let bytes = read_input(&args.input)?;
    let mut msg = prototype.new_instance();
    handlers.decode_into(&bytes, &mut msg, &args.limits())?;

    Ok(text::format_colored(&msg, Colors::new(args.color)))
}
