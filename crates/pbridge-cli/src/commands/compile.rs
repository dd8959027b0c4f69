use std::fs;
use std::path::PathBuf;

use super::pool_loader::load_pool;
use crate::error::CliError;

pub struct CompileArgs {
    pub pool_path: PathBuf,
    pub output: PathBuf,
}

pub fn run(args: CompileArgs) {
    if let Err(e) = execute(&args) {
        e.exit();
    }
}

pub fn execute(args: &CompileArgs) -> Result<usize, CliError> {
    let pool = load_pool(&args.pool_path)?;
    let bytes = pool.to_binary();
    fs::write(&args.output, &bytes).map_err(|source| CliError::Write {
        path: args.output.clone(),
        source,
    })?;
    log::info!("wrote {} bytes to '{}'", bytes.len(), args.output.display());
    Ok(bytes.len())
}
