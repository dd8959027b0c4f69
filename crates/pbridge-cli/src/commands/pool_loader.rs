use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use pbridge_core::{BINARY_MAGIC, DescriptorPool};
use pbridge_reflect::{FactoryOptions, MessageFactory};

use crate::error::CliError;

/// Load a pool, picking the binary reader when the file starts with the magic.
pub fn load_pool(path: &Path) -> Result<DescriptorPool, CliError> {
    let bytes = read_file(path)?;
    let parsed = if bytes.starts_with(&BINARY_MAGIC) {
        DescriptorPool::from_binary(&bytes)
    } else {
        let json = String::from_utf8(bytes).map_err(|source| CliError::NotUtf8 {
            path: path.to_path_buf(),
            source,
        })?;
        DescriptorPool::from_json(&json)
    };
    let pool = parsed.map_err(|source| CliError::Pool {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "loaded {} messages from '{}'",
        pool.message_count(),
        path.display()
    );
    Ok(pool)
}

/// Build the factory, marking the named messages opaque.
pub fn build_factory(
    pool: DescriptorPool,
    opaque: &[String],
) -> Result<Arc<MessageFactory>, CliError> {
    let mut options = FactoryOptions::new();
    for name in opaque {
        if pool.find_message(name).is_none() {
            return Err(CliError::UnknownMessage(name.clone()));
        }
        options = options.opaque_message(name.as_str());
    }
    Ok(MessageFactory::with_options(Arc::new(pool), &options))
}

/// Read a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .map_err(CliError::Stdin)?;
        return Ok(buf);
    }
    read_file(path)
}

fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
