//! Dispatch logic: extract params from ArgMatches and convert to command args.

use std::path::PathBuf;

use clap::ArgMatches;

use super::ColorChoice;
use crate::commands::compile::CompileArgs;
use crate::commands::decode::DecodeArgs;
use crate::commands::inspect::InspectArgs;

pub struct InspectParams {
    pub pool_path: PathBuf,
    pub message: Option<String>,
    pub opaque: Vec<String>,
    pub color: ColorChoice,
}

impl InspectParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            pool_path: required_path(m, "pool"),
            message: m.get_one::<String>("message").cloned(),
            opaque: parse_opaque(m),
            color: parse_color(m),
        }
    }
}

impl From<InspectParams> for InspectArgs {
    fn from(p: InspectParams) -> Self {
        Self {
            pool_path: p.pool_path,
            message: p.message,
            opaque: p.opaque,
            color: p.color.should_colorize(),
        }
    }
}

pub struct DecodeParams {
    pub pool_path: PathBuf,
    pub message: String,
    pub input: PathBuf,
    pub chunk: Option<usize>,
    pub max_depth: Option<u32>,
    pub opaque: Vec<String>,
    pub color: ColorChoice,
}

impl DecodeParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            pool_path: required_path(m, "pool"),
            message: m
                .get_one::<String>("message")
                .cloned()
                .expect("message is required"),
            input: required_path(m, "input"),
            chunk: m
                .get_one::<u64>("chunk")
                .map(|&n| usize::try_from(n).unwrap_or(usize::MAX)),
            max_depth: m.get_one::<u32>("max_depth").copied(),
            opaque: parse_opaque(m),
            color: parse_color(m),
        }
    }
}

impl From<DecodeParams> for DecodeArgs {
    fn from(p: DecodeParams) -> Self {
        Self {
            pool_path: p.pool_path,
            message: p.message,
            input: p.input,
            chunk: p.chunk,
            max_depth: p.max_depth,
            opaque: p.opaque,
            color: p.color.should_colorize(),
        }
    }
}

pub struct CompileParams {
    pub pool_path: PathBuf,
    pub output: PathBuf,
}

impl CompileParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            pool_path: required_path(m, "pool"),
            output: required_path(m, "output"),
        }
    }
}

impl From<CompileParams> for CompileArgs {
    fn from(p: CompileParams) -> Self {
        Self {
            pool_path: p.pool_path,
            output: p.output,
        }
    }
}

fn required_path(m: &ArgMatches, id: &str) -> PathBuf {
    m.get_one::<PathBuf>(id)
        .cloned()
        .unwrap_or_else(|| panic!("{id} is required"))
}

fn parse_opaque(m: &ArgMatches) -> Vec<String> {
    m.get_many::<String>("opaque")
        .map(|names| names.cloned().collect())
        .unwrap_or_default()
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(String::as_str) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
