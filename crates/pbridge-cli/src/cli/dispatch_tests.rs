use std::path::PathBuf;

use super::*;
use crate::cli::commands::{compile_command, decode_command, inspect_command};

#[test]
fn inspect_without_message_lists_pool() {
    let m = inspect_command()
        .try_get_matches_from(["inspect", "-p", "schema.json"])
        .unwrap();
    let params = InspectParams::from_matches(&m);

    assert_eq!(params.pool_path, PathBuf::from("schema.json"));
    assert_eq!(params.message, None);
    assert!(params.opaque.is_empty());
    assert_eq!(params.color, ColorChoice::Auto);
}

#[test]
fn opaque_is_repeatable() {
    let m = inspect_command()
        .try_get_matches_from([
            "inspect",
            "-p",
            "schema.json",
            "-m",
            "demo.Team",
            "--opaque",
            "demo.Person",
            "--opaque",
            "demo.Address",
            "--color",
            "never",
        ])
        .unwrap();
    let params = InspectParams::from_matches(&m);

    assert_eq!(params.message.as_deref(), Some("demo.Team"));
    assert_eq!(params.opaque, ["demo.Person", "demo.Address"]);
    assert_eq!(params.color, ColorChoice::Never);
}

#[test]
fn decode_reads_stdin_by_default() {
    let m = decode_command()
        .try_get_matches_from(["decode", "-p", "schema.json", "-m", "demo.Person"])
        .unwrap();
    let params = DecodeParams::from_matches(&m);

    assert_eq!(params.input, PathBuf::from("-"));
    assert_eq!(params.chunk, None);
    assert_eq!(params.max_depth, None);
}

#[test]
fn decode_limits_flags() {
    let m = decode_command()
        .try_get_matches_from([
            "decode",
            "-p",
            "schema.json",
            "-m",
            "demo.Person",
            "person.bin",
            "--chunk",
            "3",
            "--max-depth",
            "8",
        ])
        .unwrap();
    let params = DecodeParams::from_matches(&m);

    assert_eq!(params.input, PathBuf::from("person.bin"));
    assert_eq!(params.chunk, Some(3));
    assert_eq!(params.max_depth, Some(8));
}

#[test]
fn decode_requires_message() {
    let result = decode_command().try_get_matches_from(["decode", "-p", "schema.json"]);
    assert!(result.is_err());
}

#[test]
fn zero_chunk_is_rejected() {
    let result = decode_command().try_get_matches_from([
        "decode",
        "-p",
        "schema.json",
        "-m",
        "demo.Person",
        "--chunk",
        "0",
    ]);
    assert!(result.is_err());
}

#[test]
fn compile_requires_output() {
    assert!(
        compile_command()
            .try_get_matches_from(["compile", "-p", "schema.json"])
            .is_err()
    );

    let m = compile_command()
        .try_get_matches_from(["compile", "-p", "schema.json", "-o", "schema.pbdp"])
        .unwrap();
    let params = CompileParams::from_matches(&m);
    assert_eq!(params.output, PathBuf::from("schema.pbdp"));
}

#[test]
fn verbose_is_global() {
    let m = build_cli()
        .try_get_matches_from(["pbridge", "inspect", "-p", "schema.json", "-vv"])
        .unwrap();
    assert_eq!(m.get_count("verbose"), 2);
}

#[test]
fn cli_is_consistent() {
    build_cli().debug_assert();
}
