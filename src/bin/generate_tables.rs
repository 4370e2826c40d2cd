//! Dump the built-in game tables in the JSON store format, so a deployment
//! can serve tables from a file (`DRAWLAB_TABLES`) and edit them without a
//! rebuild.
//!
//! Usage: `cargo run --bin generate_tables -- <out.json>`

use std::collections::BTreeMap;
use std::env;
use std::process::ExitCode;

use drawlab::provider::tables::BUILTIN_CURVES;

fn main() -> ExitCode {
    let out_path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: generate_tables <out.json>");
            return ExitCode::from(2);
        }
    };

    // BTreeMap keeps the file key order stable across runs.
    let mut tables: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (game_id, curve) in BUILTIN_CURVES {
        tables.insert(game_id.to_string(), curve.success_table());
    }

    let raw = match serde_json::to_string(&tables) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("serialize failed: {err}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = std::fs::write(&out_path, raw) {
        eprintln!("write {out_path} failed: {err}");
        return ExitCode::from(1);
    }

    println!("wrote {} tables to {out_path}", tables.len());
    ExitCode::SUCCESS
}
