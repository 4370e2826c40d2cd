use std::env;
use std::sync::Arc;

use crate::error::EngineError;
use crate::parallel::{simulate_on_pool, WorkerPool};
use crate::plot::render_histogram_svg;
use crate::provider::tables::BUILTIN_CURVES;
use crate::server::api::{ServerState, DEFAULT_SEED};
use crate::server;
use crate::sim::SimulateParams;
use crate::stats::summary::{fit_normal, summarize_with_fit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Simulate,
    Render,
    Tables,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("simulate") => Some(Command::Simulate),
        Some("render") => Some(Command::Render),
        Some("tables") => Some(Command::Tables),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> u8 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Render) => handle_render(args),
        Some(Command::Tables) => handle_tables(),
        None => {
            eprintln!("usage: drawlab <serve|simulate|render|tables>");
            eprintln!("  serve                                        run the HTTP API");
            eprintln!("  simulate <game_id> <goal> <obs_total> [n_sims] [seed]");
            eprintln!("  render   <game_id> <goal> <obs_total> <out.svg> [n_sims] [seed]");
            eprintln!("  tables                                       list built-in game tables");
            2
        }
    }
}

fn handle_serve() -> u8 {
    let bind_addr = env::var("DRAWLAB_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let state = Arc::new(ServerState::from_env());
    match server::run_server(&bind_addr, state) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

struct PipelineOutput {
    summary: crate::stats::SummaryReport,
    svg: String,
}

fn run_pipeline(
    game_id: u32,
    goal: u32,
    obs_total: u64,
    n_sims: u32,
    seed: u64,
) -> Result<PipelineOutput, EngineError> {
    let state = ServerState::from_env();
    let spec = state.tables.load(game_id)?;
    let totals = simulate_on_pool(
        &spec,
        SimulateParams { goal, n_sims, seed },
        &WorkerPool::from_env(),
    )?;
    let fit = fit_normal(&totals)?;
    let summary = summarize_with_fit(&totals, obs_total, 128, &fit);
    let title = format!("Total draws distribution: GET {goal} (n={n_sims})");
    let svg = render_histogram_svg(&totals, &fit, obs_total, 128, &title);
    Ok(PipelineOutput { summary, svg })
}

fn handle_simulate(args: &[String]) -> u8 {
    let game_id = parse_u32_arg(args.get(2), "game_id", 1);
    let goal = parse_u32_arg(args.get(3), "goal", 7);
    let obs_total = parse_u64_arg(args.get(4), "obs_total", 888);
    let n_sims = parse_u32_arg(args.get(5), "n_sims", 100_000);
    let seed = parse_u64_arg(args.get(6), "seed", DEFAULT_SEED);

    match run_pipeline(game_id, goal, obs_total, n_sims, seed) {
        Ok(output) => {
            match serde_json::to_string_pretty(&output.summary) {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    eprintln!("summary serialization failed: {err}");
                    return 1;
                }
            }
            0
        }
        Err(err) => {
            eprintln!("simulate failed: {err}");
            1
        }
    }
}

fn handle_render(args: &[String]) -> u8 {
    let game_id = parse_u32_arg(args.get(2), "game_id", 1);
    let goal = parse_u32_arg(args.get(3), "goal", 7);
    let obs_total = parse_u64_arg(args.get(4), "obs_total", 888);
    let out_path = match args.get(5) {
        Some(path) => path.clone(),
        None => {
            eprintln!("render requires an output path: drawlab render <game_id> <goal> <obs_total> <out.svg>");
            return 2;
        }
    };
    let n_sims = parse_u32_arg(args.get(6), "n_sims", 100_000);
    let seed = parse_u64_arg(args.get(7), "seed", DEFAULT_SEED);

    match run_pipeline(game_id, goal, obs_total, n_sims, seed) {
        Ok(output) => match std::fs::write(&out_path, output.svg) {
            Ok(()) => {
                println!("wrote {out_path}");
                0
            }
            Err(err) => {
                eprintln!("write {out_path} failed: {err}");
                1
            }
        },
        Err(err) => {
            eprintln!("render failed: {err}");
            1
        }
    }
}

fn handle_tables() -> u8 {
    for (game_id, curve) in BUILTIN_CURVES {
        println!(
            "game {game_id}: {} steps, base_p={}, ramp from step {} (+{} per step)",
            curve.max_steps, curve.base_p, curve.accel_start, curve.accel_step
        );
    }
    if let Ok(path) = env::var("DRAWLAB_TABLES") {
        println!("table overrides: {path}");
    }
    0
}

fn parse_u32_arg(arg: Option<&String>, name: &str, default: u32) -> u32 {
    match arg {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("invalid {name} {raw:?}, using {default}");
            default
        }),
        None => default,
    }
}

fn parse_u64_arg(arg: Option<&String>, name: &str, default: u64) -> u64 {
    match arg {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("invalid {name} {raw:?}, using {default}");
            default
        }),
        None => default,
    }
}
