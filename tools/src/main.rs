//! draw-runner: headless driver for the prize-draw widget.
//!
//! Usage:
//!   draw-runner --seed 12345 --draws 200 --db draws.db
//!   draw-runner --seed 12345 --ipc-mode --realtime --tz Europe/London
//!
//! A missing config file falls back to the built-in widget; a config file
//! that exists but fails to parse or validate is fatal.

use anyhow::Result;
use anyhow::Context;
use prizegrid_core::{
    animator::{AnimationPhase, HighlightSink},
    clock::{CalendarZone, SystemClock},
    config::WidgetConfig,
    history::HistoryRecord,
    prize::Prize,
    store::SqliteStore,
    types::{CellIndex, PrizeId},
    DrawEngine, DrawError, DrawObserver,
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    SubmitCode { code: String },
    IssueCode,
    ClearHistory,
    PrizeInfo { prize_id: PrizeId },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    is_drawing:  bool,
    phase:       AnimationPhase,
    highlighted: Option<CellIndex>,
    used_codes:  usize,
    recent:      Vec<&'a HistoryRecord>,
}

/// Streams highlight changes and results as JSON lines.
struct JsonLinesHost;

impl HighlightSink for JsonLinesHost {
    fn render_highlight(&mut self, cell: CellIndex) {
        println!("{}", serde_json::json!({ "type": "highlight", "cell": cell }));
    }
}

impl DrawObserver for JsonLinesHost {
    fn on_draw_complete(&mut self, prize: &Prize) {
        println!("{}", serde_json::json!({ "type": "result", "prize": prize }));
    }
}

/// Batch mode: counts awards, renders nothing.
#[derive(Default)]
struct Tally {
    awards: BTreeMap<PrizeId, u64>,
}

impl HighlightSink for Tally {
    fn render_highlight(&mut self, _cell: CellIndex) {}
}

impl DrawObserver for Tally {
    fn on_draw_complete(&mut self, prize: &Prize) {
        *self.awards.entry(prize.id).or_default() += 1;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let draws = parse_arg(&args, "--draws", 100u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let realtime = args.iter().any(|a| a == "--realtime");
    let system_zone = args.iter().any(|a| a == "--system-zone");
    let db = string_arg(&args, "--db", ":memory:");
    let namespace = string_arg(&args, "--namespace", "default");
    let config_path = string_arg(&args, "--config", "./data/widget.json");

    let (mut config, config_source) = resolve_config(config_path)?;
    if let Some(name) = args.windows(2).find(|w| w[0] == "--tz").map(|w| w[1].as_str()) {
        let tz = name
            .parse()
            .map_err(|e| anyhow::anyhow!("unknown time zone {name:?}: {e}"))?;
        config.calendar.zone = CalendarZone::Named(tz);
    } else if system_zone {
        config.calendar.zone = CalendarZone::System;
    }

    if !ipc_mode {
        println!("Prize grid draw-runner");
        println!("  seed:       {seed}");
        println!("  draws:      {draws}");
        println!("  db:         {db}");
        println!("  namespace:  {namespace}");
        println!("  config:     {config_source}");
        println!("  zone:       {:?}", config.calendar.zone);
        println!();
    }

    let store = if db == ":memory:" {
        SqliteStore::in_memory(namespace)?
    } else {
        SqliteStore::open(db, namespace)?
    };
    store.migrate()?;

    let mut engine = DrawEngine::new(config, seed, Box::new(store), Box::new(SystemClock))?;

    if ipc_mode {
        run_ipc_loop(&mut engine, realtime)?;
    } else {
        run_batch(&mut engine, draws, realtime)?;
    }

    Ok(())
}

fn run_batch(engine: &mut DrawEngine, draws: u64, realtime: bool) -> Result<()> {
    let mut tally = Tally::default();
    let mut rejected = 0u64;

    for _ in 0..draws {
        let Some(code) = engine.issue_code() else {
            anyhow::bail!("clock is outside the representable calendar range");
        };
        match engine.draw(&code, &mut tally, |ms| pause(ms, realtime)) {
            Ok(_) => {}
            Err(DrawError::Rejected(reason)) => {
                log::warn!("issued code {code} rejected: {reason}");
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    print_summary(engine, &tally, draws, rejected);
    Ok(())
}

fn run_ipc_loop(engine: &mut DrawEngine, realtime: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut host = JsonLinesHost;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::SubmitCode { code } => {
                if let Err(e) = engine.draw(&code, &mut host, |ms| pause(ms, realtime)) {
                    writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                }
            }
            IpcCommand::IssueCode => {
                let code = engine.issue_code();
                writeln!(stdout, "{}", serde_json::json!({ "type": "code", "code": code }))?;
            }
            IpcCommand::ClearHistory => engine.clear_history(),
            IpcCommand::PrizeInfo { prize_id } => {
                let prize = engine.prize_info(prize_id);
                writeln!(stdout, "{}", serde_json::json!({ "type": "prize_info", "prize": prize }))?;
            }
        }

        for event in engine.drain_events() {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        }
        writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Load the widget config. Only a missing file falls back to the built-in
/// widget; returns the config and a label saying where it came from.
fn resolve_config(path: &str) -> Result<(WidgetConfig, String)> {
    if !Path::new(path).exists() {
        log::warn!("config {path} not found; using the built-in widget");
        return Ok((WidgetConfig::default_widget(), "built-in (no file)".to_string()));
    }
    let config = WidgetConfig::load(path).with_context(|| format!("Invalid config {path}"))?;
    Ok((config, path.to_string()))
}

fn build_ui_state(engine: &DrawEngine) -> UiState<'_> {
    UiState {
        is_drawing:  engine.is_drawing(),
        phase:       engine.animator().phase(),
        highlighted: engine.animator().highlighted(),
        used_codes:  engine.used_codes().len(),
        recent:      engine.history().recent(5).collect(),
    }
}

fn print_summary(engine: &DrawEngine, tally: &Tally, draws: u64, rejected: u64) {
    let awarded: u64 = tally.awards.values().sum();

    println!("=== RUN SUMMARY ===");
    println!("  draws requested: {draws}");
    println!("  draws awarded:   {awarded}");
    println!("  codes rejected:  {rejected}");
    println!("  history kept:    {}", engine.history().len());

    println!();
    println!("=== AWARDS BY PRIZE ===");
    for prize in engine.config().prizes.iter() {
        let count = tally.awards.get(&prize.id).copied().unwrap_or(0);
        let share = if awarded > 0 { count as f64 * 100.0 / awarded as f64 } else { 0.0 };
        println!(
            "  {:>3} {:<20} weight {:>5.1}% | awarded {count:>5} ({share:.1}%)",
            prize.id, prize.name, prize.weight
        );
    }
}

fn pause(ms: u64, realtime: bool) {
    if realtime {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
