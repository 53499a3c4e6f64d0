//! typing_replay: drive a typing session from a script of host buffers.
//!
//! Each script line is either a directive or the host's full input buffer
//! after a change:
//!
//!   !next | !prev | !jump N   navigate
//!   !tick SECS                let virtual time pass
//!   !pause | !resume | !buy   session controls
//!   # ...                     comment
//!   anything else             handed to the session as the input buffer
//!
//! Events are printed after every line and a summary at the end.

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use pinyin_typing::SessionOrchestrator;
use typing_core::{
    Config, ContentCategory, JsonContentSource, JsonProgressStore, MemoryProgressStore,
    NarrationQueue, ProgressStore, RewardRules, RewardSink, ScoreBoard, SessionEvent,
    SpeechBackend,
};

#[derive(Parser)]
#[command(about = "Replay keystrokes against a pinyin typing session")]
struct Args {
    /// Content document (JSON, keyed by category)
    #[arg(long)]
    content: PathBuf,

    /// Category key, e.g. easy, tangPoetry, homeRow
    #[arg(long, default_value = "easy")]
    category: ContentCategory,

    /// Script file; stdin when omitted
    #[arg(long)]
    script: Option<PathBuf>,

    /// TOML config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Progress file, read on start and updated as items change
    #[arg(long)]
    progress: Option<PathBuf>,

    /// Seed for lucky drops and drill repeats
    #[arg(long)]
    seed: Option<u64>,

    /// Complete narration requests without "speaking" them
    #[arg(long)]
    mute: bool,
}

/// Prints utterances instead of synthesizing them; each one ends at once.
struct LogBackend;

impl SpeechBackend for LogBackend {
    fn start(&mut self, text: &str, rate: f32) -> Result<()> {
        println!("  say {text:?} x{rate:.2}");
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn cancel(&mut self) {}
}

enum Line {
    Next,
    Previous,
    Jump(usize),
    Tick(Duration),
    Pause,
    Resume,
    Buy,
    Input(String),
}

fn parse_line(line: &str) -> Result<Option<Line>> {
    if line.starts_with('#') {
        return Ok(None);
    }
    let Some(directive) = line.strip_prefix('!') else {
        return Ok(Some(Line::Input(line.to_string())));
    };
    let mut parts = directive.split_whitespace();
    let parsed = match (parts.next(), parts.next()) {
        (Some("next"), None) => Line::Next,
        (Some("prev"), None) => Line::Previous,
        (Some("jump"), Some(n)) => Line::Jump(n.parse().with_context(|| format!("bad index {n}"))?),
        (Some("tick"), Some(secs)) => {
            let secs: f64 = secs.parse().with_context(|| format!("bad seconds {secs}"))?;
            Line::Tick(typing_core::utils::secs(secs))
        }
        (Some("pause"), None) => Line::Pause,
        (Some("resume"), None) => Line::Resume,
        (Some("buy"), None) => Line::Buy,
        _ => bail!("unknown directive: {line}"),
    };
    Ok(Some(parsed))
}

fn print_event(event: &SessionEvent) {
    match event {
        // Too chatty for a replay log
        SessionEvent::KeyPressed { .. } | SessionEvent::KeyReleased | SessionEvent::InputChanged => {}
        other => println!("  {other:?}"),
    }
}

fn run<P: ProgressStore>(args: &Args, config: Config, progress: P) -> Result<()> {
    let content = JsonContentSource::from_path(&args.content)?;

    let rules = RewardRules::from_config(&config);
    let rewards = match args.seed {
        Some(seed) => ScoreBoard::with_seed(rules, seed),
        None => ScoreBoard::new(rules),
    };

    let mut narrator = NarrationQueue::new(Box::new(LogBackend));
    narrator.set_enabled(!args.mute);

    let mut orchestrator = SessionOrchestrator::new(config, content, narrator, rewards, progress);
    if let Some(seed) = args.seed {
        orchestrator = orchestrator.with_practice_seed(seed);
    }

    orchestrator.start(args.category);
    orchestrator.drain_events().iter().for_each(print_event);

    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        let parsed = match parse_line(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = lineno + 1, "skipping: {e:#}");
                continue;
            }
        };

        println!("> {line}");
        match parsed {
            Line::Next => orchestrator.next(),
            Line::Previous => orchestrator.previous(),
            Line::Jump(index) => orchestrator.jump(index, true),
            Line::Tick(elapsed) => orchestrator.tick(elapsed),
            Line::Pause => {
                orchestrator.pause();
            }
            Line::Resume => {
                orchestrator.resume();
            }
            Line::Buy => {
                let bought = orchestrator.buy_health();
                println!("  bought health: {bought}");
            }
            Line::Input(buffer) => orchestrator.handle_input(&buffer),
        }
        orchestrator.drain_events().iter().for_each(print_event);
    }

    orchestrator.stop();
    let board = orchestrator.rewards();
    println!(
        "score {} | coins {:.2} | max combo {} | letters {} | {}",
        board.score(),
        board.coins(),
        board.max_combo(),
        board.correct_letters(),
        board.rank_title()
    );
    if let Some(session) = orchestrator.typing() {
        info!(category = %session.category(), index = session.index(), "stopped");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pinyin_typing=info,typing_core=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_toml(path)?,
        None => Config::default(),
    };

    match &args.progress {
        Some(path) => run(&args, config, JsonProgressStore::open(path)?),
        None => run(&args, config, MemoryProgressStore::new()),
    }
}
