// src/main.rs - protoboard-host: drive the command engine from a terminal
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use protoboard::bridge::runtime::is_identifier;
use protoboard::bridge::{Engine, HookOutcome, HostRuntime, ScriptRuntime, ScriptValue};
use protoboard::command::{parse_command, TypedResult};
use protoboard::config::{load_config, EngineConfig};
use protoboard::hardware::SimulatedBoard;

/// Protoboard command engine host
#[derive(Parser, Debug)]
#[command(name = "protoboard-host", version, about = "Run protoboard commands against a simulated board.")]
struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (overrides logging.level)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive console (default)
    Run {
        /// Queue drain interval in milliseconds
        #[arg(long, default_value_t = 50)]
        drain_ms: u64,
    },
    /// Execute one command and print its typed result
    Exec {
        command: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse one command and print its structure
    Parse { command: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(&path.to_string_lossy()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let max_level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    let mut engine = Engine::new(SimulatedBoard::new(config.board.clone()), config.protocol.clone());
    let mut runtime = HostRuntime::new();

    match cli.command.unwrap_or(Commands::Run { drain_ms: 50 }) {
        Commands::Run { drain_ms } => run_console(&mut engine, &mut runtime, Duration::from_millis(drain_ms)).await,
        Commands::Exec { command, json } => {
            let result = match engine.call_sync(&mut runtime, &command).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("{}: {e}", e.kind());
                    std::process::exit(1);
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            Ok(())
        }
        Commands::Parse { command } => {
            let parsed = match parse_command(&command) {
                Ok(parsed) => parsed,
                Err(e) => {
                    eprintln!("{}: {e}", e.kind());
                    std::process::exit(1);
                }
            };
            println!("canonical:  {}", parsed);
            println!("function:   {}", parsed.function_name);
            println!("category:   {}", parsed.category);
            println!("sub-action: {} ({:?})", parsed.sub_action, parsed.form);
            for (i, arg) in parsed.args.iter().enumerate() {
                println!("arg[{}]:     {} ({})", i, arg, arg.value.type_name());
            }
            Ok(())
        }
    }
}

async fn run_console(
    engine: &mut Engine<SimulatedBoard>,
    runtime: &mut HostRuntime,
    drain_every: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("protoboard console ready (sync prefix {:?})", engine.protocol().sync_prefix);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut drain = tokio::time::interval(drain_every);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(engine, runtime, &line).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("stdin read failed: {}", e);
                    break;
                }
            },
            _ = drain.tick() => {
                engine.drain_queue(runtime);
                flush_console(engine);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    engine.drain_queue(runtime);
    flush_console(engine);
    let stats = engine.stats();
    tracing::info!(
        "{} commands, {} ok, {} failed",
        stats.total_commands,
        stats.successful_commands,
        stats.failed_commands
    );
    Ok(())
}

async fn handle_line(engine: &mut Engine<SimulatedBoard>, runtime: &mut HostRuntime, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    if trimmed == "globals" {
        for (name, value) in runtime.globals() {
            println!("{} = {}", name, value.literal());
        }
        return;
    }

    let protocol = engine.protocol();
    if trimmed.starts_with(protocol.sync_prefix.as_str()) || trimmed.starts_with(protocol.queue_prefix.as_str()) {
        match engine.on_console_line(runtime, trimmed) {
            HookOutcome::Queued { pending } => println!("queued ({} pending)", pending),
            HookOutcome::Rejected(e) => println!("{}: {}", e.kind(), e),
            HookOutcome::Executed(_) | HookOutcome::Passthrough(_) => {}
        }
        flush_console(engine);
        return;
    }

    if let Some((name, call)) = assignment(trimmed) {
        match engine.call_sync(runtime, call).await {
            Ok(result) => {
                if let Err(e) = runtime.set_global(name, ScriptValue::from(&result)) {
                    println!("{}", e);
                }
            }
            Err(e) => println!("{}: {}", e.kind(), e),
        }
        flush_console(engine);
        return;
    }

    if looks_like_call(trimmed) {
        match engine.call_sync(runtime, trimmed).await {
            Ok(result) => {
                flush_console(engine);
                print_result(&result);
            }
            Err(e) => {
                flush_console(engine);
                println!("{}: {}", e.kind(), e);
            }
        }
        return;
    }

    if let HookOutcome::Passthrough(text) = engine.on_console_line(runtime, line) {
        print!("{}", text);
    }
}

/// `name = call(...)`
fn assignment(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once('=')?;
    let (name, rest) = (name.trim(), rest.trim());
    (is_identifier(name) && looks_like_call(rest)).then_some((name, rest))
}

fn looks_like_call(text: &str) -> bool {
    match text.find('(') {
        Some(open) => is_identifier(text[..open].trim()) && text.ends_with(')'),
        None => false,
    }
}

fn print_result(result: &TypedResult) {
    println!("{} ({})", result.value_text, result.type_tag.as_str());
}

fn flush_console(engine: &mut Engine<SimulatedBoard>) {
    for line in engine.take_console() {
        println!("{}", line);
    }
}
