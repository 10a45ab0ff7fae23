use anyhow::{Context, Result};
use clap::Parser;
use shexpect::buffer::DEFAULT_CAPACITY;
use shexpect::{Engine, LineEncoding, SessionConfig, SpawnCommand, parse_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "shexpect",
    about = "Run a send/expect script against an interactive shell session",
    version
)]
struct Args {
    /// Path to the script file
    #[arg(short, long)]
    script: String,

    /// Command to run
    #[arg(short, long)]
    command: String,

    /// Arguments to pass to the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Session identifier shown in logs and errors (e.g. a device serial)
    #[arg(long, default_value = "local")]
    session_id: String,

    /// Encoding of the child's output (utf8, utf8-lossy, latin1)
    #[arg(long, default_value = "utf8")]
    encoding: LineEncoding,

    /// Maximum number of captured lines kept in memory
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Run the command inside a pseudo-terminal instead of plain pipes
    #[arg(long)]
    pty: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let commands = parse_file(&args.script)
        .with_context(|| format!("Failed to parse script file: {}", args.script))?;

    let config = SessionConfig::default()
        .with_capacity(args.capacity)
        .with_encoding(args.encoding);
    let command = SpawnCommand::new(&args.command).args(&args.args);

    let mut engine = Engine::spawn(&args.session_id, &command, config, args.pty)
        .context("Failed to spawn session")?;

    engine
        .execute(commands)
        .context("Failed to execute script")?;

    Ok(())
}
