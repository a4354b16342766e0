//! Ren console
//!
//! Line-oriented shell over an embedded Ren engine with every linked native
//! bound into the user context.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use ren_bind::{bind_natives, Engine};
use ren_logging::{init_logging, LoggingOptions};

mod config;
mod natives;
mod session;

use config::{CliOverrides, ConfigLoader, ConsoleConfig, LogLevel};
use session::{render, Session};

#[derive(Parser, Debug)]
#[command(
    name = "ren",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive console for an embedded Ren engine",
    after_help = r#"
Environment Variables:
  REN_CONFIG=<path>        Path to a TOML configuration file
  REN_PROMPT=<text>        Prompt shown before each line
  REN_LOG_LEVEL=warn       Log level (error, warn, info, debug, trace)
  REN_MAX_EVAL_DEPTH=<n>   Maximum evaluation nesting
  REN_NO_BANNER=1          Skip the startup banner
  REN_LOG / RUST_LOG       Full tracing filter directives
"#
)]
struct Cli {
    /// Evaluate an expression and exit
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "REN_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Set log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Do not print the startup banner
    #[arg(long)]
    no_banner: bool,

    /// Prompt shown before each input line
    #[arg(long)]
    prompt: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            prompt: self.prompt.clone(),
            log_level: self.log_level,
            no_banner: self.no_banner,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = ConfigLoader::load(&cli.overrides())?;

    let _logging = init_logging(LoggingOptions {
        default_level: config.log_level.as_filter().to_string(),
        stderr: true,
        ansi: false,
    });
    debug!("console configuration: {config:?}");

    let engine = Engine::create(config.engine.clone()).context("Failed to create engine")?;
    let bound = bind_natives(&engine, engine.user_context()).context("Failed to bind natives")?;
    info!("bound natives: {}", bound.join(" "));

    let session = Session::start(engine)?;

    if let Some(expr) = &cli.eval {
        let reply = session.submit(expr)?;
        if let Some(text) = render(&reply) {
            println!("{text}");
        }
        return Ok(if reply.0 { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    repl(&session, &config)?;
    Ok(ExitCode::SUCCESS)
}

fn repl(session: &Session, config: &ConsoleConfig) -> Result<()> {
    if config.banner {
        println!("Ren console {}", env!("CARGO_PKG_VERSION"));
        println!("Type quit or exit to leave.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", config.prompt);
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        if let Some(text) = render(&session.submit(line)?) {
            println!("{text}");
        }
    }
    Ok(())
}
