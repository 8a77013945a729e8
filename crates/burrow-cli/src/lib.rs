//! burrow — run a term tree in a fresh kernel.
//!
//! The tree is the JSON form of [`Term`], as a parser would produce it:
//!
//! ```json
//! {"kind": "simple", "words": [{"kind": "literal", "value": "echo"},
//!                              {"kind": "literal", "value": "hi"}]}
//! ```
//!
//! The session's terminal receives both stdout and stderr of the tree; its
//! scrollback is printed once the tree finishes.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use burrow_kernel::{Kernel, KernelConfig, Term};

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "burrow", version, about = "Run a burrow term tree")]
pub struct Args {
    /// Kernel configuration (TOML). Missing fields keep their defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Create a level before running; the first one becomes `$LEVEL`.
    #[arg(long = "level", value_name = "NAME")]
    pub levels: Vec<String>,

    /// Run the session as interactive (prompts are shown).
    #[arg(long)]
    pub interactive: bool,

    /// A line of terminal input; repeat for more. Input ends after the last.
    #[arg(long = "input", value_name = "LINE")]
    pub input: Vec<String>,

    /// The term tree, as JSON; `-` reads standard input.
    #[arg(value_name = "TREE.json")]
    pub tree: String,
}

/// What a run left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub screen: Vec<String>,
}

pub fn load_config(path: Option<&Path>) -> Result<KernelConfig> {
    let Some(path) = path else {
        return Ok(KernelConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Read a term tree from `source`, a path or `-` for stdin.
pub fn load_tree(source: &str) -> Result<Term> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading term tree from stdin")?;
        text
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading term tree {source}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing term tree {source}"))
}

/// Boot a kernel, open one session and run `term` in it.
pub async fn execute(args: &Args, config: KernelConfig, term: Term) -> Result<Outcome> {
    let kernel = Kernel::new(config)?;
    let session = kernel.open_session(args.interactive)?;

    for (i, name) in args.levels.iter().enumerate() {
        let path = kernel.ensure_level(name).await?;
        if i == 0 {
            session.set_var("LEVEL", path)?;
        }
    }

    for line in &args.input {
        session.tty().send_line(line.clone());
    }
    session.tty().close_input();

    let code = kernel.execute(&session, term).await?;
    tracing::debug!(code, "tree finished");

    let scrollback = session.tty().screen();
    let mut screen: Vec<String> = scrollback.lines().map(str::to_string).collect();
    if !scrollback.partial().is_empty() {
        screen.push(scrollback.partial().to_string());
    }
    Ok(Outcome { code, screen })
}

/// Run the CLI: print the scrollback and return the exit status.
pub fn run(args: Args) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let term = load_tree(&args.tree)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let outcome = runtime.block_on(execute(&args, config, term))?;

    for line in &outcome.screen {
        println!("{line}");
    }
    Ok(outcome.code)
}
