use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config as EditorConfig, Editor};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

use sunda::lang::eval::Interpreter;
use sunda::lang::functions::Sink;
use sunda::lang::hooks;
use sunda::lang::lexer::tokenize;
use sunda::lang::modules::FsLoader;
use sunda::lang::parse::parse;
use sunda::lang::runtime::{EvalResult, Runtime};

mod repl;

use repl::{fixup_input, ReplHelper};

const HISTORY_FILE: &str = ".sunda_history";
const PROMPT: &str = "sunda> ";

#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// Script to run. Starts a REPL if omitted
    file: Option<PathBuf>,
    /// Show debug output
    #[arg(short, long)]
    debug: bool,
    /// Print the tokens of FILE and exit
    #[arg(long, requires = "file")]
    dump_tokens: bool,
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };

    match SimpleLogger::init(filter, LogConfig::default()) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to init logger: {}", e),
    }
}

fn stdout_sink() -> Sink {
    Rc::new(RefCell::new(io::stdout()))
}

fn dump_tokens(src: &str) {
    for token in tokenize(src) {
        println!("{}", token);
    }
}

fn run_file(path: &Path, dump: bool) -> Result<()> {
    let src = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

    if dump {
        dump_tokens(&src);
        return Ok(());
    }

    let parsed = parse(&tokenize(&src));
    for diag in &parsed.diagnostics {
        eprintln!("{}", diag);
    }
    if parsed.has_errors() {
        bail!("Failed to parse {}", path.display());
    }

    // Imports resolve next to the script
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut interp = Interpreter::with_loader(stdout_sink(), Box::new(FsLoader::new(base)));
    hooks::register(&mut interp);

    for diag in interp.execute(&parsed.stmts) {
        eprintln!("{}", diag);
    }

    Ok(())
}

fn init_editor() -> Result<Editor<ReplHelper, DefaultHistory>> {
    let config = EditorConfig::builder().auto_add_history(true).build();
    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(ReplHelper::new()));

    Ok(editor)
}

fn save_history(editor: &mut Editor<ReplHelper, DefaultHistory>) -> Result<()> {
    match editor.save_history(HISTORY_FILE) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to save history: {}", e),
    }
}

fn welcome() {
    println!("Sunda v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or 'quit' to quit");
    println!();
}

fn run_repl() -> Result<()> {
    let mut editor = init_editor()?;
    let _ = editor.load_history(HISTORY_FILE);
    welcome();

    let mut rt = Runtime::new(stdout_sink(), true);
    hooks::register(rt.interpreter());

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                info!("read: {}", &line);

                match rt.eval(&fixup_input(&line)) {
                    EvalResult::Ok => (),
                    EvalResult::Quit => break,
                    EvalResult::Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Press Ctrl-D or type 'quit' to quit");
            }
            Err(ReadlineError::Eof) => {
                println!("quit");
                break;
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                println!("quit");
                break;
            }
        }
    }

    save_history(&mut editor)?;

    Ok(())
}

fn main() -> Result<()> {
    let opts = Opt::parse();
    init_logging(opts.debug)?;

    match &opts.file {
        Some(path) => run_file(path, opts.dump_tokens),
        None => run_repl(),
    }
}
