use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    process,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use funclang::{AllocPolicy, Config, Engine};

/// Evaluate funclang programs.
#[derive(Parser)]
#[command(name = "funclang", version)]
struct Cli {
    /// Program files to evaluate in order. With none, start a REPL.
    files: Vec<PathBuf>,

    /// Number of heap slots available to `ref` and `array`.
    #[arg(long, default_value_t = funclang::walker::heap::DEFAULT_CAPACITY)]
    heap_capacity: usize,

    /// Hand out freed heap slots again instead of always advancing.
    #[arg(long)]
    reuse_freed: bool,

    /// Directory that `read` and `require` resolve file names against.
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Config {
        let policy = if self.reuse_freed { AllocPolicy::ReuseFreed } else { AllocPolicy::Monotonic };
        let config = Config::default()
            .with_heap_capacity(self.heap_capacity)
            .with_alloc_policy(policy);
        match &self.base_dir {
            Some(dir) => config.with_base_dir(dir),
            None => config,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut engine = Engine::new(cli.config());

    if cli.files.is_empty() {
        repl(&mut engine);
        return;
    }

    for path in &cli.files {
        let code = fs::read_to_string(path).unwrap_or_else(|err| {
            eprintln!("Could not read file '{}': {}", path.display(), err);
            process::exit(1);
        });

        match engine.execute(&code) {
            Ok(val) => println!("{}", val),
            Err(errors) => {
                for err in errors {
                    eprintln!("{}: {}", path.display(), err.in_context(&code));
                }
                process::exit(1);
            },
        }
    }
}

fn repl(engine: &mut Engine) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("$ ");
        if io::stdout().flush().is_err() {
            return;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => return,
        };
        if line.trim().is_empty() {
            continue;
        }

        match engine.execute(&line) {
            Ok(val) => println!("{}", val),
            Err(errors) => errors
                .iter()
                .for_each(|err| eprintln!("{}", err.in_context(&line))),
        }
    }
}
