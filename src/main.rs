use be::{
    config::ExecConfig,
    diagnostics::{report_io_error, report_runtime_error, report_syntax_error},
    render_ir, run_source, Error,
};
use clap::{Parser, Subcommand};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
};

const EXIT_UNREADABLE: u8 = 2;
const EXIT_SYNTAX: u8 = 65;
const EXIT_RUNTIME: u8 = 70;

#[derive(Parser)]
#[command(name = "be", about = "Run programs written in the be pipeline language", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and execute a source file
    Run { file: PathBuf },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { file } => run(&file, &ExecConfig::from_env()),
    }
}

fn run(path: &Path, config: &ExecConfig) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            report_io_error(path, &err);
            return ExitCode::from(EXIT_UNREADABLE);
        }
    };

    if config.dump_ir {
        if let Ok(listing) = render_ir(&source) {
            eprintln!("{listing}");
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run_source(&source, config, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(Error::Syntax(err)) => {
            report_syntax_error(path, &source, &err);
            ExitCode::from(EXIT_SYNTAX)
        }
        Err(Error::Runtime(err)) => {
            report_runtime_error(&err);
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}
