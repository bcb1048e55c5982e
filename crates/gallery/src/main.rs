mod cli;
mod clipboard;
mod editor;
mod paths;
mod run;
mod session;
mod settings;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::List(args)) => run::list(args),
        Some(Command::Check(args)) => run::check(args),
        None => run::run(cli.run),
    }
}
