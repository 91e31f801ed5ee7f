mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => {
            let config = run::resolve_config(cli.config.as_deref(), &cli.run)?;
            match config_cmd.action {
                ConfigAction::Print => run::print_config(&config),
                ConfigAction::Check => run::check_config(&config),
            }
        }
        None => run::run(cli.config.as_deref(), &cli.run),
    }
}
