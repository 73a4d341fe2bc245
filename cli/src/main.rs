mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{render, run, serve};
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins; otherwise `-v` / `-vv` raise the default level.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn main_impl() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Render(args) => render::run(&cli, args),
        Commands::Serve(args) => serve::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { main_impl() }
