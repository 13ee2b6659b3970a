mod commands;

use clap::{ColorChoice, Parser};
use colored::Colorize;
use commands::{Args, Commands};
use hlsave::logger::Logger;
use log::LevelFilter;
use std::{
    io::{IsTerminal, stderr},
    process,
};

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    colored::control::set_override(match args.color {
        ColorChoice::Always => true,
        ColorChoice::Auto => stderr().is_terminal(),
        ColorChoice::Never => false,
    });

    Logger::init(if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    });

    match args.command {
        Commands::Batch(args) => args.execute().await?,
        Commands::Check(args) => args.execute()?,
        Commands::Crawl(args) => args.execute().await?,
        Commands::Merge(args) => args.execute().await?,
        Commands::Save(args) => args.execute().await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
