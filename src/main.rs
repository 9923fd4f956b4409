// Wed Oct 14 2026 - Alex

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use struct_layout::{
    config::Config,
    engine::LayoutEngine,
    layout::{LayoutPrinter, LayoutSerializer, LocationFilter},
    source::BackendKind,
    utils::LoggingUtils,
};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Reconstructs the memory layout of the type at a source location", long_about = None)]
struct Args {
    /// Symbol source backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Record layout or symbol database document
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Source file the cursor is in
    #[arg(short, long)]
    file: Option<String>,

    #[arg(short, long)]
    line: Option<u32>,

    #[arg(short, long)]
    column: Option<u32>,

    /// Artifact path, defaults to output.slbin
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the layout tree
    #[arg(long)]
    show: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON configuration file, overridden by explicit flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log through env_logger and RUST_LOG
    #[arg(long)]
    env_log: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(Config, bool)> {
        let mut config = match &self.config {
            Some(path) => {
                Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => Config::default(),
        };
        if let Some(backend) = self.backend {
            config = config.with_backend(backend);
        }
        if let Some(input) = self.input {
            config = config.with_input(input);
        }
        if let Some(output) = self.output {
            config = config.with_output_file(output);
        }
        let mut location = config.location.clone();
        if let Some(file) = self.file {
            location.file = file;
        }
        if let Some(line) = self.line {
            location.line = line;
        }
        if let Some(column) = self.column {
            location.column = column;
        }
        config = config.with_location(location);
        if self.verbose > 0 {
            config = config.with_verbosity(self.verbose as usize);
        }
        let show = config.show_layout || self.show;
        config = config.with_show_layout(show);
        Ok((config, self.env_log))
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let (config, env_log) = Args::parse().into_config()?;

    let level = LoggingUtils::level_from_verbosity(config.verbosity);
    if env_log || std::env::var_os("RUST_LOG").is_some() {
        LoggingUtils::init_from_env(level);
    } else {
        LoggingUtils::init_logger(level);
    }

    if let Err(reason) = config.validate() {
        bail!("Invalid configuration: {}", reason);
    }

    let filter: &LocationFilter = &config.location;
    println!("{} Resolving {} with the {} backend", "[*]".blue(), filter, config.backend);

    let mut engine = LayoutEngine::from_config(&config)?;
    let result = engine.resolve(filter).context("Failed to open symbol source")?;

    match &result.root {
        Some(root) => println!("{} Found {} ({} bytes)", "[+]".green(), root.type_name, root.size),
        None => println!("{} No type at {}", "[-]".yellow(), filter),
    }

    if config.show_layout {
        let printer = LayoutPrinter::new().with_color(colored::control::SHOULD_COLORIZE.should_colorize());
        print!("{}", printer.render(&result));
    }

    let written = LayoutSerializer::write_to_file(&result, &config.output_file)?;
    println!(
        "{} Wrote {} bytes to {}",
        "[+]".green(),
        written,
        config.output_file.display()
    );
    Ok(())
}
