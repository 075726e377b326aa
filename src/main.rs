use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lectern::config;
use lectern::device;
use lectern::document::Article;
use lectern::theme::{ThemeStore, initial_theme};

#[derive(Parser)]
#[command(name = "lectern", about = "Long-form article viewer for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input Markdown file
    #[arg(global = true)]
    input: Option<PathBuf>,

    /// Theme name (light or dark)
    #[arg(long, global = true)]
    theme: Option<String>,

    /// Disable smooth scrolling animations
    #[arg(long, global = true)]
    reduced_motion: bool,

    /// Disable automatic file watching (viewer reloads on file change by default)
    #[arg(long, global = true)]
    no_watch: bool,

    /// Log output file path (enables logging when specified)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the table of contents with row offsets
    Toc {
        /// Input Markdown file
        input: PathBuf,

        /// Layout width in columns
        #[arg(long, default_value_t = 80)]
        width: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = std::fs::File::create(log_path).expect("failed to open log file");
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else if cli.command.is_some() {
        env_logger::init();
    }
    // viewer mode + no --log → logger not initialized (raw terminal owns stderr)

    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    let reduced_motion = cli.reduced_motion || device::reduced_motion_env();
    cfg.merge_cli(cli.theme, reduced_motion, cli.no_watch);

    let result = match cli.command {
        Some(Command::Toc { input, width }) => cmd_toc(&input, width),
        None => {
            let input = match cli.input {
                Some(p) => p,
                None => {
                    eprintln!("Error: input file required");
                    std::process::exit(1);
                }
            };
            let term_cols = crossterm::terminal::size().map(|(c, _)| c).unwrap_or(80);
            let class = device::detect(term_cols);
            let config = cfg.resolve(class);
            let store = ThemeStore::open_default();
            let theme = initial_theme(config.theme.as_deref(), &store);
            lectern::viewer::run(input, config, theme, store)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_toc(input: &Path, width: usize) -> Result<()> {
    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let article = Article::parse(&markdown);
    if article.is_empty() {
        anyhow::bail!("input file is empty or contains only whitespace");
    }
    let layout = article.layout(width);
    for (i, (entry, section)) in layout.toc.iter().zip(&layout.sections).enumerate() {
        let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
        println!(
            "{:>3}  {:>5}  {}{} (#{})",
            i + 1,
            section.top_offset as usize,
            indent,
            entry.title,
            entry.id
        );
    }
    Ok(())
}
