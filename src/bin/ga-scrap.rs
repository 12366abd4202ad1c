//! ga-scrap command line
//!
//! One-shot scraping from the shell: open a page, read the text of a selector,
//! print it and shut the browser down.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ga_scrap::{Scraper, ScraperConfig, operations::screenshot};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ga-scrap")]
#[command(version)]
#[command(about = "Blocking browser automation on a dedicated worker thread", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text of the elements matching SELECTOR on URL
    Scrape {
        url: String,

        selector: String,

        /// Print every match instead of the first one
        #[arg(long, short = 'a')]
        all: bool,

        /// Launch browser in headed mode (default: headless)
        #[arg(long, short = 'H')]
        headed: bool,

        /// Log failures and keep going instead of aborting
        #[arg(long, short = 'r')]
        resilient: bool,

        /// Per-operation timeout in milliseconds
        #[arg(long, short = 't', value_name = "MS")]
        timeout: Option<u64>,

        /// JSON or YAML configuration file
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,

        /// Save a screenshot after scraping (default name: screenshot_<timestamp>.png)
        #[arg(long, short = 's', value_name = "PATH", num_args = 0..=1)]
        screenshot: Option<Option<PathBuf>>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Scrape { url, selector, all, headed, resilient, timeout, config, screenshot: shot } => {
            let mut config = match config {
                Some(path) => ScraperConfig::from_file(&path)
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
                None => ScraperConfig::default(),
            };
            if headed {
                config.launch.headless = false;
            }
            if resilient {
                config = config.resilient();
            }
            if let Some(millis) = timeout {
                config = config.timeout_ms(millis);
            }

            log::info!("Scraping '{}' from {} ({} mode)", selector, url, config.mode);
            let scraper = Scraper::launch(config).context("Failed to start browser session")?;
            scraper.goto(&url)?;

            let texts = if all {
                scraper.get_texts(&selector)?
            } else {
                scraper.get_text(&selector)?.map(|text| vec![text])
            };

            if let Some(path) = shot {
                scraper.perform(screenshot(path))?;
            }

            let stats = scraper.session().stats();
            scraper.stop();

            match texts {
                Some(texts) => {
                    for text in texts {
                        println!("{}", text);
                    }
                }
                None => bail!(
                    "Nothing extracted for '{}' ({} of {} operations failed)",
                    selector,
                    stats.suppressed,
                    stats.dispatched
                ),
            }
        }
    }

    Ok(())
}
