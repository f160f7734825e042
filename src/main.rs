//! usp command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use usp::{sitemap_tree_for_homepage_with, Sitemap, TreeOptions};

/// Discover and list a website's sitemaps and pages.
#[derive(Parser, Debug)]
#[command(name = "usp")]
#[command(version)]
#[command(about = "Sitemap discovery and parsing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download, parse and list the sitemap structure of a site
    Ls {
        /// URL of the site including protocol
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = LsFormat::Tabtree)]
        format: LsFormat,

        /// Don't discover sitemaps through robots.txt
        #[arg(short = 'r', long = "no-robots")]
        no_robots: bool,

        /// Don't discover sitemaps through well-known URLs
        #[arg(short = 'k', long = "no-known")]
        no_known: bool,

        /// Strip the supplied URL from each page and sitemap URL
        #[arg(short = 'u', long = "strip-url")]
        strip_url: bool,

        /// Increase logging verbosity (-v, -vv)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Write logs to a file instead of stderr
        #[arg(short = 'l', long = "log-file", value_name = "PATH")]
        log_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    /// Sitemaps and pages, nested with tab indentation
    Tabtree,
    /// Flat list of pages, one per line
    Pages,
}

impl std::fmt::Display for LsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tabtree => f.write_str("tabtree"),
            Self::Pages => f.write_str("pages"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ls {
            url,
            format,
            no_robots,
            no_known,
            strip_url,
            verbose,
            log_file,
        } => {
            setup_logging(verbose, log_file.as_deref())?;

            let options = TreeOptions {
                use_robots_txt: !no_robots,
                use_known_paths: !no_known,
                ..TreeOptions::default()
            };

            let tree = match sitemap_tree_for_homepage_with(&url, None, options).await {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::error!("Failed to fetch sitemap tree for {url}: {e}");
                    return Err(e.into());
                }
            };

            let strip_prefix = if strip_url {
                tree.url().to_string()
            } else {
                String::new()
            };

            match format {
                LsFormat::Tabtree => print_tabtree(&tree, &strip_prefix, 0),
                LsFormat::Pages => print_pages(&tree, &strip_prefix),
            }
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity and log destination.
fn setup_logging(verbose: u8, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match verbose {
        0 => EnvFilter::new("usp=warn"),
        1 => EnvFilter::new("usp=info"),
        _ => EnvFilter::new("usp=debug"),
    };

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

/// Strips a URL prefix, keeping a leading slash so output stays readable.
fn strip_url_prefix(url: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return url.to_string();
    }
    match url.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        Some(rest) => format!("/{rest}"),
        None => url.to_string(),
    }
}

/// Prints the tree with tab indentation, sitemaps first, then pages.
fn print_tabtree(sitemap: &Sitemap, strip_prefix: &str, depth: usize) {
    let url = if depth == 0 {
        sitemap.url().to_string()
    } else {
        strip_url_prefix(sitemap.url(), strip_prefix)
    };
    println!("{}{}", "\t".repeat(depth), url);

    for sub_sitemap in sitemap.sub_sitemaps() {
        print_tabtree(sub_sitemap, strip_prefix, depth + 1);
    }
    for page in sitemap.pages() {
        println!(
            "{}{}",
            "\t".repeat(depth + 1),
            strip_url_prefix(&page.url, strip_prefix)
        );
    }
}

/// Prints all pages of the tree, one URL per line.
fn print_pages(sitemap: &Sitemap, strip_prefix: &str) {
    for page in sitemap.all_pages() {
        println!("{}", strip_url_prefix(&page.url, strip_prefix));
    }
}
