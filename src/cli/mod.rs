use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::oracle::OllamaClient;
use crate::search::{SearchEvent, SearchPipeline, SearchRequest};
use crate::server;

/// Local semantic file search judged by a local LLM
#[derive(Parser, Debug)]
#[command(name = "filesage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress per-file progress (only show results/errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override the configured model name
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a folder using natural language
    Search {
        /// Search query (prompted interactively when omitted)
        query: Option<String>,

        /// Folder to search (defaults to the download directory)
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// Comma-separated extensions to consider (e.g., "txt,pdf")
        #[arg(short, long)]
        extensions: Option<String>,

        /// Output matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API server
    Serve {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Open a file with the OS default handler
    Open {
        /// Path to open
        path: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load();

    if let Some(model) = cli.model {
        config.ollama.model = model;
    }

    match cli.command {
        Commands::Search {
            query,
            folder,
            extensions,
            json,
        } => search_command(config, query, folder, extensions, json, cli.quiet).await,
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await
        }
        Commands::Open { path } => {
            server::open_with_default_handler(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            println!("{}", format!("Opened {}", path.display()).green());
            Ok(())
        }
    }
}

async fn search_command(
    config: Config,
    query: Option<String>,
    folder: Option<PathBuf>,
    extensions: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let quiet = quiet || json;

    let query = match query {
        Some(query) => query,
        None if json => bail!("a query argument is required with --json"),
        None => prompt_line("Query")?,
    };

    let folder = match folder {
        Some(folder) => folder,
        None if quiet => default_folder(),
        None => {
            let default = default_folder();
            let input = prompt_line(&format!("Folder [{}]", default.display()))?;
            if input.is_empty() {
                default
            } else {
                PathBuf::from(input)
            }
        }
    };

    let extensions = match extensions {
        Some(list) => split_extensions(&list),
        None if quiet => config.search.extensions.clone(),
        None => {
            let default = config.search.extensions.join(",");
            let input = prompt_line(&format!("Extensions [{default}]"))?;
            if input.is_empty() {
                config.search.extensions.clone()
            } else {
                split_extensions(&input)
            }
        }
    };

    let request = SearchRequest {
        query,
        folder,
        extensions,
    };

    let oracle = Arc::new(OllamaClient::new(config.ollama.clone())?);
    let pipeline = SearchPipeline::new(config.search.clone(), oracle);

    if !quiet {
        println!("{}", "🔍 Semantic file search".bright_cyan().bold());
        println!("{}", "=".repeat(60));
        println!("Query: \"{}\"", request.query.bright_yellow());
        println!("Folder: {}", request.folder.display());
        println!();
    }

    let spinner = (!quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let (tx, mut rx) = mpsc::channel(32);

    let drain = async {
        let mut matches = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                SearchEvent::Scanning { path } => {
                    if let Some(pb) = &spinner {
                        pb.set_message(format!("Reading {}", path.display()));
                    }
                }
                SearchEvent::Skipped { path } => {
                    if let Some(pb) = &spinner {
                        pb.println(
                            format!("  - {} (no content)", path.display())
                                .dimmed()
                                .to_string(),
                        );
                    }
                }
                SearchEvent::Failed { path, error } => {
                    if let Some(pb) = &spinner {
                        pb.println(format!("  ! {}: {}", path.display(), error).red().to_string());
                    }
                }
                SearchEvent::Judged {
                    path,
                    judgement,
                    matched,
                } => {
                    if let Some(pb) = &spinner {
                        let marker = if matched {
                            "✓".green().to_string()
                        } else {
                            "✗".dimmed().to_string()
                        };
                        pb.println(format!(
                            "  {} {} {}",
                            marker,
                            path.display(),
                            judgement.dimmed()
                        ));
                    }
                }
                SearchEvent::Match(found) => matches.push(found),
            }
        }
        matches
    };

    let (stats, matches) = futures::join!(pipeline.run(&request, tx), drain);
    let stats = stats?;

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    println!();
    if matches.is_empty() {
        println!("{}", "No matches found.".dimmed());
    } else {
        println!(
            "{}",
            format!("✅ {} matching file(s)", matches.len()).green().bold()
        );
        for found in &matches {
            println!("{}", format!("📄 {}", found.path.display()).bright_green());
            println!("   {}", found.justification.dimmed());
        }
    }

    println!();
    println!(
        "{}",
        format!(
            "{} files seen, {} skipped, {} judged",
            stats.files_seen, stats.files_skipped, stats.files_judged
        )
        .dimmed()
    );
    if stats.oracle_errors > 0 {
        println!(
            "{}",
            format!(
                "⚠️  {} file(s) could not be judged (inference service errors)",
                stats.oracle_errors
            )
            .yellow()
        );
    }

    Ok(())
}

fn default_folder() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn split_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().to_string())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extensions() {
        assert_eq!(split_extensions("txt,pdf"), vec!["txt", "pdf"]);
        assert_eq!(split_extensions(" txt , .PDF ,"), vec!["txt", ".PDF"]);
        assert!(split_extensions("").is_empty());
    }
}
