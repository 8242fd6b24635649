//! CLI entry point for quire

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire::commands::list::ListFilter;
use quire::config::BuildOptions;
use quire::server::ServeOptions;
use quire::Site;

#[derive(Parser)]
#[command(name = "quire")]
#[command(author)]
#[command(version)]
#[command(about = "A static site generator for Markdown documents with frontmatter", long_about = None)]
struct Cli {
    /// Site root (defaults to the current directory)
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `build` and `serve`
#[derive(Args, Debug, Clone)]
struct BuildArgs {
    /// Include content marked as draft
    #[arg(short = 'D', long = "buildDrafts")]
    build_drafts: bool,

    /// Include content with a date in the future
    #[arg(short = 'F', long = "buildFuture")]
    build_future: bool,

    /// Write the site here instead of the configured publish dir
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Override the configured base URL
    #[arg(long = "baseURL")]
    base_url: Option<String>,

    /// Leave stale files in the publish dir
    #[arg(long = "noClean")]
    no_clean: bool,
}

impl BuildArgs {
    fn options(self) -> BuildOptions {
        BuildOptions {
            build_drafts: self.build_drafts,
            build_future: self.build_future,
            destination: self.destination,
            base_url: self.base_url,
            no_clean: self.no_clean,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the publish dir
    #[command(alias = "b")]
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build, serve and rebuild on changes
    #[command(alias = "server", alias = "s")]
    Serve {
        #[command(flatten)]
        build: BuildArgs,

        /// Interface to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 1313)]
        port: u16,

        /// Do not inject the live reload script
        #[arg(long = "disableLiveReload")]
        disable_live_reload: bool,
    },

    /// Create a content file from an archetype
    New {
        /// Path under the content dir, e.g. posts/my-post.md
        path: String,
    },

    /// Scaffold a new site
    Init {
        /// Directory to create the site in
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// List content as CSV
    List {
        #[arg(value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },

    /// Remove the publish dir
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "quire=debug" } else { "quire=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.source {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Build { build } => {
            let site = Site::new(&base_dir)?.with_options(build.options());
            let report = site.build()?;
            for skipped in &report.skipped {
                eprintln!("Skipped {}: {}", skipped.path, skipped.error);
            }
            if !report.is_success() {
                for failure in &report.failed {
                    eprintln!("Failed {}: {}", failure.source, failure.error);
                }
                bail!("{} pages failed to render", report.failed.len());
            }
            println!(
                "Built {} pages and {} assets in {} ms",
                report.summary.pages,
                report.summary.assets,
                report.elapsed.as_millis()
            );
        }

        Commands::Serve {
            build,
            bind,
            port,
            disable_live_reload,
        } => {
            let site = Site::new(&base_dir)?.with_options(build.options());
            let options = ServeOptions {
                bind,
                port,
                live_reload: !disable_live_reload,
            };
            quire::server::start(site, options).await?;
        }

        Commands::New { path } => {
            let site = Site::new(&base_dir)?;
            let created = site.new_content(&path)?;
            println!("Created {}", created.display());
        }

        Commands::Init { dir } => {
            let target_dir = if dir.is_absolute() {
                dir
            } else {
                base_dir.join(dir)
            };
            quire::commands::init::init_site(&target_dir)?;
            println!("Created new site in {}", target_dir.display());
        }

        Commands::List { filter } => {
            let site = Site::new(&base_dir)?;
            quire::commands::list::run(&site, filter)?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
            println!("Cleaned {}", site.public_dir.display());
        }

        Commands::Version => {
            println!("quire {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
