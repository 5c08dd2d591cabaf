use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use valvectl::{
    config::{CtlConfig, Overrides},
    ctx::AppContext,
    edit::EditHandler,
};

#[derive(Parser)]
#[command(name = "valvectl", version, about = "Manage pipeline valves", long_about = None)]
struct Cli {
    /// Config file [default: ./valvectl.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path prefix in front of `/api`
    #[arg(long, global = true)]
    api_prefix: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "VALVECTL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pipelines
    List,

    /// Show the valves of a pipeline
    Show { id: String },

    /// Print the valve settings panel as HTML
    Render {
        id: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Set valves from `key=value` pairs and save
    Set {
        id: String,
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Edit valves in a terminal form
    Edit { id: Option<String> },

    /// Upload a pipeline file
    Upload { file: PathBuf },

    /// Delete a pipeline
    Delete {
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = CtlConfig::load(cli.config.as_deref()).await?;
    config.apply(Overrides {
        base_url: cli.base_url,
        api_prefix: cli.api_prefix,
        token: cli.token,
    });
    debug!("backend {}", config.base_url);

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::List => ctx.list_pipelines().await?,
        Commands::Show { id } => ctx.show_valves(&id).await?,
        Commands::Render { id, output } => ctx.render_valves(&id, output.as_deref()).await?,
        Commands::Set { id, assignments } => ctx.set_valves(&id, &assignments).await?,
        Commands::Edit { id } => EditHandler::handle_edit(&ctx, id).await?,
        Commands::Upload { file } => ctx.upload_pipeline(&file).await?,
        Commands::Delete { id, yes } => ctx.delete_pipeline(&id, yes).await?,
    }

    Ok(())
}
