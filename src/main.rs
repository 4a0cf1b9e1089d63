use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use recipe_import::server::{create_router, AppState};
use recipe_import::{
    load_config, normalize_url, ExtractedRecipe, ImageInput, ImportError, RecipeImporter,
};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "recipe-import")]
#[command(about = "Import recipes from web pages", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the import endpoint over HTTP
    Serve {
        /// Address to listen on, overriding configuration
        #[arg(long)]
        bind: Option<String>,
    },

    /// Import one URL and print the recipe as JSON
    Import {
        url: String,
        /// Print the recipe-store create payload for this owner instead
        #[arg(long)]
        owner: Option<String>,
    },

    /// Read a recipe from a photo and print it as JSON
    ImportImage {
        path: PathBuf,
        /// Print the recipe-store create payload for this owner instead
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve { bind } => serve(bind).await,
        Commands::Import { url, owner } => import(&url, owner).await,
        Commands::ImportImage { path, owner } => import_image(&path, owner).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(bind: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let address = bind.unwrap_or_else(|| config.server.bind_address.clone());
    let app = create_router(AppState::from_config(&config)?);

    let listener = TcpListener::bind(&address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn import(url: &str, owner: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    normalize_url(url).map_err(user_facing)?;
    let config = load_config()?;
    let importer = RecipeImporter::from_config(&config).map_err(user_facing)?;
    let recipe = importer.import_from_url(url).await.map_err(user_facing)?;
    print_recipe(recipe, owner)
}

async fn import_image(
    path: &Path,
    owner: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = ImageInput::from_file(path).await.map_err(user_facing)?;
    let config = load_config()?;
    let importer = RecipeImporter::from_config(&config).map_err(user_facing)?;
    let recipe = importer.import_image(&image).await.map_err(user_facing)?;
    print_recipe(recipe, owner)
}

fn print_recipe(
    recipe: ExtractedRecipe,
    owner: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = match owner {
        Some(owner) => serde_json::to_string_pretty(&recipe.into_new_recipe(owner))?,
        None => serde_json::to_string_pretty(&recipe)?,
    };
    println!("{}", output);
    Ok(())
}

fn user_facing(err: ImportError) -> Box<dyn std::error::Error> {
    error!("{}", err);
    err.user_message().into()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
