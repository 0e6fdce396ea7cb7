mod configuration;
mod error;
mod handler;

use anyhow::Result;
use quill::agent::Agent;
use quill::database::MySqlDatabase;
use quill::providers::google::GoogleProvider;
use quill::registry::ToolRegistry;
use quill::toolbox::Toolbox;
use quill::tools::database::DatabaseToolbox;
use quill::tools::image::ImageToolbox;
use quill::workflow::Workflow;
use serenity::all::{Client, GatewayIntents};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::configuration::Settings;
use crate::handler::Handler;

/// RUST_LOG if set, otherwise `info`
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    // Loaded before tracing so RUST_LOG can live in .env.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let settings = Settings::new()?;
    info!(provider = ?settings.provider, database = ?settings.database, "loaded configuration");

    let output_dir = settings.paths.output_dir.clone();
    let upload_dir = settings.paths.upload_dir.clone();

    let provider = Arc::new(GoogleProvider::new(settings.provider.into_config())?);
    let database = Arc::new(MySqlDatabase::new(&settings.database.into_config()));

    let image = Arc::new(ImageToolbox::new(provider.clone(), &output_dir));
    let toolboxes: Vec<Arc<dyn Toolbox>> = vec![
        Arc::new(DatabaseToolbox::new(database, &output_dir)),
        image.clone(),
    ];
    let registry = ToolRegistry::new(toolboxes)?;
    let agent = Agent::new(provider, registry, settings.agent.into_config())?;
    let workflow = Arc::new(Workflow::new(agent, image));

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&settings.discord.token, intents)
        .event_handler(Handler::new(workflow, output_dir, upload_dir))
        .await?;

    info!("starting bot");
    client.start().await?;
    Ok(())
}
