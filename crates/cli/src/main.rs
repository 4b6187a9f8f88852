use anyhow::Context;
use clap::{Parser, Subcommand};

use shelf_kernel::settings::Settings;
use shelf_kernel::ModuleRegistry;

#[derive(Parser)]
#[command(name = "shelf", version, about = "Shelf service control")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending module migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => shelf_app::run(settings).await,
        Command::Migrate => {
            let db = shelf_db::connect(&settings.database).await?;

            let mut registry = ModuleRegistry::new();
            shelf_app::register_all(&mut registry, &settings, &db)?;
            shelf_db::migrate(&db, registry.collect_migrations()).await?;

            tracing::info!("migrations applied");
            Ok(())
        }
    }
}
