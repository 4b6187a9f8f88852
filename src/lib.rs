//! Shelf Application Library
//!
//! This library provides the application modules and the boot path shared
//! by the server binary and the CLI.

pub mod modules;

pub use modules::register_all;

use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};

/// Boot the application: connect the store, run the module lifecycle,
/// serve HTTP until shutdown, then stop modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let db = shelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings, &db)?;

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };

    registry.init_all(&ctx).await?;
    shelf_db::migrate(&db, registry.collect_migrations()).await?;
    registry.start_all(&ctx).await?;

    shelf_http::start_server(&registry, &settings).await?;

    registry.stop_all().await?;
    Ok(())
}
