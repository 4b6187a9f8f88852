pub mod auth;
pub mod books;

use std::sync::Arc;

use sqlx::SqlitePool;

use shelf_auth::{IdentityProvider, OidcProvider, SessionGate};
use shelf_kernel::settings::Settings;
use shelf_kernel::ModuleRegistry;

/// Register all application modules with the registry.
///
/// The session gate is built once here and shared by every module that
/// guards requests; the provider adapter only exists when one is
/// configured.
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    db: &SqlitePool,
) -> anyhow::Result<()> {
    let gate = SessionGate::from_settings(&settings.auth, db)?;

    let provider = settings
        .auth
        .provider
        .clone()
        .map(|cfg| Arc::new(OidcProvider::new(cfg)) as Arc<dyn IdentityProvider>);

    registry.register(auth::create_module(db.clone(), gate.clone(), provider));
    registry.register(books::create_module(db.clone(), gate));

    Ok(())
}
