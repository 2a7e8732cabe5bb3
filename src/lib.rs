pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export engine types
pub use logic::{
    compute_delta, reconcile_all, ClassificationPass, Delta, DeltaComputer, DeltaEntry, DeltaError,
    DeltaOptions, DeltaType, MismatchClassifier, ReconcileSummary, TemplateLinkReconciler,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{InstanceStore, MemoryStore, Store, StoreError, TypeCatalog};

/// Builds the store the server works on: the configured seed file, else the
/// demo workspace when enabled, else an empty workspace
pub fn build_store(config: &crate::config::AppConfig) -> anyhow::Result<MemoryStore> {
    if let Some(path) = &config.workspace.seed_file {
        log::info!("Loading workspace from {}", path.display());
        return Ok(MemoryStore::from_json_file(path)?);
    }

    let store = MemoryStore::default();
    if config.workspace.load_demo {
        seed::load_seed_data(&store);
    }
    Ok(store)
}
