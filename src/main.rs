use axum::serve;
use product_delta::api::handlers::ServiceState;
use product_delta::api::routes::create_router;
use product_delta::config::AppConfig;
use product_delta::{build_store, DeltaComputer, InstanceStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    println!("product-delta: product model reconciliation server");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, locale={}",
        config.server.host, config.server.port, config.engine.default_locale
    );

    let store = build_store(&config)?;
    println!("Workspace ready with {} components", store.component_ids().len());

    let state = Arc::new(ServiceState::new(store, DeltaComputer::new(config.engine.clone())));

    run_server(create_router().with_state(state), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("product-delta server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
