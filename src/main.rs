use anyhow::Context;
use bandrec::datasource::{BitqueryDataSource, DataSource, VolumeSource};
use bandrec::orchestration::RecommendationService;
use bandrec::{api, Config};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let bitquery = Arc::new(BitqueryDataSource::new(&config));
    let datasource: Arc<dyn DataSource> = bitquery.clone();
    let volume_source: Arc<dyn VolumeSource> = bitquery;
    let service = Arc::new(RecommendationService::new(
        datasource,
        volume_source,
        config,
    ));

    let app = api::create_router(api::AppState { service });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
