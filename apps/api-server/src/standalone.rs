use crate::{ai::AIHandler, config::ServerConfig, ctx::Ctx, routes::get_routes};
use dotenvy::dotenv;
use image_source::{ImageAcquirer, ImageFetcher, SampleGallery};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub async fn start_server() -> anyhow::Result<()> {
    let dotenv_result = dotenv();

    let config = ServerConfig::from_env()?;
    match &config.log_dir {
        Some(log_dir) => analytics_tracing::init_tracing_to_file(log_dir.clone()),
        None => analytics_tracing::init_tracing_to_stdout(),
    }

    // should be logged after tracing is initialized
    match dotenv_result {
        Ok(path) => tracing::info!(".env read successfully from {}", path.display()),
        Err(e) => tracing::debug!("Could not load .env file: {e}"),
    };
    tracing::debug!("config: {:?}", config);

    std::fs::create_dir_all(&config.resources_dir)?;

    let gallery = SampleGallery::load_or_builtin(config.samples_file())?;
    let acquirer = ImageAcquirer::new(
        ImageFetcher::new(config.fetch_timeout, config.max_image_bytes)?,
        gallery,
    );
    let ai_handler = AIHandler::new(&config)?;

    let listen_addr = config.listen_addr;
    let ctx = Ctx::new(config, ai_handler, acquirer);

    let app: axum::Router = get_routes(ctx)
        .layer(TraceLayer::new_for_http())
        .layer({
            let cors = CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any);
            cors
        });

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl-C received, shut down...");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, shut down...");
        },
    }
}
