use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clipgrid_core::ffmpeg::ffmpeg_version;
use clipgrid_pipeline::{Composer, FfmpegEngine, LabelRasterizer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipgrid_api::config::ServerConfig;
use clipgrid_api::router::build_app_router;
use clipgrid_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "clipgrid_api=debug,clipgrid_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        export_concurrency = config.export_concurrency,
        "Loaded server configuration",
    );

    // --- Transcoding tools ---
    let tools = config.ffmpeg_tools();
    match ffmpeg_version(&tools).await {
        Some(version) => tracing::info!(%version, "ffmpeg available"),
        None => tracing::warn!(
            ffmpeg = %tools.ffmpeg.display(),
            "ffmpeg not runnable; exports will fail until it is installed",
        ),
    }

    // Font discovery walks the system font directories.
    let rasterizer = tokio::task::spawn_blocking(LabelRasterizer::with_system_fonts)
        .await
        .context("Font loading task failed")?;
    match rasterizer.font_faces() {
        0 => tracing::warn!("No system fonts found; burned-in labels will render without text"),
        faces => tracing::info!(faces, "Label fonts loaded"),
    }

    let composer = Composer::new(
        Arc::new(FfmpegEngine::new(tools.clone())),
        rasterizer,
        config.export_concurrency,
    );

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        tools: Arc::new(tools),
        composer: Arc::new(composer),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // In-flight exports stop issuing work and release their temporaries.
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
