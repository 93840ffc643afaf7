use axum::Router;
use file_lifecycle_service::core::config::Config;
use file_lifecycle_service::core::openapi::{ApiDoc, SwaggerInfoModifier};
use file_lifecycle_service::core::{database, middleware};
use file_lifecycle_service::features::file_events::{
    routes as file_events_routes, spawn_consumers, DeletionConsumer, FileEventHandler,
    FileReferencePublisher, GarbageCollectorConsumer, UsageConsumer,
};
use file_lifecycle_service::features::files::models::BlobKeyScheme;
use file_lifecycle_service::features::files::{routes as files_routes, FileService, PgFileRepository};
use file_lifecycle_service::modules::messaging::PgMessageQueue;
use file_lifecycle_service::modules::storage::MinIOClient;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: tokio_worker_threads={}, expiration_delay={:?}, pid={}",
        worker_threads,
        config.lifecycle.expiration_delay,
        std::process::id()
    );

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // Blob storage
    let minio_client = Arc::new(
        MinIOClient::new(config.minio.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    minio_client
        .prepare()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare MinIO bucket: {}", e))?;
    tracing::info!(
        "MinIO client initialized for bucket: {}",
        minio_client.bucket_name()
    );

    // Record store and queue share the pool
    let repository = Arc::new(PgFileRepository::new(pool.clone()));
    let queue = Arc::new(PgMessageQueue::new(
        pool.clone(),
        config.lifecycle.max_attempts,
        config.lifecycle.retry_backoff,
    ));
    let keys = BlobKeyScheme::new(&config.minio.upload_prefix);

    let file_service = Arc::new(FileService::new(
        repository.clone(),
        minio_client.clone(),
        queue.clone(),
        keys.clone(),
        config.lifecycle.expiration_delay,
        config.app.max_upload_size,
    ));
    let reference_publisher = Arc::new(FileReferencePublisher::new(queue.clone()));
    tracing::info!("File services initialized");

    // Consumers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handlers: Vec<Arc<dyn FileEventHandler>> = vec![
        Arc::new(UsageConsumer::new(repository.clone())),
        Arc::new(DeletionConsumer::new(
            repository.clone(),
            minio_client.clone(),
        )),
        Arc::new(GarbageCollectorConsumer::new(
            repository.clone(),
            minio_client.clone(),
            keys,
        )),
    ];
    let consumer_tasks = spawn_consumers(handlers, queue.clone(), &config.lifecycle, shutdown_rx);
    tracing::info!(
        "{} consumer workers spawned ({} per consumer)",
        consumer_tasks.len(),
        config.lifecycle.workers_per_consumer
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(files_routes(file_service, config.app.max_upload_size))
        .merge(file_events_routes(reference_publisher))
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    // Workers finish their current batch; unacknowledged messages are redelivered later
    for result in futures::future::join_all(consumer_tasks).await {
        if let Err(e) = result {
            tracing::error!("Consumer worker join error: {}", e);
        }
    }
    tracing::info!("File lifecycle service stopped");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM and tell the consumer workers to stop
async fn shutdown_signal(consumers: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, stopping gracefully...");
    let _ = consumers.send(true);
}
