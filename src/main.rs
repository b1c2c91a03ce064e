use std::{process, sync::Arc};

use cccache::{
    application::{documents::DocumentService, error::AppError},
    cache::{CacheAdapter, CacheConfig},
    config,
    infra::{
        couchdb::{BackendConfig, CouchDbRepository},
        error::InfraError,
        http::{self, BasicAuth, HttpState},
        telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::internal(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repository = CouchDbRepository::new(&BackendConfig::from(&settings.backend))?;
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = CacheAdapter::from_config(&cache_config);

    let (auth, generated) = BasicAuth::from_settings(&settings.auth);
    if let Some(credentials) = generated {
        warn!(
            username = %credentials.username,
            password = %credentials.password,
            "no API credentials configured; generated a random pair for this run"
        );
        warn!("set API_USERNAME and API_PASSWORD to keep credentials stable across restarts");
    }

    info!(
        backend = %repository.base_url(),
        cache = cache.store_name(),
        cache_servers = ?cache_config.servers,
        prefix = cache.prefix(),
        ttl_secs = cache.default_ttl().as_secs(),
        "document service configured"
    );

    let state = HttpState {
        documents: Arc::new(DocumentService::new(Arc::new(repository), cache)),
        auth: Arc::new(auth),
        expose_dev_metadata: settings.server.expose_dev_metadata,
    };
    let router = http::build_router(state, settings.server.max_request_bytes.get());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::internal(format!("server error: {err}")))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
