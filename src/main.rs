use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc};

use nuxtpress::{
    application::{
        auth::SessionService, drafts::DraftService, error::AppError, lifecycle::SchemaLifecycle,
        posts::PostService, settings::SettingsService,
    },
    cache::{CacheConfig, CacheStore, KeySpace},
    config,
    domain::entities::SiteSettingsRecord,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        kv::{self, KvHandle},
        telemetry,
    },
};
use tokio::sync::Notify;
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
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(args) => run_migrate(settings, args.force).await,
    }
}

struct Backends {
    repositories: Arc<PostgresRepositories>,
    kv: KvHandle,
    cache: CacheStore,
}

async fn connect_backends(settings: &config::Settings) -> Result<Backends, AppError> {
    let database_url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration(
            "database url is required (provide --database-url or set NUXTPRESS__DATABASE__URL)",
        )
    })?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let kv = kv::connect(&settings.kv).await?;
    let cache = CacheStore::new(kv.store(), KeySpace::new(settings.kv.prefix.clone()));

    Ok(Backends {
        repositories,
        kv,
        cache,
    })
}

async fn run_migrate(settings: config::Settings, force: bool) -> Result<(), AppError> {
    let backends = connect_backends(&settings).await?;
    let lifecycle = SchemaLifecycle::new(backends.repositories.clone(), backends.cache.clone());

    match lifecycle.run(force).await? {
        Some(report) => info!(
            converted_columns = ?report.converted_columns,
            promoted_values = report.promoted_values,
            dropped_unique_slug = ?report.dropped_unique_slug,
            "migrations complete"
        ),
        None => info!("schema already at the current version; pass --force to run again"),
    }
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backends = connect_backends(&settings).await?;
    let purger = backends.kv.spawn_purger(settings.kv.purge_interval);

    let state = build_api_state(&settings, &backends);
    state.lifecycle.ensure().await;

    let result = serve_http(&settings, state).await;

    if let Some(handle) = purger {
        handle.abort();
        let _ = handle.await;
    }
    result
}

fn build_api_state(settings: &config::Settings, backends: &Backends) -> ApiState {
    let cache = backends.cache.clone();
    let cache_config = CacheConfig::from(&settings.cache);

    ApiState {
        sessions: Arc::new(SessionService::new(
            cache.clone(),
            settings.auth.password.as_deref(),
            settings.auth.session_ttl,
        )),
        posts: Arc::new(PostService::new(
            backends.repositories.clone(),
            cache.clone(),
            cache_config.clone(),
        )),
        drafts: Arc::new(DraftService::new(cache.clone(), cache_config.draft_ttl)),
        settings: Arc::new(SettingsService::new(
            cache.clone(),
            SiteSettingsRecord::from(&settings.site),
        )),
        lifecycle: Arc::new(SchemaLifecycle::new(backends.repositories.clone(), cache)),
        health: backends.repositories.clone(),
        secure_cookies: settings.auth.secure_cookies,
        trust_forwarded_for: settings.auth.trust_forwarded_for,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let drain = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let drain = drain.clone();
        async move { drain.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        () = shutdown_signal() => {}
    }

    info!("shutdown signal received; draining connections");
    drain.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping remaining connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
