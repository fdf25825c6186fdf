use std::{future, net::SocketAddr, process, sync::Arc};

use tokio::{net::TcpListener, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{error::AppError, groups::GroupService},
    config::{self, Command, GroupsCommand, Settings},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        memory::MemoryRepositories,
        telemetry,
    },
};

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

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        None | Some(Command::Serve(_)) => run_serve(settings).await,
        Some(Command::Migrate(_)) => run_migrate(settings).await,
        Some(Command::Groups(args)) => match args.command {
            GroupsCommand::Create(create) => {
                let repositories = connect_repositories(&settings).await?;
                let group = GroupService::new(Arc::new(repositories))
                    .create_group(&create.title, create.slug.as_deref(), &create.description)
                    .await?;
                info!(
                    target = "yatube::cli",
                    group_id = group.id,
                    slug = %group.slug,
                    "group created"
                );
                println!("{}\t{}\t{}", group.id, group.slug, group.title);
                Ok(())
            }
        },
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let (state, admin) = match settings.database.url.as_deref() {
        Some(_) => {
            let repositories = Arc::new(connect_repositories(&settings).await?);
            PostgresRepositories::run_migrations(repositories.pool())
                .await
                .map_err(InfraError::from)?;
            let state = http::build_state(repositories.clone(), &settings)?;
            let admin = http::build_admin_state(repositories, &state);
            (state, admin)
        }
        None => {
            warn!(
                target = "yatube::startup",
                "no database configured; using the in-process store, data is lost on exit"
            );
            let repositories = Arc::new(MemoryRepositories::new());
            let state = http::build_state(repositories.clone(), &settings)?;
            let admin = http::build_admin_state(repositories, &state);
            (state, admin)
        }
    };

    serve_http(&settings, state, admin).await
}

async fn run_migrate(settings: Settings) -> Result<(), AppError> {
    let repositories = connect_repositories(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(InfraError::from)?;
    info!(target = "yatube::cli", "migrations applied");
    Ok(())
}

async fn connect_repositories(settings: &Settings) -> Result<PostgresRepositories, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url is required for this command")
    })?;
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    Ok(PostgresRepositories::new(pool))
}

async fn serve_http(
    settings: &Settings,
    state: HttpState,
    admin: AdminState,
) -> Result<(), AppError> {
    let max_request_bytes =
        usize::try_from(settings.uploads.max_request_bytes.get()).unwrap_or(usize::MAX);
    let router = http::build_router(state, max_request_bytes);
    let admin_router = http::build_admin_router(admin);

    let listener = bind(settings.server.addr).await?;
    let admin_listener = bind(settings.server.admin_addr).await?;
    info!(
        target = "yatube::startup",
        addr = %settings.server.addr,
        admin_addr = %settings.server.admin_addr,
        "listening"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let public_server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(stopped(stop_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(stopped(stop_rx));

    let grace = settings.server.graceful_shutdown;
    let drain_deadline = async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline => {
            warn!(
                target = "yatube::shutdown",
                grace_seconds = grace.as_secs(),
                "in-flight requests did not finish in time"
            );
        }
    }

    info!(target = "yatube::shutdown", "server stopped");
    Ok(())
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, InfraError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "yatube::shutdown", error = %err, "failed to listen for ctrl-c");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "yatube::shutdown", error = %err, "failed to listen for SIGTERM");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!(target = "yatube::shutdown", "shutdown signal received");
}
