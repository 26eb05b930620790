use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use inventory_desk as app;
use inventory_desk::{entities::UserRole, services::users::NewUser};

#[derive(Parser)]
#[command(name = "inventory-desk", about = "Lab inventory web application", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an account, typically the first admin
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "admin", help = "admin, staff or guest")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = app::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            app::db::run_migrations(&db).await?;
            Ok(())
        }
        Commands::CreateUser {
            username,
            email,
            password,
            role,
        } => {
            app::db::run_migrations(&db).await?;
            let role = UserRole::from_str(&role)
                .map_err(|_| anyhow::anyhow!("unknown role '{}'; use admin, staff or guest", role))?;
            let mailer = app::notifications::mailer_from_config(&cfg);
            let state = app::AppState::new(db, cfg, mailer);
            let user = state
                .services
                .users
                .create(NewUser {
                    username,
                    email,
                    password,
                    role,
                })
                .await
                .map_err(|err| anyhow::anyhow!(err.response_message()))?;
            info!(user_id = user.id, role = %user.role, "created user {}", user.username);
            Ok(())
        }
        Commands::Serve => serve(db, cfg).await,
    }
}

async fn serve(db: app::db::DbPool, cfg: app::config::AppConfig) -> anyhow::Result<()> {
    if cfg.auto_migrate {
        app::db::run_migrations(&db).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    let mailer = app::notifications::mailer_from_config(&cfg);
    let state = app::AppState::new(db, cfg, mailer);

    if state.config.low_stock_alert_enabled {
        app::scheduler::start_low_stock_job(
            state.services.reports.clone(),
            state.notifier.clone(),
            state.config.low_stock_alert_hour,
        );
    } else {
        info!("daily low stock email disabled");
    }

    let router = app::app_router(state);
    info!("inventory-desk listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
