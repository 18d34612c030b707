//! Keel API server binary.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use keel_core::email::{Mailer, MailerConfig};

use keel_api::services::media::MediaStore;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "keel_server", about = "Keel account service")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/keel"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,keel_api=debug,keel_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(port = args.port, "starting keel_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    keel_api::migrate(&pool).await?;

    let mut config = keel_api::config::ApiConfig::from_env();
    config.bind_addr = format!("0.0.0.0:{}", args.port);
    config.database_url = args.database_url;

    let mailer = Mailer::new(MailerConfig::from_env())?;
    let media = MediaStore::new(config.media_api_url.clone(), config.media_api_key.clone());

    let state = keel_api::AppState {
        pool,
        config: config.clone(),
        mailer,
        media,
    };

    let app = keel_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
