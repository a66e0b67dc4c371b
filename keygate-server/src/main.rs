use std::sync::Arc;

use color_eyre::eyre::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use keygate_adapters::{
    JwtTokenIssuer, PostgresUnitOfWorkStarter, Settings, Sha512Hasher, StaticSalter, SystemClock,
    UuidIdProvider, http::router,
};
use keygate_application::{AuthService, TokenLifetimes};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    // An .env file is a local-development convenience, not a requirement.
    let _ = dotenvy::dotenv();

    let settings = Settings::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.postgres.max_connections)
        .connect(settings.postgres.url.expose_secret())
        .await?;

    sqlx::migrate!().run(&pool).await?;

    let lifetimes = TokenLifetimes {
        access: chrono::Duration::seconds(settings.auth.access_token_ttl_secs),
        refresh: chrono::Duration::seconds(settings.auth.refresh_token_ttl_secs),
    };

    let service = Arc::new(AuthService::new(
        lifetimes,
        Arc::new(PostgresUnitOfWorkStarter::new(pool)),
        Arc::new(SystemClock),
        Arc::new(UuidIdProvider),
        Arc::new(Sha512Hasher),
        Arc::new(StaticSalter::new(settings.auth.static_salt.clone())),
        Arc::new(JwtTokenIssuer::new(&settings.auth.signing_key)),
    ));

    let listener = TcpListener::bind(&settings.application.address).await?;
    tracing::info!(address = %settings.application.address, "starting keygate");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install shutdown signal handler");
    tracing::info!("shutting down gracefully");
}

fn init_tracing() -> Result<()> {
    let fmt_layer = fmt::layer().compact();
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}
