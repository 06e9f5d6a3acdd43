use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatekeeper::{
    app,
    config::Config,
    db::{
        connection::create_pool,
        memory::MemoryStore,
        redis::{create_redis_pool, RedisStore},
        store::KeyValueStore,
    },
    repositories::users::PgUserStore,
    state::AppState,
    utils::email::EmailService,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        redis_url = %config.redis_url.as_deref().unwrap_or("<none>"),
        access_token_secret = %mask_secret(&config.access_token_secret),
        refresh_token_secret = %mask_secret(&config.refresh_token_secret),
        csrf_secret = %mask_secret(&config.csrf_secret),
        allowed_origin = %config.allowed_origin,
        access_token_ttl_minutes = config.access_token_ttl_minutes,
        refresh_token_ttl_days = config.refresh_token_ttl_days,
        "Loaded configuration from environment/.env"
    );

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&*pool).await?;

    let store: Arc<dyn KeyValueStore> = match create_redis_pool(&config).await? {
        Some(redis_pool) => Arc::new(RedisStore::new(redis_pool)),
        None => Arc::new(MemoryStore::new()),
    };

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let email = Arc::new(EmailService::new()?);
    let state = AppState::new(store, users, email, config.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
