use anyhow::Context;
use folio::{
    auth::{AdminAccount, AuthService, SessionGate},
    db,
    files::LocalFileStore,
    publishing::PostService,
    store::{
        MemoryPostStore, MemorySessionStore, PgPostStore, PgSessionStore, PostStore,
        SessionStore,
    },
    web, Config,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Backend {
    posts: Arc<dyn PostStore>,
    sessions: Arc<dyn SessionStore>,
    pool: Option<PgPool>,
}

async fn open_backend(config: &Config) -> anyhow::Result<Backend> {
    let Some(database_url) = config.database_url() else {
        tracing::warn!("DATABASE_URL is not set, posts and sessions are kept in memory");
        return Ok(Backend {
            posts: Arc::new(MemoryPostStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            pool: None,
        });
    };

    let pool = db::create_pool(database_url, config.db_max_connections)
        .await
        .context("Failed to connect to the database")?;
    db::migrate(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Connected to Postgres");

    Ok(Backend {
        posts: Arc::new(PgPostStore::new(pool.clone())),
        sessions: Arc::new(PgSessionStore::new(pool.clone())),
        pool: Some(pool),
    })
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("hash-password") {
        let password = args
            .next()
            .context("usage: folio hash-password <password>")?;
        println!("{}", AuthService::hash_password(&password)?);
        return Ok(());
    }

    init_tracing();

    let config = Config::load().context("Failed to load configuration")?;

    tracing::info!("Starting folio");
    tracing::info!("Web server will listen on: {}", config.web_addr());

    let backend = open_backend(&config).await?;

    if config.admin_password_hash().is_none() {
        tracing::warn!("ADMIN_PASSWORD_HASH is not set, admin login is disabled");
    }
    let gate = Arc::new(SessionGate::new(
        backend.sessions.clone(),
        AdminAccount {
            email: config.admin_email.clone(),
            password_hash: config.admin_password_hash().map(str::to_string),
        },
        config.session_ttl(),
    ));

    let files = Arc::new(
        LocalFileStore::open(&config.upload_dir, config.upload_base_url.clone())
            .await
            .context("Failed to prepare the upload directory")?,
    );

    let posts = PostService::new(backend.posts.clone(), gate.clone());
    let app_state = web::AppState::new(posts, gate, files.clone());
    let app = web::router(app_state, &files);

    let result = web::serve(config.web_addr(), app, shutdown_signal()).await;

    if let Some(pool) = backend.pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }

    result?;
    Ok(())
}
