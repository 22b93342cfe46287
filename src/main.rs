use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

use intern_portal::config::{Config, StoreBackend};
use intern_portal::db::init_db;
use intern_portal::docs::ApiDoc;
use intern_portal::routes;
use intern_portal::state::AppState;
use intern_portal::store::{MemoryStore, MySqlStore};

use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Intern portal is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let cache_ttl = Duration::from_secs(config.user_cache_ttl);
    let state = match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url)
                .await
                .context("Failed to connect to database")?;
            let store = MySqlStore::new(pool);
            if config.run_migrations {
                store.migrate().await.context("Failed to run migrations")?;
                info!("Migrations applied");
            }
            AppState::new(Arc::new(store), cache_ttl)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), cache_ttl)
        }
    };

    match (&config.sadmin_username, &config.sadmin_password) {
        (Some(username), Some(password)) => {
            state
                .users
                .ensure_super_admin(username, password)
                .await
                .context("Failed to create bootstrap super admin")?;
        }
        (None, None) => {}
        _ => warn!("SADMIN_USERNAME and SADMIN_PASSWORD must both be set, skipping bootstrap"),
    }

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} matches JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .configure(|cfg| state.register(cfg))
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
