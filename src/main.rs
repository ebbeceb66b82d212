use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::io;

use taskboard::auth::{PasswordHasher, TokenService};
use taskboard::config::{Config, StorageBackend};
use taskboard::routes;
use taskboard::state::AppState;
use taskboard::store::{postgres::MIGRATOR, Store};

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

async fn build_store(storage: &StorageBackend) -> io::Result<Store> {
    match storage {
        StorageBackend::Postgres {
            url,
            max_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(url)
                .await
                .map_err(startup_error)?;
            MIGRATOR.run(&pool).await.map_err(startup_error)?;
            log::info!("Connected to PostgreSQL, migrations applied");
            Ok(Store::postgres(pool))
        }
        StorageBackend::Memory => {
            log::warn!("Using the in-memory store; data will not survive a restart");
            Ok(Store::memory())
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(startup_error)?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let store = build_store(&config.storage).await?;
    let state = AppState::new(
        store,
        TokenService::new(
            config.jwt_secret.as_bytes(),
            Duration::days(config.jwt_expires_in_days),
        ),
        PasswordHasher::new(config.bcrypt_cost),
    );

    log::info!("Starting Taskboard server at {}", config.server_url());

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::config)
            .default_service(web::to(routes::not_found))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
