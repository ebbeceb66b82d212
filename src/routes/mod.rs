pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::AuthMiddleware;
use crate::error::{json_error_handler, path_error_handler, query_error_handler};

/// Registers every route and the extractor error handlers.
///
/// `/api/auth/register` and `/api/auth/login` are public; `/api/auth/me`,
/// `/api/tasks/**` and `/api/users/**` go through `AuthMiddleware`.
/// The app must also be given `web::Data<AppState>` and, for the JSON 404,
/// `.default_service(web::to(routes::not_found))`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(health::index)
        .service(health::health)
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::me),
                )
                .service(
                    web::scope("/tasks")
                        .wrap(AuthMiddleware)
                        // Registered before `/{id}` so "stats" is not taken for an id.
                        .service(tasks::get_task_stats)
                        .service(tasks::get_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task),
                )
                .service(
                    web::scope("/users")
                        .wrap(AuthMiddleware)
                        .service(users::update_profile)
                        .service(users::delete_account),
                ),
        );
}

/// Fallback for unmatched routes.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": format!("Not found - {}", req.path())
    }))
}
