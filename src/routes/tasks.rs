use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{CreateTaskRequest, Task, TaskPatch, TaskQuery},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `status` (optional): `pending`, `in-progress` or `completed`.
/// - `priority` (optional): `low`, `medium` or `high`.
/// - `search` (optional): case-insensitive substring of the title or description.
/// - `sortBy` (optional): `createdAt` (default), `updatedAt`, `dueDate` or `title`.
/// - `order` (optional): `asc` or `desc` (default).
///
/// ## Responses:
/// - `200 OK`: JSON array of tasks, possibly empty.
/// - `400 Bad Request`: a parameter holds a value outside its allowed set.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskQuery>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = state.store.tasks.list(user_id.0, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Dashboard counts for the authenticated user.
///
/// ## Responses:
/// - `200 OK`: `{ statusStats: [{_id, count}], priorityStats: [{_id, count}], total }`.
///   Groups without tasks are left out.
#[get("/stats")]
pub async fn get_task_stats(
    state: web::Data<AppState>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let stats = state.store.tasks.stats(user_id.0).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Creates a new task for the authenticated user.
///
/// ## Request Body:
/// - `title`: required, at most 100 characters after trimming.
/// - `description` (optional): at most 1000 characters.
/// - `status` (optional): defaults to `pending`.
/// - `priority` (optional): defaults to `medium`.
/// - `dueDate` (optional): RFC 3339 timestamp or `YYYY-MM-DD`.
/// - `tags` (optional): array of strings.
///
/// ## Responses:
/// - `201 Created`: the new task.
/// - `400 Bad Request`: validation failure.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<CreateTaskRequest>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalized();
    input.validate()?;

    let task = state
        .store
        .tasks
        .insert(Task::new(input, user_id.0, Utc::now()))
        .await?;

    log::info!("Task created: {} by user: {}", task.id, user_id.0);
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one of the authenticated user's tasks.
///
/// ## Responses:
/// - `200 OK`: the task.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .tasks
        .get(user_id.0, task_id.into_inner())
        .await?
        .ok_or_else(AppError::task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates one of the authenticated user's tasks.
///
/// Only keys present in the body are changed. `description`, `dueDate` and `tags`
/// may be `null` to clear them.
///
/// ## Responses:
/// - `200 OK`: the updated task.
/// - `400 Bad Request`: validation failure.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskPatch>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let patch = task_data.into_inner().normalized();
    patch.validate()?;
    let task_id = task_id.into_inner();

    let task = state
        .store
        .tasks
        .update(user_id.0, task_id, patch)
        .await?
        .ok_or_else(AppError::task_not_found)?;

    log::info!("Task updated: {} by user: {}", task_id, user_id.0);
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the authenticated user's tasks.
///
/// ## Responses:
/// - `200 OK`: `{ message }`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();

    if !state.store.tasks.delete(user_id.0, task_id).await? {
        return Err(AppError::task_not_found());
    }

    log::info!("Task deleted: {} by user: {}", task_id, user_id.0);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully"
    })))
}
