use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(handlers::list_tasks)
                .put(handlers::replace_tasks)
                .post(handlers::create_task),
        )
        .route(
            "/api/tasks/:task_uid",
            get(handlers::get_task)
                .put(handlers::patch_task)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks/:task_uid/stats", get(handlers::get_stats))
        .route("/api/tasks/:task_uid/charts", get(handlers::get_charts))
        .route(
            "/api/tasks/:task_uid/contributions",
            get(handlers::get_contributions),
        )
        .route(
            "/api/tasks/:task_uid/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/api/tasks/:task_uid/items/:item_uid",
            put(handlers::patch_item).delete(handlers::delete_item),
        )
        .route("/api/active-task", put(handlers::set_active_task))
        .route(
            "/api/error",
            get(handlers::get_error).delete(handlers::dismiss_error),
        )
        .with_state(state)
}
