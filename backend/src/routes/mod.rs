//! Route definitions for the Warehouse Inventory API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .nest("/users", user_routes())
        .nest("/roles", role_routes())
        .nest("/categories", category_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/materials", material_routes())
        .nest("/stock-in", stock_in_routes())
        .nest("/stock-out", stock_out_routes())
        .nest("/adjustments", adjustment_routes())
        .nest("/reports", report_routes())
        .nest("/activity-logs", activity_log_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Public
        .route("/health", get(handlers::health_check))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .merge(protected)
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::deactivate_user),
        )
        .route("/:id/activate", post(handlers::activate_user))
}

fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_roles))
        .route("/permissions", get(handlers::list_permissions))
        .route("/:id", get(handlers::get_role))
        .route("/:id/permissions", put(handlers::update_role_permissions))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories).post(handlers::create_category))
        .route(
            "/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route("/active", get(handlers::list_active_suppliers))
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::deactivate_supplier),
        )
        .route("/:id/activate", post(handlers::activate_supplier))
}

fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_materials).post(handlers::create_material))
        .route("/low-stock", get(handlers::low_stock_materials))
        .route("/out-of-stock", get(handlers::out_of_stock_materials))
        .route("/stats", get(handlers::material_stats))
        .route(
            "/:id",
            get(handlers::get_material)
                .put(handlers::update_material)
                .delete(handlers::deactivate_material),
        )
        .route("/:id/activate", post(handlers::activate_material))
        .route("/:id/movements", get(handlers::material_movements))
}

fn stock_in_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_in).post(handlers::create_stock_in))
        .route("/today", get(handlers::stock_in_today))
        .route("/stats", get(handlers::stock_in_stats))
        .route("/monthly/:year", get(handlers::stock_in_monthly))
        .route(
            "/:id",
            get(handlers::get_stock_in)
                .put(handlers::update_stock_in)
                .delete(handlers::delete_stock_in),
        )
}

fn stock_out_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_out).post(handlers::create_stock_out))
        .route("/stats", get(handlers::stock_out_stats))
        .route("/report", get(handlers::stock_out_report))
        .route("/material/:material_id", get(handlers::stock_out_by_material))
        .route("/usage/:usage_type", get(handlers::stock_out_by_usage))
        .route(
            "/:id",
            get(handlers::get_stock_out).delete(handlers::delete_stock_out),
        )
}

fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_adjustments).post(handlers::create_adjustment))
        .route("/stats", get(handlers::adjustment_stats))
        .route("/material/:material_id", get(handlers::adjustments_by_material))
        .route(
            "/:id",
            get(handlers::get_adjustment).delete(handlers::delete_adjustment),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route("/transactions", get(handlers::transaction_summary_report))
        .route("/low-stock", get(handlers::low_stock_report))
        .route("/materials/:id/trend", get(handlers::material_trend_report))
        .route("/category-distribution", get(handlers::category_distribution_report))
        .route("/stock-value", get(handlers::stock_value_report))
        .route("/supplier-performance", get(handlers::supplier_performance_report))
}

fn activity_log_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_activity_logs))
        .route("/recent", get(handlers::recent_activity_logs))
        .route("/cleanup", post(handlers::cleanup_activity_logs))
        .route(
            "/entity/:entity_type/:id",
            get(handlers::entity_activity_logs),
        )
}
