use axum::routing::{get, patch, post};
use axum::Router;
use diesel::prelude::*;
use std::net::SocketAddr;

mod admin;
mod auth;
mod config;
mod db;
mod error;
mod lifecycle;
mod models;
mod orders;
mod products;
mod quotes;
mod schema;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = config::AppConfig::load()?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let mut conn = PgConnection::establish(&config.database_url)
        .map_err(|e| format!("Failed to connect to database: {}", e))?;
    let test_query: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result(&mut conn)?;
    log::info!("Database test query result: {}", test_query);

    log::info!("Starting server on {}", addr);

    let state = AppState { config };
    let app = Router::new()
        .route("/", get(|| async { "TradeFlow Backend Running" }))
        .route("/auth/signup", post(users::signup))
        .route("/auth/login", post(users::login))
        .route(
            "/auth/profile",
            get(users::get_profile).patch(users::update_profile),
        )
        .route("/auth/password", patch(users::update_password))
        .route("/products/all", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/vendor/add-product", post(products::add_product))
        .route("/vendor/inventory", get(products::vendor_inventory))
        .route("/vendor/stats", get(products::vendor_stats))
        .route(
            "/product/:id",
            patch(products::update_product).delete(products::delete_product),
        )
        .route("/quotes/request", post(quotes::request_quote))
        .route("/quotes/vendor", get(quotes::vendor_quotes))
        .route("/quotes/buyer", get(quotes::buyer_quotes))
        .route("/quotes/:id/respond", patch(quotes::respond_to_quote))
        .route("/quotes/:id/accept", post(quotes::accept_quote))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/vendor", get(orders::vendor_orders))
        .route("/orders/buyer", get(orders::buyer_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", patch(orders::update_status))
        .route(
            "/admin/users",
            post(admin::create_user).get(admin::list_users),
        )
        .route(
            "/admin/users/:id",
            get(admin::users_by_role)
                .patch(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/users/id/:id", get(admin::get_user))
        .route("/admin/stats", get(admin::stats))
        .with_state(state);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
