//! Route definitions for the Drinks Shop API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public, `/me` protected)
        .nest("/auth", auth_routes(state.clone()))
        // Storefront catalog (public)
        .nest("/store", store_routes())
        // Payment gateway endpoints (public)
        .route("/payment-types", get(handlers::list_payment_types))
        .route("/payments/qr/mock/:reference", get(handlers::qr_mock_page))
        .route("/payments/qr/callback", post(handlers::qr_callback))
        // Protected routes - back office
        .nest("/categories", category_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/warehouses", warehouse_routes(state.clone()))
        .nest("/stock", stock_routes(state.clone()))
        .nest("/providers", provider_routes(state.clone()))
        .nest("/purchases", purchase_routes(state.clone()))
        .nest("/clients", client_routes(state.clone()))
        .nest("/sales", sales_routes(state.clone()))
        .nest("/reports", report_routes(state.clone()))
        // Protected routes - storefront customer
        .nest("/account", account_routes(state.clone()))
        .nest("/cart", cart_routes(state.clone()))
        .nest("/checkout", checkout_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
}

/// Storefront catalog routes (public)
fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::browse_products))
        .route("/products/:product_id", get(handlers::get_store_product))
        .route("/categories", get(handlers::store_categories))
}

/// Category management routes (protected)
fn category_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories).post(handlers::create_category))
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product management routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/stock", get(handlers::get_product_availability))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Warehouse management routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/low", get(handlers::list_low_stock))
        .route("/movements", get(handlers::list_movements))
        .route("/adjust", post(handlers::adjust_stock))
        .route("/transfer", post(handlers::transfer_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Provider management routes (protected)
fn provider_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_providers).post(handlers::create_provider))
        .route(
            "/:provider_id",
            get(handlers::get_provider)
                .put(handlers::update_provider)
                .delete(handlers::delete_provider),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Purchase note routes (protected)
fn purchase_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route("/:purchase_id", get(handlers::get_purchase))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Client management routes (protected)
fn client_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_clients).post(handlers::create_client))
        .route(
            "/:client_id",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/:client_id/addresses", get(handlers::list_client_addresses))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sales routes (protected)
fn sales_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales))
        .route("/:sales_note_id", get(handlers::get_sale))
        .route("/:sales_note_id/payment", get(handlers::get_sale_payment))
        .route("/:sales_note_id/cancel", post(handlers::cancel_sale))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/sales", get(handlers::get_sales_report))
        .route("/top-products", get(handlers::get_top_products))
        .route("/stock", get(handlers::get_stock_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Customer account routes (protected)
fn account_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::get_profile).put(handlers::update_profile))
        .route("/addresses", get(handlers::list_addresses).post(handlers::create_address))
        .route(
            "/addresses/:address_id",
            get(handlers::get_address)
                .put(handlers::update_address)
                .delete(handlers::delete_address),
        )
        .route("/orders", get(handlers::list_my_orders))
        .route("/orders/:order_id", get(handlers::get_my_order))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Shopping cart routes (protected)
fn cart_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/items", post(handlers::add_cart_item))
        .route(
            "/items/:item_id",
            put(handlers::update_cart_item).delete(handlers::remove_cart_item),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Checkout wizard routes (protected)
fn checkout_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_checkout))
        .route("/start", post(handlers::start_checkout))
        .route("/address", post(handlers::select_checkout_address))
        .route("/payment-type", post(handlers::select_checkout_payment_type))
        .route("/payment-details", post(handlers::submit_payment_details))
        .route("/confirm", post(handlers::confirm_checkout))
        .route("/process", post(handlers::process_checkout))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
