//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                            - Liveness
//! GET  /health/ready                      - Readiness (database)
//!
//! # Accounts (under /api/v1)
//! POST   /signup                          - Register (multipart), rate limited
//! POST   /login                           - Login, rate limited
//! GET    /logout                          - Expire the token cookie
//! POST   /forgotPassword                  - Mail a reset link, rate limited
//! POST   /password/reset/{token}          - Reset the password, rate limited
//! GET    /userDashboard                   - Current account          [signed in]
//! PATCH  /password/update                 - Change password          [signed in]
//! PATCH  /userDashboard/update            - Update profile           [signed in]
//! GET    /admin/allUsers                  - All accounts             [admin]
//! GET|PUT|DELETE /admin/user/{id}         - One account              [admin]
//! GET    /manager/allUsers                - Customer accounts        [manager]
//!
//! # Catalog
//! GET    /products                        - Search, filter and page
//! GET    /product/{id}                    - One product
//! GET    /getReviews/{productId}          - Reviews of a product
//! PUT    /postReview                      - Add or replace own review [signed in]
//! PUT    /deleteReview/{productId}        - Remove own review        [signed in]
//! GET    /admin/products                  - All products             [admin]
//! POST   /admin/product/add               - Create (multipart)       [admin]
//! PUT|DELETE /admin/product/{id}          - Update or delete         [admin]
//!
//! # Orders
//! POST   /order/create                    - Place an order           [signed in]
//! GET    /myorder                         - Own orders               [signed in]
//! GET    /order/{id}                      - One order, owner or admin [signed in]
//! GET    /admin/orders                    - All orders               [admin]
//! PUT|DELETE /admin/order/{id}            - Advance status or delete [admin]
//!
//! # Payments
//! GET    /stripekey, /razorpaykey         - Publishable keys         [signed in]
//! POST   /captureStripePayment            - Stripe payment intent    [signed in]
//! POST   /captureRazorPayPayment          - Razorpay order           [signed in]
//! ```

pub mod accounts;
pub mod extract;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
};
use sqlx::PgPool;
use teeshop_core::RoleGate;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_rate_limiter, request_id_middleware, require_account, require_role};
use crate::state::AppState;

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Routes open to anyone.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", get(accounts::logout))
        .route("/products", get(products::list))
        .route("/product/{id}", get(products::show))
        .route("/getReviews/{id}", get(products::reviews))
}

/// Routes that hand out credentials; rate limited per client IP.
fn credential_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/forgotPassword", post(accounts::forgot_password))
        .route("/password/reset/{token}", post(accounts::reset_password))
        .layer(auth_rate_limiter(state.config().trust_proxy_headers))
}

/// Routes open to any signed-in account.
fn signed_in_routes() -> Router<AppState> {
    Router::new()
        .route("/userDashboard", get(accounts::dashboard))
        .route("/password/update", patch(accounts::change_password))
        .route("/userDashboard/update", patch(accounts::update_profile))
        .route("/postReview", put(products::post_review))
        .route("/deleteReview/{id}", put(products::delete_review))
        .route("/order/create", post(orders::create))
        .route("/myorder", get(orders::mine))
        .route("/order/{id}", get(orders::show))
        .route("/stripekey", get(payments::stripe_key))
        .route("/razorpaykey", get(payments::razorpay_key))
        .route("/captureStripePayment", post(payments::capture_stripe))
        .route("/captureRazorPayPayment", post(payments::capture_razorpay))
}

/// Administrator routes.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/allUsers", get(accounts::admin_list))
        .route(
            "/admin/user/{id}",
            get(accounts::admin_get)
                .put(accounts::admin_update)
                .delete(accounts::admin_delete),
        )
        .route("/admin/products", get(products::admin_list))
        .route("/admin/product/add", post(products::admin_create))
        .route(
            "/admin/product/{id}",
            put(products::admin_update).delete(products::admin_delete),
        )
        .route("/admin/orders", get(orders::admin_list))
        .route(
            "/admin/order/{id}",
            put(orders::admin_update).delete(orders::admin_delete),
        )
        .route_layer(from_fn_with_state(RoleGate::admin(), require_role))
}

/// Manager routes.
fn manager_routes() -> Router<AppState> {
    Router::new()
        .route("/manager/allUsers", get(accounts::manager_list))
        .route_layer(from_fn_with_state(RoleGate::manager(), require_role))
}

/// Every `/api/v1` route, with the credential verifier in front of the
/// signed-in, admin and manager groups.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let verifier = from_fn_with_state(Arc::clone(state.verifier()), require_account::<PgPool>);

    let protected = signed_in_routes()
        .merge(admin_routes())
        .merge(manager_routes())
        .route_layer(verifier);

    public_routes()
        .merge(credential_routes(state))
        .merge(protected)
}

/// The complete application router, without the Sentry layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest(API_PREFIX, api_routes(&state))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    account_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
