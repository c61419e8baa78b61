//! HTTP surface for a subgraph schema
//!
//! Provides:
//! - A JSON GraphQL handler the gateway posts subgraph operations to
//! - A GraphiQL page for poking at a single subgraph
//! - A router and `serve` loop with Ctrl-C shutdown

use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use async_graphql::{ObjectType, Request, Response, Schema, SubscriptionType};
use axum::{
    extract::Extension,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;

/// GraphQL endpoint path
pub const GRAPHQL_PATH: &str = "/graphql";

/// Standard GraphQL handler
///
/// Each request is executed on its own; nothing is kept between requests.
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Router, routing::post};
/// use course_federation::review::ReviewQuery;
/// use course_federation::server::graphql_handler;
/// use async_graphql::{EmptyMutation, EmptySubscription};
///
/// let app: Router = Router::new()
///     .route("/graphql", post(graphql_handler::<ReviewQuery, EmptyMutation, EmptySubscription>));
/// ```
pub async fn graphql_handler<Query, Mutation, Subscription>(
    Extension(schema): Extension<Schema<Query, Mutation, Subscription>>,
    req: Json<Request>,
) -> Json<Response>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    let request = req.0;
    let operation = request.operation_name.clone().unwrap_or_default();

    let response = schema.execute(request).await;

    if response.errors.is_empty() {
        tracing::debug!(%operation, "executed operation");
    } else {
        tracing::warn!(%operation, errors = response.errors.len(), "operation completed with errors");
    }

    Json(response)
}

/// GraphiQL page targeting [`GRAPHQL_PATH`]
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

async fn health() -> &'static str {
    "OK"
}

/// Router serving `schema` at [`GRAPHQL_PATH`]
pub fn router<Query, Mutation, Subscription>(schema: Schema<Query, Mutation, Subscription>) -> Router
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    Router::new()
        .route(
            GRAPHQL_PATH,
            get(graphiql).post(graphql_handler::<Query, Mutation, Subscription>),
        )
        .route("/health", get(health))
        .layer(Extension(schema))
}

/// Serve `app` until Ctrl-C
pub async fn serve(name: &str, address: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!(subgraph = name, address = %listener.local_addr()?, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!(subgraph = name, "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
