mod db;
mod error;
mod llm;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Chat falls back to a canned reply when the LLM is not configured.
    let llm: Option<Arc<dyn llm::LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; doctor chat will use fallback replies");
            None
        }
    };

    let state = state::AppState::new(pool, llm);
    if state.auth.is_none() {
        tracing::warn!("AUTH_URL/AUTH_ANON_KEY not set; bearer token auth disabled");
    }
    if state.dev_bypass {
        tracing::warn!("AUTH_DEV_BYPASS enabled; x-dev-user-id is trusted");
    }

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "rehabai listening");
    axum::serve(listener, app).await.expect("server failed");
}
