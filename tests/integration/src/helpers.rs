//! Test helpers for integration tests
//!
//! Spawns the read API on an ephemeral port and connects to PostgreSQL when
//! `DATABASE_URL` is set.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use monicu_api::server::create_app;
use monicu_api::state::AppState;
use monicu_core::PostQuery;
use monicu_db::{create_pool, ensure_schema, DatabaseConfig, PgPool};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Read API running in the background
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve the API over `posts`
    pub async fn start(posts: Arc<dyn PostQuery>) -> Result<Self> {
        let app = create_app(AppState::from_query(posts));

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Connect to the test database, or `None` when `DATABASE_URL` is unset
pub async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping test: DATABASE_URL not set");
        return None;
    }

    let pool = match create_pool(&DatabaseConfig::from_env()).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: cannot connect to database: {e}");
            return None;
        }
    };
    if let Err(e) = ensure_schema(&pool).await {
        eprintln!("Skipping test: cannot prepare schema: {e}");
        return None;
    }
    Some(pool)
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await?;
    anyhow::bail!("expected {expected}, got {status}: {body}")
}

/// Check the status, then decode the JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected: StatusCode) -> Result<T> {
    Ok(expect_status(response, expected).await?.json().await?)
}

pub async fn assert_status(response: Response, expected: StatusCode) -> Result<()> {
    expect_status(response, expected).await.map(drop)
}
