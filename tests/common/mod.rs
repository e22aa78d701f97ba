//! Common test utilities - CampaignTest harness for end-to-end testing
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use campaignd::{Config, Server};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Test harness that spawns a real campaignd server on a random port
pub struct CampaignTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl CampaignTest {
    /// Start a new test server with an in-memory database
    pub async fn start() -> Result<Self> {
        Self::start_with_db(None).await
    }

    /// Start a new test server, optionally backed by a database file
    pub async fn start_with_db(db_path: Option<String>) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = Config {
            bind_addr: addr,
            db_path,
            ..Config::default()
        };

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Get direct access to the database for assertions
    pub fn pool(&self) -> sqlx::SqlitePool {
        self.server.db().pool().clone()
    }

    /// Create a combat and return its JSON
    pub async fn create_combat(&self, name: &str) -> Result<Value> {
        let resp = self
            .post("/combats", &serde_json::json!({ "name": name }))
            .await?;
        anyhow::ensure!(
            resp.status() == 201,
            "create combat failed: {}",
            resp.status()
        );
        Ok(resp.json().await?)
    }

    /// Add a participant to a combat and return its JSON
    pub async fn add_participant(
        &self,
        combat_id: i64,
        name: &str,
        roll: i32,
        is_player: bool,
    ) -> Result<Value> {
        let body = serde_json::json!({
            "name": name,
            "initiativeRoll": roll,
            "armorClass": 12,
            "maxHp": 20,
            "isPlayer": is_player,
        });
        let resp = self
            .post(&format!("/combats/{}/initiative", combat_id), &body)
            .await?;
        anyhow::ensure!(
            resp.status() == 201,
            "add participant failed: {}",
            resp.status()
        );
        Ok(resp.json().await?)
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for CampaignTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
