use anyhow::{anyhow, Context, Result};
use banter_quota_client::QuotaClient;
use banter_quota_tracker::DEFAULT_DAILY_LIMIT;
use rand::Rng;
use reqwest::Client;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info};

const SERVICE_PACKAGE: &str = "banter-quota-tracker";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one real quota-tracker process for end-to-end tests.
///
/// Each harness owns a fresh port and data directory, so tests can run in
/// parallel; the data directory outlives restarts, which is what the
/// persistence tests rely on.
pub struct TestHarness {
    workspace_dir: PathBuf,
    port: u16,
    data_dir: TempDir,
    daily_limit: u64,
    service: Option<Child>,
    http_client: Client,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_daily_limit(DEFAULT_DAILY_LIMIT).await
    }

    pub async fn with_daily_limit(daily_limit: u64) -> Result<Self> {
        let workspace_dir =
            PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
        let data_dir = TempDir::new().context("creating harness data dir")?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building harness http client")?;
        Ok(Self {
            workspace_dir,
            port: find_free_port()?,
            data_dir,
            daily_limit,
            service: None,
            http_client,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn client(&self) -> Result<QuotaClient> {
        QuotaClient::new(self.base_url())
    }

    /// Spawns the quota-tracker binary and waits until it answers health
    /// checks.
    pub async fn start(&mut self) -> Result<()> {
        tracing_subscriber::fmt::try_init().ok();
        if self.service.is_some() {
            return Err(anyhow!("quota-tracker is already running"));
        }

        info!(port = self.port, "starting quota-tracker");
        let mut command = Command::new("cargo");
        command
            .current_dir(&self.workspace_dir)
            .args(["run", "--quiet", "--package", SERVICE_PACKAGE])
            .env(
                "RUST_LOG",
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            )
            .env("QUOTA_HOST", "127.0.0.1")
            .env("QUOTA_PORT", self.port.to_string())
            .env("QUOTA_DATA_DIR", self.data_dir.path())
            .env("DAILY_CHAT_LIMIT", self.daily_limit.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().context("spawning quota-tracker")?;
        self.service = Some(child);
        self.wait_for_health().await
    }

    pub async fn stop(&mut self) -> Result<()> {
        let mut child = self
            .service
            .take()
            .ok_or_else(|| anyhow!("quota-tracker is not running"))?;
        child.start_kill().context("stopping quota-tracker")?;
        let _ = child.wait().await;
        Ok(())
    }

    /// Stops the process and brings it back up on the same port and data
    /// directory.
    pub async fn restart(&mut self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    pub async fn cleanup(&mut self) -> Result<()> {
        if self.service.is_some() {
            self.stop().await?;
        }
        Ok(())
    }

    async fn wait_for_health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url());
        let start = Instant::now();
        while start.elapsed() < HEALTH_TIMEOUT {
            match self.http_client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => debug!(status = %response.status(), "health check not ready"),
                Err(err) => debug!(error = %err, "health check failed"),
            }
            sleep(Duration::from_millis(250)).await;
        }
        Err(anyhow!("timed out waiting for quota-tracker health at {url}"))
    }
}

pub fn random_user_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}-{}", prefix, rng.gen::<u32>())
}

pub fn find_free_port() -> Result<u16> {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").context("binding to ephemeral port")?;
    let port = listener
        .local_addr()
        .context("reading socket address")?
        .port();
    Ok(port)
}
