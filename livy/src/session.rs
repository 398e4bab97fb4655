//! The remote Spark session.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{LivyConfig, LivyError, LivyResult};

#[derive(Debug, Deserialize)]
struct SessionState {
    id: u64,
    state: String,
}

#[derive(Debug, Deserialize)]
struct Statement {
    id: u64,
    /// Completion timestamp; zero while the statement is running.
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    output: Option<StatementOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementOutput {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Map<String, JsonValue>>,
    #[serde(default)]
    evalue: Option<String>,
}

/// One interactive Spark session on a Livy server.
///
/// Statements run one at a time: `run` holds a lock from submission until
/// the statement completes.
pub struct LivySession {
    client: reqwest::Client,
    base_url: String,
    id: u64,
    poll_interval: Duration,
    statements: Mutex<()>,
}

impl LivySession {
    /// Start a session shipping the given files and jars, and wait until it
    /// is idle.
    pub async fn create(config: &LivyConfig, files: &[String], jars: &[String]) -> LivyResult<Self> {
        let base_url = config.base_url()?.to_string();
        let client = reqwest::Client::new();
        let poll_interval = config.poll_interval();

        let response = client
            .post(format!("{}/sessions", base_url))
            .json(&json!({ "kind": "spark", "files": files, "jars": jars }))
            .send()
            .await?;
        let mut state: SessionState = read_json(response).await?;
        info!(session = state.id, files = files.len(), "starting Livy session");

        loop {
            match state.state.as_str() {
                "idle" => break,
                "dead" | "error" | "killed" => return Err(LivyError::SessionDead { id: state.id }),
                _ => {}
            }
            tokio::time::sleep(poll_interval).await;
            let response = client
                .get(format!("{}/sessions/{}", base_url, state.id))
                .send()
                .await?;
            state = read_json(response).await?;
        }
        info!(session = state.id, "Livy session is idle");

        Ok(Self {
            client,
            base_url,
            id: state.id,
            poll_interval,
            statements: Mutex::new(()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Run Scala code and return its `text/plain` output.
    pub async fn run(&self, code: &str) -> LivyResult<String> {
        let _turn = self.statements.lock().await;
        debug!(session = self.id, code, "submitting statement");

        let statements_url = format!("{}/sessions/{}/statements", self.base_url, self.id);
        let response = self
            .client
            .post(&statements_url)
            .json(&json!({ "code": code }))
            .send()
            .await?;
        let mut statement: Statement = read_json(response).await?;

        while statement.completed == 0 {
            tokio::time::sleep(self.poll_interval).await;
            let response = self
                .client
                .get(format!("{}/{}", statements_url, statement.id))
                .send()
                .await?;
            statement = read_json(response).await?;
        }

        let output = statement.output.unwrap_or_default();
        if output.status.as_deref() == Some("error") {
            return Err(LivyError::statement(output.evalue.unwrap_or_default()));
        }
        Ok(output
            .data
            .as_ref()
            .and_then(|data| data.get("text/plain"))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> LivyResult<T> {
    Ok(response.error_for_status()?.json().await?)
}
