//! Client for the interview panel REST API (interviews, experts, login).

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use anyhow::{Context, Result, anyhow};

use crate::interview::{Interview, InterviewRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expert {
    #[serde(default, alias = "_id")]
    pub id: Value,
    pub name: String,
    pub expertise: String,
    /// Years of experience
    #[serde(default)]
    pub experience: u32,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Clone)]
pub struct PanelApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PanelApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self.client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(anyhow!("Login failed ({}): {}", status, error_message(&body, "invalid credentials")));
        }

        let login: LoginResponse = response.json().await.context("parsing login response")?;
        Ok(login.token)
    }

    /// Create an interview, returning the id the server assigned
    pub async fn create_interview(&self, record: &InterviewRecord) -> Result<String> {
        let request = self.client
            .post(format!("{}/api/interviews", self.base_url))
            .json(record);

        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        match body.get("_id") {
            Some(id) if status.is_success() => Ok(match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            _ => Err(anyhow!(
                "{} ({})",
                error_message(&body, "Failed to create interview"),
                status
            )),
        }
    }

    /// Every scheduled interview, as shown on the dashboard
    pub async fn list_interviews(&self) -> Result<Vec<Interview>> {
        let request = self.client.get(format!("{}/api/interviews", self.base_url));
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(anyhow!(
                "{} ({})",
                error_message(&body, "Failed to list interviews"),
                status
            ));
        }

        let interviews: Vec<Interview> = response.json().await.context("parsing interview list")?;
        Ok(interviews)
    }

    pub async fn list_experts(&self) -> Result<Vec<Expert>> {
        let request = self.client.get(format!("{}/api/experts", self.base_url));
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list experts: {}", response.status()));
        }

        let experts: Vec<Expert> = response.json().await.context("parsing expert list")?;
        Ok(experts)
    }
}

fn error_message(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}
