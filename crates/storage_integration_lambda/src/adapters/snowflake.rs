//! Snowflake session client over the connector HTTP protocol.
//!
//! Login exchanges username/password for a session token, statements are
//! posted with positional TEXT bindings, and close deletes the session.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage_integration_core::config::WarehouseCredentials;
use storage_integration_core::statements::Statement;
use tracing::debug;
use uuid::Uuid;

use crate::adapters::warehouse::{QueryResult, WarehouseConnector, WarehouseSession};

const CLIENT_APP_ID: &str = "storage-integration-provisioner";
const SNOWFLAKE_ACCEPT: &str = "application/snowflake";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    data: LoginRequestData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginRequestData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponseData {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    sequence_id: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding<'a>>,
}

#[derive(Debug, Serialize)]
struct Binding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseData {
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

/// Common `{success, message, code, data}` wrapper around every response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, action: &str) -> Result<T, String> {
        if !self.success {
            let message = self.message.unwrap_or_else(|| "no message".to_string());
            return Err(match self.code {
                Some(code) => format!("{action} rejected ({}): {message}", render_code(&code)),
                None => format!("{action} rejected: {message}"),
            });
        }
        self.data
            .ok_or_else(|| format!("{action} response did not include data"))
    }
}

fn render_code(code: &Value) -> String {
    match code {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_envelope<T: DeserializeOwned>(
    action: &str,
    status: StatusCode,
    body: &str,
) -> Result<T, String> {
    if !status.is_success() {
        return Err(format!("{action} returned HTTP {status}: {}", truncate(body)));
    }
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|error| format!("{action} returned an unreadable response: {error}"))?;
    envelope.into_data(action)
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(512) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

fn render_cell(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn into_query_result(data: QueryResponseData) -> QueryResult {
    QueryResult {
        query_id: data.query_id.unwrap_or_default(),
        columns: data.rowtype.into_iter().map(|column| column.name).collect(),
        rows: data
            .rowset
            .into_iter()
            .map(|row| row.into_iter().map(render_cell).collect())
            .collect(),
    }
}

fn query_request(statement: &Statement, sequence_id: u64) -> QueryRequest<'_> {
    let bindings = statement
        .bindings
        .iter()
        .enumerate()
        .map(|(index, value)| {
            (
                (index + 1).to_string(),
                Binding {
                    kind: "TEXT",
                    value: value.as_str(),
                },
            )
        })
        .collect();
    QueryRequest {
        sql_text: statement.sql,
        sequence_id,
        bindings,
    }
}

/// Accepts identifiers like `xy12345`, `xy12345.us-east-1`, `org-account`.
fn validate_account(account: &str) -> Result<(), String> {
    if account.is_empty()
        || !account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(format!("invalid Snowflake account identifier '{account}'"));
    }
    Ok(())
}

fn default_base_url(account: &str) -> String {
    format!("https://{account}.snowflakecomputing.com")
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub struct SnowflakeConnector {
    client: Client,
    base_url_override: Option<String>,
}

impl SnowflakeConnector {
    /// `base_url_override` replaces `https://{account}.snowflakecomputing.com`.
    pub fn new(base_url_override: Option<String>) -> Result<Self, String> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|error| format!("failed to build warehouse HTTP client: {error}"))?;
        Ok(Self {
            client,
            base_url_override: base_url_override
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        })
    }

    fn base_url(&self, account: &str) -> Result<String, String> {
        validate_account(account)?;
        Ok(self
            .base_url_override
            .clone()
            .unwrap_or_else(|| default_base_url(account)))
    }
}

impl WarehouseConnector for SnowflakeConnector {
    fn connect(
        &self,
        credentials: &WarehouseCredentials,
    ) -> Result<Box<dyn WarehouseSession>, String> {
        let base_url = self.base_url(&credentials.account)?;
        let request = LoginRequest {
            data: LoginRequestData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: env!("CARGO_PKG_VERSION"),
                account_name: &credentials.account,
                login_name: &credentials.user,
                password: &credentials.password,
            },
        };
        let client = self.client.clone();
        let url = format!("{base_url}/session/v1/login-request");

        let (status, body) = block_on(async {
            let response = client
                .post(&url)
                .query(&[
                    ("databaseName", credentials.database.as_str()),
                    ("schemaName", credentials.schema.as_str()),
                    ("roleName", credentials.role.as_str()),
                ])
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&request)
                .send()
                .await
                .map_err(|error| format!("login request failed: {error}"))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|error| format!("login response could not be read: {error}"))?;
            Ok::<_, String>((status, body))
        })?;

        let data: LoginResponseData = parse_envelope("login", status, &body)?;
        debug!(account = %credentials.account, "warehouse session opened");

        Ok(Box::new(SnowflakeSession {
            client: self.client.clone(),
            base_url,
            token: data.token,
            sequence_id: 0,
        }))
    }
}

struct SnowflakeSession {
    client: Client,
    base_url: String,
    token: String,
    sequence_id: u64,
}

impl SnowflakeSession {
    fn authorization(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }
}

impl WarehouseSession for SnowflakeSession {
    fn execute(&mut self, statement: &Statement) -> Result<QueryResult, String> {
        self.sequence_id += 1;
        let request = query_request(statement, self.sequence_id);
        let url = format!("{}/queries/v1/query-request", self.base_url);
        let request_id = Uuid::new_v4().to_string();
        let client = self.client.clone();
        let authorization = self.authorization();

        let (status, body) = block_on(async {
            let response = client
                .post(&url)
                .query(&[("requestId", request_id.as_str())])
                .header(reqwest::header::AUTHORIZATION, authorization)
                .header(reqwest::header::ACCEPT, SNOWFLAKE_ACCEPT)
                .json(&request)
                .send()
                .await
                .map_err(|error| format!("query request failed: {error}"))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|error| format!("query response could not be read: {error}"))?;
            Ok::<_, String>((status, body))
        })?;

        let data: QueryResponseData = parse_envelope(statement.kind.as_str(), status, &body)?;
        let result = into_query_result(data);
        debug!(
            statement = statement.kind.as_str(),
            query_id = %result.query_id,
            rows = result.rows.len(),
            "warehouse statement executed"
        );
        Ok(result)
    }

    fn close(&mut self) -> Result<(), String> {
        let url = format!("{}/session", self.base_url);
        let client = self.client.clone();
        let authorization = self.authorization();

        let (status, body) = block_on(async {
            let response = client
                .post(&url)
                .query(&[("delete", "true")])
                .header(reqwest::header::AUTHORIZATION, authorization)
                .header(reqwest::header::ACCEPT, SNOWFLAKE_ACCEPT)
                .send()
                .await
                .map_err(|error| format!("session close failed: {error}"))?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Ok::<_, String>((status, body))
        })?;

        if !status.is_success() {
            return Err(format!("session close returned HTTP {status}: {}", truncate(&body)));
        }
        Ok(())
    }
}
