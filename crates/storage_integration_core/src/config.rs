use std::fmt;

use serde_json::{Map, Value};

use crate::error::ConfigError;

pub const ENV_SECRET_NAME: &str = "SNOW_SECRET";
pub const ENV_BUCKET_NAME: &str = "SNOW_S3_BUCKETNAME";
pub const ENV_BUCKET_PREFIX: &str = "SNOW_S3_BUCKETPREFIX";
pub const ENV_TABLE_NAME: &str = "SNOW_TABLE";
pub const ENV_ACCOUNT_ID: &str = "CURRENT_AWS_ACCOUNT";

pub const SECRET_KEY_ACCOUNT: &str = "snowaccount";
pub const SECRET_KEY_USER: &str = "snowuser";
pub const SECRET_KEY_PASSWORD: &str = "snowpass";
pub const SECRET_KEY_DATABASE: &str = "snowdb";
pub const SECRET_KEY_SCHEMA: &str = "snowschema";
pub const SECRET_KEY_ROLE: &str = "snowrole";

pub const DEFAULT_WAREHOUSE_ROLE: &str = "ACCOUNTADMIN";

const REQUIRED_SECRET_KEYS: [&str; 5] = [
    SECRET_KEY_ACCOUNT,
    SECRET_KEY_USER,
    SECRET_KEY_PASSWORD,
    SECRET_KEY_DATABASE,
    SECRET_KEY_SCHEMA,
];

/// Warehouse login material loaded from the secret store.
#[derive(Clone, PartialEq, Eq)]
pub struct WarehouseCredentials {
    pub account: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub role: String,
}

impl fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .finish()
    }
}

impl WarehouseCredentials {
    /// Parses a secret payload. Every key present in the payload must carry a
    /// non-empty value, and the five connection keys are mandatory.
    pub fn from_secret_payload(payload: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|error| ConfigError::MalformedSecret(error.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ConfigError::MalformedSecret(
                "expected a JSON object".to_string(),
            ));
        };

        for (key, value) in &object {
            if is_empty_value(value) {
                return Err(ConfigError::EmptyField(key.clone()));
            }
        }

        for key in REQUIRED_SECRET_KEYS {
            if !object.contains_key(key) {
                return Err(ConfigError::MissingField(key.to_string()));
            }
        }

        Ok(Self {
            account: required_string(&object, SECRET_KEY_ACCOUNT)?,
            user: required_string(&object, SECRET_KEY_USER)?,
            password: required_string(&object, SECRET_KEY_PASSWORD)?,
            database: required_string(&object, SECRET_KEY_DATABASE)?,
            schema: required_string(&object, SECRET_KEY_SCHEMA)?,
            role: match object.get(SECRET_KEY_ROLE) {
                Some(_) => required_string(&object, SECRET_KEY_ROLE)?,
                None => DEFAULT_WAREHOUSE_ROLE.to_string(),
            },
        })
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
    }
}

fn required_string(object: &Map<String, Value>, key: &str) -> Result<String, ConfigError> {
    match object.get(key) {
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(_) => Err(ConfigError::MalformedSecret(format!(
            "key '{key}' must be a string"
        ))),
        None => Err(ConfigError::MissingField(key.to_string())),
    }
}

/// Deployment-level inputs that name the bucket location to integrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningParameters {
    pub bucket_name: String,
    pub bucket_prefix: String,
    pub table_name: String,
    pub aws_account_id: String,
}

impl ProvisioningParameters {
    /// `s3://bucket/prefix/`, the location granted to the integration and stage.
    pub fn storage_location(&self) -> String {
        format!("s3://{}/{}/", self.bucket_name, self.bucket_prefix)
    }

    /// Role ARN the integration is created with before the real role exists.
    pub fn placeholder_role_arn(&self) -> String {
        format!("arn:aws:iam::{}:role/myrole", self.aws_account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub secret_name: String,
    pub parameters: ProvisioningParameters,
}

impl HandlerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingEnvironment(name))
        };

        let secret_name = read(ENV_SECRET_NAME)?;
        let bucket_name = read(ENV_BUCKET_NAME)?;
        let bucket_prefix = read(ENV_BUCKET_PREFIX)?;
        let table_name = read(ENV_TABLE_NAME)?;
        let aws_account_id = read(ENV_ACCOUNT_ID)?;

        validate_bucket_name(&bucket_name)?;
        let bucket_prefix = normalize_bucket_prefix(&bucket_prefix)?;
        validate_account_id(&aws_account_id)?;

        Ok(Self {
            secret_name,
            parameters: ProvisioningParameters {
                bucket_name,
                bucket_prefix,
                table_name,
                aws_account_id,
            },
        })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvironment {
        name,
        reason: reason.into(),
    }
}

fn validate_bucket_name(bucket: &str) -> Result<(), ConfigError> {
    if !(3..=63).contains(&bucket.len()) {
        return Err(invalid(
            ENV_BUCKET_NAME,
            "bucket names must be between 3 and 63 characters",
        ));
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(invalid(
            ENV_BUCKET_NAME,
            "bucket names may only contain lowercase letters, digits, '.' and '-'",
        ));
    }
    Ok(())
}

fn normalize_bucket_prefix(prefix: &str) -> Result<String, ConfigError> {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(ENV_BUCKET_PREFIX, "prefix cannot be empty"));
    }
    if let Some(c) = trimmed
        .chars()
        .find(|c| matches!(c, '\'' | '\\' | '*') || c.is_whitespace())
    {
        return Err(invalid(
            ENV_BUCKET_PREFIX,
            format!("prefix contains unsupported character {c:?}"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_account_id(account_id: &str) -> Result<(), ConfigError> {
    if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(
            ENV_ACCOUNT_ID,
            "AWS account ids are exactly 12 digits",
        ));
    }
    Ok(())
}
