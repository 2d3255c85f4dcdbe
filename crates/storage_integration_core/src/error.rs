//! Error taxonomy for provisioning.

use std::fmt;

use thiserror::Error;

use crate::statements::StatementKind;

/// Missing or invalid configuration. Raised before any provisioning call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be configured")]
    MissingEnvironment(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    InvalidEnvironment { name: &'static str, reason: String },

    #[error("secret '{secret}' could not be retrieved: {message}")]
    SecretUnavailable { secret: String, message: String },

    #[error("secret payload is not a JSON object: {0}")]
    MalformedSecret(String),

    #[error("secret is missing required key '{0}'")]
    MissingField(String),

    #[error("secret key '{0}' has an empty value")]
    EmptyField(String),
}

/// The external call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    WarehouseConnect,
    WarehouseStatement(StatementKind),
    WarehouseClose,
    CreatePolicy,
    CreateRole,
    AttachRolePolicy,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WarehouseConnect => f.write_str("warehouse connect"),
            Self::WarehouseStatement(kind) => write!(f, "warehouse statement '{}'", kind.as_str()),
            Self::WarehouseClose => f.write_str("warehouse close"),
            Self::CreatePolicy => f.write_str("iam create_policy"),
            Self::CreateRole => f.write_str("iam create_role"),
            Self::AttachRolePolicy => f.write_str("iam attach_role_policy"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{operation} failed: {message}")]
    RemoteCall {
        operation: RemoteOperation,
        message: String,
    },

    #[error("integration identity is incomplete: {property} was not returned by the warehouse")]
    ProtocolGap { property: &'static str },

    #[error("invalid lifecycle event: {0}")]
    InvalidEvent(String),

    #[error("failed to serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },
}

impl ProvisionError {
    pub fn remote(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::RemoteCall {
            operation,
            message: message.into(),
        }
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_call_message_names_the_operation() {
        let error = ProvisionError::remote(
            RemoteOperation::WarehouseStatement(StatementKind::DescribeIntegration),
            "timeout",
        );
        assert_eq!(
            error.to_string(),
            "warehouse statement 'describe_integration' failed: timeout"
        );
    }

    #[test]
    fn config_errors_convert_into_provision_errors() {
        let error: ProvisionError = ConfigError::MissingEnvironment("SNOW_TABLE").into();
        assert!(matches!(
            error,
            ProvisionError::Config(ConfigError::MissingEnvironment("SNOW_TABLE"))
        ));
        assert!(error.to_string().contains("SNOW_TABLE must be configured"));
    }
}
