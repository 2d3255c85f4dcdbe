//! Warehouse statements issued during provisioning.
//!
//! Every externally influenced value travels as a positional bind parameter;
//! SQL text is a fixed template per statement kind.

use crate::naming::IntegrationName;

pub const EXTERNAL_ID_PROPERTY: &str = "STORAGE_AWS_EXTERNAL_ID";
pub const IAM_USER_ARN_PROPERTY: &str = "STORAGE_AWS_IAM_USER_ARN";

const CREATE_STORAGE_INTEGRATION_SQL: &str = "CREATE STORAGE INTEGRATION IDENTIFIER(?) \
     TYPE = EXTERNAL_STAGE STORAGE_PROVIDER = 'S3' ENABLED = TRUE \
     STORAGE_AWS_ROLE_ARN = ? STORAGE_ALLOWED_LOCATIONS = (?)";
const DESCRIBE_INTEGRATION_SQL: &str = "DESCRIBE INTEGRATION IDENTIFIER(?)";
const LOOKUP_PROPERTY_SQL: &str = "SELECT \"property\", \"property_value\" \
     FROM TABLE(RESULT_SCAN(?)) WHERE \"property\" = ?";
const CREATE_STAGE_SQL: &str =
    "CREATE STAGE IDENTIFIER(?) STORAGE_INTEGRATION = IDENTIFIER(?) URL = ?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateStorageIntegration,
    DescribeIntegration,
    LookupProperty,
    CreateStage,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateStorageIntegration => "create_storage_integration",
            Self::DescribeIntegration => "describe_integration",
            Self::LookupProperty => "lookup_property",
            Self::CreateStage => "create_stage",
        }
    }
}

/// SQL template plus its positional text bindings, in `?` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: &'static str,
    pub bindings: Vec<String>,
}

pub fn create_storage_integration(
    integration: &IntegrationName,
    role_arn: &str,
    storage_location: &str,
) -> Statement {
    Statement {
        kind: StatementKind::CreateStorageIntegration,
        sql: CREATE_STORAGE_INTEGRATION_SQL,
        bindings: vec![
            integration.to_string(),
            role_arn.to_string(),
            storage_location.to_string(),
        ],
    }
}

pub fn describe_integration(integration: &IntegrationName) -> Statement {
    Statement {
        kind: StatementKind::DescribeIntegration,
        sql: DESCRIBE_INTEGRATION_SQL,
        bindings: vec![integration.to_string()],
    }
}

/// Reads one property out of a cached `DESCRIBE INTEGRATION` result.
pub fn lookup_property(describe_query_id: &str, property: &str) -> Statement {
    Statement {
        kind: StatementKind::LookupProperty,
        sql: LOOKUP_PROPERTY_SQL,
        bindings: vec![describe_query_id.to_string(), property.to_string()],
    }
}

pub fn create_stage(
    stage_name: &str,
    integration: &IntegrationName,
    storage_location: &str,
) -> Statement {
    Statement {
        kind: StatementKind::CreateStage,
        sql: CREATE_STAGE_SQL,
        bindings: vec![
            stage_name.to_string(),
            integration.to_string(),
            storage_location.to_string(),
        ],
    }
}
