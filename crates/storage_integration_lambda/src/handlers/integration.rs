use storage_integration_core::config::ProvisioningParameters;
use storage_integration_core::contract::ProvisioningOutcome;
use storage_integration_core::error::{ProvisionError, ProvisionResult, RemoteOperation};
use storage_integration_core::identity::{find_property, IntegrationIdentity, PropertyRow};
use storage_integration_core::naming::{IamResourceNames, IntegrationName};
use storage_integration_core::statements::{
    self, Statement, EXTERNAL_ID_PROPERTY, IAM_USER_ARN_PROPERTY,
};
use tracing::{info, warn};

use crate::adapters::iam::RoleProvisioner;
use crate::adapters::warehouse::{QueryResult, ScopedSession};
use crate::handlers::access_role::provision_access_role;

/// Creates the storage integration, provisions its IAM role, then binds a stage.
///
/// All statements share `session`; the caller owns its release.
pub fn provision_integration(
    session: &mut ScopedSession,
    iam: &dyn RoleProvisioner,
    parameters: &ProvisioningParameters,
    integration: &IntegrationName,
    iam_names: &IamResourceNames,
) -> ProvisionResult<ProvisioningOutcome> {
    let storage_location = parameters.storage_location();

    run(
        session,
        &statements::create_storage_integration(
            integration,
            &parameters.placeholder_role_arn(),
            &storage_location,
        ),
    )?;
    info!(
        integration = %integration,
        storage_location = %storage_location,
        "storage integration created"
    );

    let identity = describe_identity(session, integration)?;
    info!(
        integration = %integration,
        iam_user_arn = %identity.iam_user_arn(),
        "integration identity retrieved"
    );

    let grant = provision_access_role(iam, &identity, parameters, iam_names)?;

    let stage_name = integration.stage_name();
    run(
        session,
        &statements::create_stage(&stage_name, integration, &storage_location),
    )?;
    info!(stage = %stage_name, integration = %integration, "stage created");

    Ok(ProvisioningOutcome {
        integration_name: integration.to_string(),
        stage_name,
        storage_location,
        policy_arn: grant.policy_arn,
        role_name: grant.role_name,
        role_arn: grant.role_arn,
        table_name: parameters.table_name.clone(),
    })
}

fn describe_identity(
    session: &mut ScopedSession,
    integration: &IntegrationName,
) -> ProvisionResult<IntegrationIdentity> {
    let describe = statements::describe_integration(integration);
    let result = run(session, &describe)?;
    if result.query_id.is_empty() {
        return Err(ProvisionError::remote(
            RemoteOperation::WarehouseStatement(describe.kind),
            "no query id returned for the describe result",
        ));
    }

    let external_id = lookup(session, &result.query_id, EXTERNAL_ID_PROPERTY)?;
    let iam_user_arn = lookup(session, &result.query_id, IAM_USER_ARN_PROPERTY)?;
    IntegrationIdentity::from_lookups(external_id, iam_user_arn)
}

fn lookup(
    session: &mut ScopedSession,
    describe_query_id: &str,
    property: &str,
) -> ProvisionResult<Option<String>> {
    let result = run(
        session,
        &statements::lookup_property(describe_query_id, property),
    )?;
    let rows: Vec<PropertyRow> = result
        .rows
        .iter()
        .filter_map(|columns| PropertyRow::from_columns(columns))
        .collect();
    let value = find_property(&rows, property);
    if value.is_none() {
        warn!(property, rows = rows.len(), "integration property not found");
    }
    Ok(value)
}

fn run(session: &mut ScopedSession, statement: &Statement) -> ProvisionResult<QueryResult> {
    session
        .execute(statement)
        .map_err(|error| ProvisionError::remote(RemoteOperation::WarehouseStatement(statement.kind), error))
}
