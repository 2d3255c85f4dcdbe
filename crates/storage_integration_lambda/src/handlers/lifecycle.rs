use rand::Rng;
use serde_json::Value;
use storage_integration_core::config::{HandlerSettings, WarehouseCredentials};
use storage_integration_core::contract::{
    empty_data, CallbackStatus, CallbackTarget, LifecycleEvent, ProvisioningOutcome, RequestType,
    SUCCESS_RESULT,
};
use storage_integration_core::error::{ConfigError, ProvisionError, ProvisionResult, RemoteOperation};
use storage_integration_core::naming::{IamResourceNames, IntegrationName};
use tracing::{error, info, warn};

use crate::adapters::callback::CallbackTransport;
use crate::adapters::iam::RoleProvisioner;
use crate::adapters::secrets::SecretSource;
use crate::adapters::warehouse::{ScopedSession, WarehouseConnector};
use crate::handlers::completion::report_completion;
use crate::handlers::integration::provision_integration;

/// External collaborators for one invocation.
pub struct HandlerDependencies<'a> {
    pub secrets: &'a dyn SecretSource,
    pub warehouse: &'a dyn WarehouseConnector,
    pub iam: &'a dyn RoleProvisioner,
    pub callback: &'a dyn CallbackTransport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream_name: String,
}

/// Entry point for one custom-resource event.
///
/// Delete reports SUCCESS without touching the warehouse or IAM. Create and
/// Update provision everything and report SUCCESS with the created
/// resources, or FAILED with the error message before returning the error.
/// A rejected event is reported as FAILED when it still names a `ResponseURL`.
pub fn handle_lifecycle_event<R: Rng + ?Sized>(
    raw_event: Value,
    invocation: &InvocationContext,
    env: &dyn Fn(&str) -> Option<String>,
    deps: &HandlerDependencies<'_>,
    rng: &mut R,
) -> ProvisionResult<String> {
    let event = match LifecycleEvent::parse(&raw_event) {
        Ok(event) => event,
        Err(failure) => {
            error!(error = %failure, "lifecycle event rejected");
            if let Some(target) = CallbackTarget::salvage(&raw_event) {
                report_completion(
                    deps.callback,
                    &target,
                    &invocation.log_stream_name,
                    CallbackStatus::Failed,
                    Some(failure.to_string()),
                    empty_data(),
                );
            }
            return Err(failure);
        }
    };
    info!(
        request_type = ?event.request_type,
        request_id = %event.target.request_id,
        stack_id = %event.target.stack_id,
        logical_resource_id = %event.target.logical_resource_id,
        lambda_request_id = %invocation.request_id,
        "lifecycle event received"
    );

    if event.request_type == RequestType::Delete {
        info!("delete leaves provisioned resources in place; reporting success");
        report_completion(
            deps.callback,
            &event.target,
            &invocation.log_stream_name,
            CallbackStatus::Success,
            None,
            empty_data(),
        );
        return Ok(SUCCESS_RESULT.to_string());
    }

    match provision(env, deps, rng) {
        Ok(outcome) => {
            info!(
                integration = %outcome.integration_name,
                role = %outcome.role_name,
                stage = %outcome.stage_name,
                "provisioning completed"
            );
            let data = serde_json::to_value(&outcome).unwrap_or_else(|error| {
                warn!(error = %error, "outcome could not be serialized; reporting empty data");
                empty_data()
            });
            report_completion(
                deps.callback,
                &event.target,
                &invocation.log_stream_name,
                CallbackStatus::Success,
                None,
                data,
            );
            Ok(SUCCESS_RESULT.to_string())
        }
        Err(failure) => {
            error!(error = %failure, "provisioning failed");
            report_completion(
                deps.callback,
                &event.target,
                &invocation.log_stream_name,
                CallbackStatus::Failed,
                Some(failure.to_string()),
                empty_data(),
            );
            Err(failure)
        }
    }
}

fn provision<R: Rng + ?Sized>(
    env: &dyn Fn(&str) -> Option<String>,
    deps: &HandlerDependencies<'_>,
    rng: &mut R,
) -> ProvisionResult<ProvisioningOutcome> {
    let settings = HandlerSettings::from_lookup(env)?;
    let parameters = &settings.parameters;
    let integration = IntegrationName::generate(rng);
    let iam_names = IamResourceNames::derive(&integration, &parameters.bucket_name)?;
    info!(
        integration = %integration,
        bucket = %parameters.bucket_name,
        prefix = %parameters.bucket_prefix,
        "provisioning storage integration"
    );

    let credentials = load_credentials(deps.secrets, &settings.secret_name)?;
    info!(secret = %settings.secret_name, "warehouse credentials retrieved");

    let session = deps
        .warehouse
        .connect(&credentials)
        .map_err(|error| ProvisionError::remote(RemoteOperation::WarehouseConnect, error))?;
    let mut session = ScopedSession::new(session);

    let outcome = provision_integration(
        &mut session,
        deps.iam,
        parameters,
        &integration,
        &iam_names,
    )?;

    // Everything is created at this point; a close failure is not worth a FAILED status.
    if let Err(error) = session.finish() {
        let error = ProvisionError::remote(RemoteOperation::WarehouseClose, error);
        warn!(error = %error, "warehouse session did not close cleanly");
    }
    Ok(outcome)
}

/// Fetches and validates the warehouse credential secret.
pub fn load_credentials(
    secrets: &dyn SecretSource,
    secret_name: &str,
) -> Result<WarehouseCredentials, ConfigError> {
    let payload = secrets
        .get_secret(secret_name)
        .map_err(|message| ConfigError::SecretUnavailable {
            secret: secret_name.to_string(),
            message,
        })?;
    WarehouseCredentials::from_secret_payload(&payload)
}
