use storage_integration_core::config::ProvisioningParameters;
use storage_integration_core::error::{ProvisionError, ProvisionResult, RemoteOperation};
use storage_integration_core::identity::IntegrationIdentity;
use storage_integration_core::naming::IamResourceNames;
use storage_integration_core::policy::{access_policy_document, trust_policy_document};
use tracing::{info, warn};

use crate::adapters::iam::RoleProvisioner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRoleGrant {
    pub policy_arn: String,
    pub role_name: String,
    pub role_arn: String,
}

/// Creates the access policy, the trusting role, then attaches one to the other.
///
/// Each step runs only if the previous one succeeded. Nothing is rolled back:
/// a failure after the first step leaves the already-created resources behind,
/// and they are named in the log for manual cleanup.
pub fn provision_access_role(
    iam: &dyn RoleProvisioner,
    identity: &IntegrationIdentity,
    parameters: &ProvisioningParameters,
    names: &IamResourceNames,
) -> ProvisionResult<AccessRoleGrant> {
    let access_policy =
        access_policy_document(&parameters.bucket_name, &parameters.bucket_prefix)
            .to_json()
            .map_err(|error| ProvisionError::Serialization {
                what: "access policy",
                message: error.to_string(),
            })?;

    let policy_arn = iam
        .create_policy(&names.policy_name, &access_policy)
        .map_err(|error| ProvisionError::remote(RemoteOperation::CreatePolicy, error))?;
    info!(policy = %names.policy_name, policy_arn = %policy_arn, "access policy created");

    let trust_policy = trust_policy_document(identity.iam_user_arn(), identity.external_id())
        .to_json()
        .map_err(|error| ProvisionError::Serialization {
            what: "trust policy",
            message: error.to_string(),
        })?;

    let role_arn = iam
        .create_role(&names.role_name, &trust_policy)
        .map_err(|error| {
            warn!(
                policy_arn = %policy_arn,
                "role creation failed; access policy left unattached"
            );
            ProvisionError::remote(RemoteOperation::CreateRole, error)
        })?;
    info!(role = %names.role_name, role_arn = %role_arn, "access role created");

    iam.attach_role_policy(&names.role_name, &policy_arn)
        .map_err(|error| {
            warn!(
                role = %names.role_name,
                policy_arn = %policy_arn,
                "attach failed; role left without its access policy"
            );
            ProvisionError::remote(RemoteOperation::AttachRolePolicy, error)
        })?;
    info!(role = %names.role_name, policy_arn = %policy_arn, "access policy attached");

    Ok(AccessRoleGrant {
        policy_arn,
        role_name: names.role_name.clone(),
        role_arn,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;

    #[derive(Default)]
    struct RecordingIam {
        calls: Mutex<Vec<(String, String, String)>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingIam {
        fn failing_on(operation: &'static str) -> Self {
            Self {
                fail_on: Some(operation),
                ..Self::default()
            }
        }

        fn record(&self, operation: &'static str, name: &str, argument: &str) -> Result<(), String> {
            self.calls.lock().expect("poisoned mutex").push((
                operation.to_string(),
                name.to_string(),
                argument.to_string(),
            ));
            if self.fail_on == Some(operation) {
                return Err(format!("{operation}: EntityAlreadyExists"));
            }
            Ok(())
        }

        fn operations(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("poisoned mutex")
                .iter()
                .map(|(operation, _, _)| operation.clone())
                .collect()
        }

        fn argument(&self, operation: &str) -> String {
            self.calls
                .lock()
                .expect("poisoned mutex")
                .iter()
                .find(|(recorded, _, _)| recorded == operation)
                .map(|(_, _, argument)| argument.clone())
                .expect("operation should have been recorded")
        }
    }

    impl RoleProvisioner for RecordingIam {
        fn create_policy(&self, name: &str, document: &str) -> Result<String, String> {
            self.record("create_policy", name, document)?;
            Ok(format!("arn:aws:iam::123456789012:policy/{name}"))
        }

        fn create_role(&self, name: &str, trust_document: &str) -> Result<String, String> {
            self.record("create_role", name, trust_document)?;
            Ok(format!("arn:aws:iam::123456789012:role/{name}"))
        }

        fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String> {
            self.record("attach_role_policy", role_name, policy_arn)
        }
    }

    fn parameters() -> ProvisioningParameters {
        ProvisioningParameters {
            bucket_name: "mybucket".to_string(),
            bucket_prefix: "data".to_string(),
            table_name: "EVENTS".to_string(),
            aws_account_id: "123456789012".to_string(),
        }
    }

    fn names() -> IamResourceNames {
        IamResourceNames {
            policy_name: "SnowflakeS3AccessPolicy-mybucketS3INTabc12".to_string(),
            role_name: "SnowflakeS3AccessRole-mybucketS3INTabc12".to_string(),
        }
    }

    fn identity() -> IntegrationIdentity {
        IntegrationIdentity::from_lookups(
            Some("EID123".to_string()),
            Some("arn:aws:iam::123:user/x".to_string()),
        )
        .expect("identity is complete")
    }

    #[test]
    fn creates_policy_then_role_then_attaches() {
        let iam = RecordingIam::default();
        let grant = provision_access_role(&iam, &identity(), &parameters(), &names())
            .expect("provisioning should succeed");

        assert_eq!(
            iam.operations(),
            vec!["create_policy", "create_role", "attach_role_policy"]
        );
        assert_eq!(
            grant.policy_arn,
            "arn:aws:iam::123456789012:policy/SnowflakeS3AccessPolicy-mybucketS3INTabc12"
        );
        assert_eq!(grant.role_name, "SnowflakeS3AccessRole-mybucketS3INTabc12");
        assert_eq!(iam.argument("attach_role_policy"), grant.policy_arn);
    }

    #[test]
    fn documents_carry_location_and_external_id() {
        let iam = RecordingIam::default();
        provision_access_role(&iam, &identity(), &parameters(), &names())
            .expect("provisioning should succeed");

        let access: Value =
            serde_json::from_str(&iam.argument("create_policy")).expect("valid json");
        assert_eq!(
            access["Statement"][0]["Resource"],
            "arn:aws:s3:::mybucket/data/*"
        );

        let trust: Value = serde_json::from_str(&iam.argument("create_role")).expect("valid json");
        assert_eq!(
            trust["Statement"][0]["Condition"]["StringEquals"]["sts:ExternalId"],
            "EID123"
        );
        assert_eq!(
            trust["Statement"][0]["Principal"]["AWS"],
            "arn:aws:iam::123:user/x"
        );
    }

    #[test]
    fn role_failure_never_attempts_attach() {
        let iam = RecordingIam::failing_on("create_role");
        let error = provision_access_role(&iam, &identity(), &parameters(), &names())
            .expect_err("role creation should fail");

        assert!(matches!(
            error,
            ProvisionError::RemoteCall {
                operation: RemoteOperation::CreateRole,
                ..
            }
        ));
        assert_eq!(iam.operations(), vec!["create_policy", "create_role"]);
    }

    #[test]
    fn policy_failure_stops_before_role() {
        let iam = RecordingIam::failing_on("create_policy");
        provision_access_role(&iam, &identity(), &parameters(), &names())
            .expect_err("policy creation should fail");
        assert_eq!(iam.operations(), vec!["create_policy"]);
    }
}
