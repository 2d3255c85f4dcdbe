pub trait RoleProvisioner {
    /// Creates a managed policy and returns its ARN.
    fn create_policy(&self, name: &str, document: &str) -> Result<String, String>;
    /// Creates a role with the given trust policy and returns its ARN.
    fn create_role(&self, name: &str, trust_document: &str) -> Result<String, String>;
    fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String>;
}
