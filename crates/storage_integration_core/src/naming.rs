use std::fmt;

use rand::Rng;

use crate::error::ConfigError;

pub const INTEGRATION_NAME_PREFIX: &str = "S3INT";
pub const STAGE_NAME_PREFIX: &str = "S3STAGE";
pub const POLICY_NAME_PREFIX: &str = "SnowflakeS3AccessPolicy-";
pub const ROLE_NAME_PREFIX: &str = "SnowflakeS3AccessRole-";

/// https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_iam-quotas.html#reference_iam-quotas-entity-length
pub const MAX_POLICY_NAME_LEN: usize = 128;
pub const MAX_ROLE_NAME_LEN: usize = 64;

const SUFFIX_LETTERS: usize = 3;

/// Per-invocation integration identifier, e.g. `S3INTqzk42`.
///
/// Only ever built from ASCII letters and digits, so it is always a valid
/// unquoted warehouse identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegrationName(String);

impl IntegrationName {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let letters: String = (0..SUFFIX_LETTERS)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        let number: u8 = rng.gen_range(2..100);
        Self(format!("{INTEGRATION_NAME_PREFIX}{letters}{number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn stage_name(&self) -> String {
        format!("{STAGE_NAME_PREFIX}{}", self.0)
    }

    pub fn policy_name(&self, bucket_name: &str) -> String {
        format!("{POLICY_NAME_PREFIX}{bucket_name}{}", self.0)
    }

    pub fn role_name(&self, bucket_name: &str) -> String {
        format!("{ROLE_NAME_PREFIX}{bucket_name}{}", self.0)
    }
}

impl fmt::Display for IntegrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// IAM resource names derived for one integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamResourceNames {
    pub policy_name: String,
    pub role_name: String,
}

impl IamResourceNames {
    pub fn derive(integration: &IntegrationName, bucket_name: &str) -> Result<Self, ConfigError> {
        let policy_name = integration.policy_name(bucket_name);
        let role_name = integration.role_name(bucket_name);
        validate_iam_name(&policy_name, MAX_POLICY_NAME_LEN)?;
        validate_iam_name(&role_name, MAX_ROLE_NAME_LEN)?;
        Ok(Self {
            policy_name,
            role_name,
        })
    }
}

// Names must be alphanumeric, plus: + = , . @ _ -
fn validate_iam_name(name: &str, max_len: usize) -> Result<(), ConfigError> {
    if name.len() > max_len {
        return Err(ConfigError::InvalidEnvironment {
            name: crate::config::ENV_BUCKET_NAME,
            reason: format!("derived IAM name '{name}' exceeds {max_len} characters"),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c))
    {
        return Err(ConfigError::InvalidEnvironment {
            name: crate::config::ENV_BUCKET_NAME,
            reason: format!("derived IAM name '{name}' contains unsupported characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn is_well_formed(name: &str) -> bool {
        let Some(suffix) = name.strip_prefix(INTEGRATION_NAME_PREFIX) else {
            return false;
        };
        let (letters, digits) = suffix.split_at(SUFFIX_LETTERS.min(suffix.len()));
        letters.len() == SUFFIX_LETTERS
            && letters.chars().all(|c| c.is_ascii_lowercase())
            && (1..=2).contains(&digits.len())
            && digits
                .parse::<u8>()
                .map(|n| (2..100).contains(&n))
                .unwrap_or(false)
    }

    #[test]
    fn generated_names_follow_the_integration_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let name = IntegrationName::generate(&mut rng);
            assert!(is_well_formed(name.as_str()), "unexpected name {name}");
        }
    }

    #[test]
    fn same_seed_gives_same_name() {
        let first = IntegrationName::generate(&mut StdRng::seed_from_u64(42));
        let second = IntegrationName::generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn derived_names_embed_bucket_and_integration() {
        let name = IntegrationName("S3INTabc12".to_string());
        assert_eq!(name.stage_name(), "S3STAGES3INTabc12");

        let names = IamResourceNames::derive(&name, "mybucket").expect("names should be valid");
        assert_eq!(names.policy_name, "SnowflakeS3AccessPolicy-mybucketS3INTabc12");
        assert_eq!(names.role_name, "SnowflakeS3AccessRole-mybucketS3INTabc12");
    }

    #[test]
    fn long_buckets_overflow_the_role_name_limit() {
        let name = IntegrationName("S3INTabc12".to_string());
        let bucket = "b".repeat(40);
        let error = IamResourceNames::derive(&name, &bucket).expect_err("role name too long");
        assert!(error.to_string().contains("exceeds 64 characters"));
    }
}
