//! IAM policy documents granting the warehouse access to a bucket prefix.
//!
//! Two documents are produced per integration: an identity policy scoped to
//! `bucket/prefix/*`, and a trust policy that lets the warehouse principal
//! assume the role only when it presents the integration's external ID.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const POLICY_VERSION: &str = "2012-10-17";

pub const OBJECT_ACTIONS: [&str; 5] = [
    "s3:PutObject",
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:DeleteObject",
    "s3:DeleteObjectVersion",
];
pub const LIST_BUCKET_ACTION: &str = "s3:ListBucket";
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
pub const EXTERNAL_ID_CONDITION_KEY: &str = "sts:ExternalId";
pub const PREFIX_CONDITION_KEY: &str = "s3:prefix";

/// Operator -> condition key -> value(s), e.g. `StringLike -> s3:prefix -> ["data/*"]`.
pub type ConditionBlock = BTreeMap<String, BTreeMap<String, ConditionValue>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: OneOrMany,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "AWS")]
    pub aws: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(single) => single == value,
            Self::Many(values) => values.iter().any(|candidate| candidate == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    One(String),
    Many(Vec<String>),
}

impl PolicyDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn object_resource_arn(bucket_name: &str, bucket_prefix: &str) -> String {
    format!("arn:aws:s3:::{bucket_name}/{bucket_prefix}/*")
}

pub fn bucket_resource_arn(bucket_name: &str) -> String {
    format!("arn:aws:s3:::{bucket_name}")
}

/// Read/write on objects under the prefix, plus listing restricted to it.
pub fn access_policy_document(bucket_name: &str, bucket_prefix: &str) -> PolicyDocument {
    let prefix_condition = BTreeMap::from([(
        "StringLike".to_string(),
        BTreeMap::from([(
            PREFIX_CONDITION_KEY.to_string(),
            ConditionValue::Many(vec![format!("{bucket_prefix}/*")]),
        )]),
    )]);

    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![
            PolicyStatement {
                effect: Effect::Allow,
                principal: None,
                action: OneOrMany::Many(OBJECT_ACTIONS.iter().map(|a| a.to_string()).collect()),
                resource: Some(OneOrMany::One(object_resource_arn(
                    bucket_name,
                    bucket_prefix,
                ))),
                condition: None,
            },
            PolicyStatement {
                effect: Effect::Allow,
                principal: None,
                action: OneOrMany::One(LIST_BUCKET_ACTION.to_string()),
                resource: Some(OneOrMany::One(bucket_resource_arn(bucket_name))),
                condition: Some(prefix_condition),
            },
        ],
    }
}

/// Lets `principal_arn` assume the role only with a matching `sts:ExternalId`.
pub fn trust_policy_document(principal_arn: &str, external_id: &str) -> PolicyDocument {
    let external_id_condition = BTreeMap::from([(
        "StringEquals".to_string(),
        BTreeMap::from([(
            EXTERNAL_ID_CONDITION_KEY.to_string(),
            ConditionValue::One(external_id.to_string()),
        )]),
    )]);

    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![PolicyStatement {
            effect: Effect::Allow,
            principal: Some(Principal {
                aws: principal_arn.to_string(),
            }),
            action: OneOrMany::One(ASSUME_ROLE_ACTION.to_string()),
            resource: None,
            condition: Some(external_id_condition),
        }],
    }
}
