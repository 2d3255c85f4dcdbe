use crate::error::ProvisionError;
use crate::statements::{EXTERNAL_ID_PROPERTY, IAM_USER_ARN_PROPERTY};

/// One `(property, property_value)` row of a `DESCRIBE INTEGRATION` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub property: String,
    pub property_value: Option<String>,
}

impl PropertyRow {
    /// Rows without a property name are not usable and map to `None`.
    pub fn from_columns(columns: &[Option<String>]) -> Option<Self> {
        let property = columns.first()?.clone()?;
        Some(Self {
            property,
            property_value: columns.get(1).cloned().flatten(),
        })
    }
}

/// Value of the last row whose property equals `name`, or `None` when no row matches.
pub fn find_property(rows: &[PropertyRow], name: &str) -> Option<String> {
    rows.iter()
        .filter(|row| row.property == name)
        .filter_map(|row| row.property_value.clone())
        .last()
}

/// Trust identity the warehouse generated for an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationIdentity {
    external_id: String,
    iam_user_arn: String,
}

impl IntegrationIdentity {
    pub fn from_lookups(
        external_id: Option<String>,
        iam_user_arn: Option<String>,
    ) -> Result<Self, ProvisionError> {
        let external_id = non_empty(external_id).ok_or(ProvisionError::ProtocolGap {
            property: EXTERNAL_ID_PROPERTY,
        })?;
        let iam_user_arn = non_empty(iam_user_arn).ok_or(ProvisionError::ProtocolGap {
            property: IAM_USER_ARN_PROPERTY,
        })?;
        Ok(Self {
            external_id,
            iam_user_arn,
        })
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn iam_user_arn(&self) -> &str {
        &self.iam_user_arn
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(property: &str, value: &str) -> PropertyRow {
        PropertyRow {
            property: property.to_string(),
            property_value: Some(value.to_string()),
        }
    }

    fn describe_rows() -> Vec<PropertyRow> {
        vec![
            row("ENABLED", "true"),
            row("STORAGE_AWS_EXTERNAL_ID", "EID123"),
            row("STORAGE_AWS_IAM_USER_ARN", "arn:aws:iam::123:user/x"),
            row("STORAGE_AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/myrole"),
        ]
    }

    #[test]
    fn extracts_exact_identity_values() {
        let rows = describe_rows();
        let identity = IntegrationIdentity::from_lookups(
            find_property(&rows, EXTERNAL_ID_PROPERTY),
            find_property(&rows, IAM_USER_ARN_PROPERTY),
        )
        .expect("identity should be complete");

        assert_eq!(identity.external_id(), "EID123");
        assert_eq!(identity.iam_user_arn(), "arn:aws:iam::123:user/x");
    }

    #[test]
    fn missing_property_is_none_not_empty_string() {
        assert_eq!(find_property(&describe_rows(), "STORAGE_AWS_EXTERNAL_IDD"), None);
        assert_eq!(find_property(&[], EXTERNAL_ID_PROPERTY), None);
    }

    #[test]
    fn last_matching_row_wins() {
        let rows = vec![row("P", "first"), row("P", "second")];
        assert_eq!(find_property(&rows, "P"), Some("second".to_string()));
    }

    #[test]
    fn incomplete_identity_names_the_missing_property() {
        let error = IntegrationIdentity::from_lookups(None, Some("arn".to_string()))
            .expect_err("external id missing");
        assert_eq!(
            error,
            ProvisionError::ProtocolGap {
                property: EXTERNAL_ID_PROPERTY
            }
        );

        let error = IntegrationIdentity::from_lookups(Some("EID".to_string()), Some(" ".to_string()))
            .expect_err("arn blank");
        assert_eq!(
            error,
            ProvisionError::ProtocolGap {
                property: IAM_USER_ARN_PROPERTY
            }
        );
    }

    #[test]
    fn rows_are_built_from_result_columns() {
        let parsed = PropertyRow::from_columns(&[
            Some("STORAGE_AWS_EXTERNAL_ID".to_string()),
            Some("EID123".to_string()),
        ]);
        assert_eq!(parsed, Some(row("STORAGE_AWS_EXTERNAL_ID", "EID123")));
        assert_eq!(PropertyRow::from_columns(&[None, Some("x".to_string())]), None);
        assert_eq!(
            PropertyRow::from_columns(&[Some("P".to_string())]),
            Some(PropertyRow {
                property: "P".to_string(),
                property_value: None
            })
        );
    }
}
