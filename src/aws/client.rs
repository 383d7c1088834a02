use crate::aws::saml;
use crate::aws::{AwsCredentials, RoleState, CREDENTIALS_VERSION};
use crate::errors::BmxError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_sts::config::{BehaviorVersion, Region};
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types_convert::date_time::DateTimeExt;
use time::format_description::well_known::Rfc3339;

/// Cloud side of the broker: list the roles a SAML assertion grants, and
/// exchange the assertion for temporary credentials.
#[async_trait]
pub trait CloudRoleBroker: Send + Sync {
    fn get_roles(&self, encoded_saml: &str) -> Result<RoleState>;
    async fn get_tokens(
        &self,
        state: &RoleState,
        role_name: &str,
        duration_minutes: i64,
    ) -> Result<AwsCredentials>;
}

pub struct AwsStsBroker {
    sts: StsClient,
}

impl AwsStsBroker {
    pub fn new() -> AwsStsBroker {
        // AssumeRoleWithSAML is unsigned, so no credentials provider is
        // configured; STS only needs a region to resolve an endpoint.
        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();

        AwsStsBroker {
            sts: StsClient::from_conf(config),
        }
    }
}

impl Default for AwsStsBroker {
    fn default() -> Self {
        AwsStsBroker::new()
    }
}

#[async_trait]
impl CloudRoleBroker for AwsStsBroker {
    fn get_roles(&self, encoded_saml: &str) -> Result<RoleState> {
        let roles = saml::extract_roles_from_saml(encoded_saml)?;

        Ok(RoleState {
            roles,
            saml_string: encoded_saml.to_string(),
        })
    }

    async fn get_tokens(
        &self,
        state: &RoleState,
        role_name: &str,
        _duration_minutes: i64,
    ) -> Result<AwsCredentials> {
        let role = state
            .roles
            .iter()
            .find(|role| role.role_name.eq_ignore_ascii_case(role_name))
            .ok_or_else(|| BmxError::RoleNotFound(role_name.to_string()))?;

        // TODO: the requested duration is not forwarded, so STS always issues
        // its default lifetime; confirm whether it should become
        // duration_seconds on this call.
        let response = self
            .sts
            .assume_role_with_saml()
            .principal_arn(role.principal_arn.as_str())
            .role_arn(role.role_arn.as_str())
            .saml_assertion(state.saml_string.as_str())
            .send()
            .await
            .context("STS AssumeRoleWithSAML call failed")?;

        let credentials = response
            .credentials()
            .ok_or_else(|| anyhow!("STS returned no credentials"))?;

        let expiration = credentials
            .expiration()
            .to_time()
            .context("STS returned an invalid expiration")?
            .format(&Rfc3339)?;

        Ok(AwsCredentials {
            session_token: credentials.session_token().to_string(),
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            expiration,
            version: CREDENTIALS_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::AwsRole;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn role_state() -> RoleState {
        RoleState {
            roles: vec![AwsRole {
                role_name: String::from("Dev-Foo"),
                principal_arn: String::from("arn:aws:iam::111111111111:saml-provider/Okta"),
                role_arn: String::from("arn:aws:iam::111111111111:role/Dev-Foo"),
            }],
            saml_string: String::from("QUJD"),
        }
    }

    #[test]
    fn test_get_roles_parses_assertion() {
        let xml = r#"
            <saml2:Assertion xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion">
              <saml2:Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">
                <saml2:AttributeValue>arn:aws:iam::111111111111:saml-provider/Okta,arn:aws:iam::111111111111:role/Dev-Foo</saml2:AttributeValue>
              </saml2:Attribute>
            </saml2:Assertion>"#;
        let encoded = STANDARD.encode(xml);

        let broker = AwsStsBroker::new();
        let state = broker.get_roles(encoded.as_str()).unwrap();

        assert_eq!(state.roles.len(), 1);
        assert_eq!(state.roles[0].role_name, "Dev-Foo");
        assert_eq!(state.saml_string, encoded);
    }

    #[tokio::test]
    async fn test_get_tokens_unknown_role_fails() {
        let broker = AwsStsBroker::new();
        let err = broker
            .get_tokens(&role_state(), "No-Such-Role", 60)
            .await
            .unwrap_err();

        match err.downcast_ref::<BmxError>() {
            Some(BmxError::RoleNotFound(role)) => assert_eq!(role, "No-Such-Role"),
            other => panic!("expected RoleNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_tokens_role_lookup_is_case_insensitive() {
        // the lookup itself must succeed; the call then fails on the network
        // boundary rather than with RoleNotFound
        let broker = AwsStsBroker::new();
        let err = broker
            .get_tokens(&role_state(), "dev-foo", 60)
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<BmxError>().is_none());
    }
}
