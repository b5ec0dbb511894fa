//! Deployment request models and validation

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// Parameters of a deploy or undeploy request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentParams {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub pub_account_id: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(default)]
    pub tag: String,

    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub aws_access_key_id: SecretString,

    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub aws_secret_access_key: SecretString,

    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub aws_session_token: Option<SecretString>,

    #[serde(default)]
    pub enable_semi_automated_data_ingestion: bool,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

/// Predicate deciding whether a parameter set may be provisioned.
///
/// A rejection carries the reason returned to the caller verbatim.
pub trait ParamsValidator: Send + Sync {
    fn validate(&self, params: &DeploymentParams) -> Result<(), String>;
}

/// Default validation rules for AWS deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardValidator;

impl ParamsValidator for StandardValidator {
    fn validate(&self, params: &DeploymentParams) -> Result<(), String> {
        if !is_valid_region(&params.region) {
            return Err("Invalid Region".to_string());
        }
        if !is_account_id(&params.account_id) {
            return Err("Invalid Account ID".to_string());
        }
        if !is_account_id(&params.pub_account_id) {
            return Err("Invalid Publisher Account ID".to_string());
        }
        if params.vpc_id.strip_prefix("vpc-").map_or(true, str::is_empty) {
            return Err("Invalid VPC ID".to_string());
        }
        if !is_valid_tag(&params.tag) {
            return Err(
                "Invalid Tag: expected 1 to 20 lowercase letters, digits or dashes".to_string(),
            );
        }
        if params.aws_access_key_id.expose_secret().is_empty() {
            return Err("AWS Access Key ID is required".to_string());
        }
        if params.aws_secret_access_key.expose_secret().is_empty() {
            return Err("AWS Secret Access Key is required".to_string());
        }
        Ok(())
    }
}

fn is_valid_region(region: &str) -> bool {
    !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && region.ends_with(|c: char| c.is_ascii_digit())
}

fn is_account_id(id: &str) -> bool {
    id.len() == 12 && id.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_tag(tag: &str) -> bool {
    (1..=20).contains(&tag.len())
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Parameters that passed validation.
///
/// Only the coordinator can produce one, so a runner never sees unchecked input.
#[derive(Debug)]
pub struct ValidatedParams(DeploymentParams);

impl ValidatedParams {
    pub(crate) fn new(params: DeploymentParams) -> Self {
        Self(params)
    }
}

impl std::ops::Deref for ValidatedParams {
    type Target = DeploymentParams;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
