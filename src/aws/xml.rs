use chrono::{DateTime, FixedOffset};

/// Body of a successful `AssumeRoleWithSAML` call. The root element
/// (`AssumeRoleWithSAMLResponse`) itself is not named here.
#[derive(Debug, Deserialize)]
pub struct AssumeRoleWithSamlResponse {
    #[serde(rename = "AssumeRoleWithSAMLResult")]
    pub result: AssumeRoleWithSamlResult,
}

#[derive(Debug, Deserialize)]
pub struct AssumeRoleWithSamlResult {
    #[serde(rename = "Credentials")]
    pub credentials: Credentials,

    #[serde(rename = "AssumedRoleUser")]
    pub assumed_role_user: Option<AssumedRoleUser>,
}

#[derive(Debug, Deserialize)]
pub struct AssumedRoleUser {
    #[serde(rename = "Arn")]
    pub arn: String,
}

/// Temporary credentials handed out by STS.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Credentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "SessionToken")]
    pub session_token: String,
    #[serde(rename = "Expiration")]
    pub expiration: String,
}

impl Credentials {
    pub fn expires_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.expiration).ok()
    }
}

/// Body STS sends back when it refuses a call.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: ErrorDetail,

    #[serde(rename = "RequestId", default)]
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}
