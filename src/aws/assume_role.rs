use reqwest::blocking::Client;

use super::xml::{AssumeRoleWithSamlResponse, Credentials, ErrorResponse};
use crate::client;
use crate::error::{Error, ErrorKind, Result};
use crate::saml::Role;

pub const DEFAULT_SESSION_DURATION: i64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct StsConfig {
    pub endpoint: String,
    /// Requested lifetime of the credentials in seconds.
    pub session_duration: i64,
}

impl StsConfig {
    pub fn for_region(region: &str) -> Self {
        StsConfig {
            endpoint: regional_endpoint(region),
            session_duration: DEFAULT_SESSION_DURATION,
        }
    }

    /// The duration to ask STS for: the configured one, unless the IdP
    /// allows less.
    pub fn duration_for(&self, idp_session_duration: Option<i64>) -> i64 {
        match idp_session_duration {
            Some(max) if max < self.session_duration => {
                info!(
                    "the identity provider limits sessions to {} seconds, requested {}",
                    max, self.session_duration
                );
                max
            }
            _ => self.session_duration,
        }
    }
}

pub fn regional_endpoint(region: &str) -> String {
    if region.starts_with("cn-") {
        format!("https://sts.{}.amazonaws.com.cn/", region)
    } else {
        format!("https://sts.{}.amazonaws.com/", region)
    }
}

pub trait AssumeRole {
    fn assume_role_with_saml(
        &self,
        role: &Role,
        saml_assertion: &str,
        session_duration: i64,
    ) -> Result<Credentials>;
}

/// STS over its query API. `AssumeRoleWithSAML` is authorized by the
/// assertion itself, so requests are not signed.
pub struct StsClient {
    client: Client,
    endpoint: String,
}

impl StsClient {
    pub fn new(config: &StsConfig) -> Result<Self> {
        Ok(StsClient {
            client: client::get_proxied_client_builder()?.build()?,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl AssumeRole for StsClient {
    fn assume_role_with_saml(
        &self,
        role: &Role,
        saml_assertion: &str,
        session_duration: i64,
    ) -> Result<Credentials> {
        trace!("assume_role_with_saml.start");
        debug!(
            "AssumeRoleWithSAML {} via {} for {}s at {}",
            role.arn, role.principal_arn, session_duration, self.endpoint
        );

        let duration = session_duration.to_string();
        let params = [
            ("Action", "AssumeRoleWithSAML"),
            ("Version", "2011-06-15"),
            ("RoleArn", role.arn.as_str()),
            ("PrincipalArn", role.principal_arn.as_str()),
            ("SAMLAssertion", saml_assertion),
            ("DurationSeconds", duration.as_str()),
        ];

        let res = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .map_err(|e| {
                error!("assume_role_with_saml: {:?}", e);
                Error::network(&e.to_string())
            })?;

        let status = res.status();
        let body = res.text()?;
        trace!("assume_role_with_saml.status={}", status);

        parse_response(&body)
    }
}

pub fn parse_response(body: &str) -> Result<Credentials> {
    if body.contains("<ErrorResponse") {
        let err: ErrorResponse = serde_xml_rs::from_str(body).map_err(|e| {
            Error::new(
                ErrorKind::AssumeRole,
                &format!("STS refused the request and its error could not be read: {}", e),
            )
        })?;
        debug!("STS error, request id {}", err.request_id);

        return Err(Error::new(
            ErrorKind::AssumeRole,
            &format!("{}: {}", err.error.code, err.error.message),
        ));
    }

    let response: AssumeRoleWithSamlResponse = serde_xml_rs::from_str(body).map_err(|e| {
        Error::new(
            ErrorKind::AssumeRole,
            &format!("unexpected response from STS: {}", e),
        )
    })?;

    if let Some(user) = &response.result.assumed_role_user {
        info!("assumed {}", user.arn);
    }

    Ok(response.result.credentials)
}
