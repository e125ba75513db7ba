use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use roxmltree::Document;

use crate::error::{Error, Result};

const ASSERTION_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
const ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";
const SESSION_DURATION_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/SessionDuration";
const ROLE_SESSION_NAME_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/RoleSessionName";

/// Assertion is the prettified SAML Assertion struct. `raw` is the base64
/// string exactly as the IdP returned it, which is what STS wants back.
#[derive(Debug)]
pub struct Assertion {
    pub raw: String,
    pub role_session_name: Option<String>,
    pub session_duration: Option<i64>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub arn: String,
    pub principal_arn: String,
}

impl Role {
    /// AWS account the role lives in, taken from the role ARN.
    pub fn account_id(&self) -> Option<String> {
        let re = Regex::new(r"^arn:aws[a-z-]*:iam::([0-9]{12}):").expect("static regex");

        re.captures(&self.arn).map(|c| c[1].to_owned())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Parses a role attribute value, `role_arn,principal_arn`. IdPs do not
    /// agree on the order, so a leading `saml-provider` ARN gets swapped to
    /// the back.
    fn from_str(s: &str) -> Result<Self> {
        let mut split = s.trim().split(',').map(|p| p.trim());

        let (first, second) = match (split.next(), split.next(), split.next()) {
            (Some(first), Some(second), None) if !first.is_empty() && !second.is_empty() => {
                (first, second)
            }
            _ => {
                return Err(Error::invalid_assertion(&format!(
                    "role attribute value {:?} is not a pair of ARNs",
                    s
                )))
            }
        };

        let (arn, principal_arn) = if first.contains("saml-provider") {
            (second, first)
        } else {
            (first, second)
        };

        Ok(Role {
            arn: arn.into(),
            principal_arn: principal_arn.into(),
        })
    }
}

pub fn parse_assertion(assertion_b64: &str) -> Result<Assertion> {
    let compact: String = assertion_b64.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::invalid_assertion(&format!("assertion is not valid base64: {}", e)))?;
    let buf = String::from_utf8(bytes)
        .map_err(|e| Error::invalid_assertion(&format!("assertion is not valid UTF-8: {}", e)))?;

    let doc = Document::parse(&buf)
        .map_err(|e| Error::invalid_assertion(&format!("assertion is not valid XML: {}", e)))?;

    let mut assertion = Assertion {
        raw: assertion_b64.into(),
        role_session_name: None,
        session_duration: None,
        roles: vec![],
    };

    let attributes = doc
        .descendants()
        .filter(|n| n.has_tag_name((ASSERTION_NS, "Attribute")));

    let mut skipped_roles = 0;
    for attribute in attributes {
        let values = attribute
            .children()
            .filter(|n| n.has_tag_name((ASSERTION_NS, "AttributeValue")))
            .map(|n| n.text().unwrap_or("").trim())
            .collect::<Vec<&str>>();

        match attribute.attribute("Name") {
            Some(ROLE_ATTRIBUTE) => {
                for value in values {
                    match value.parse::<Role>() {
                        Ok(role) => assertion.roles.push(role),
                        Err(e) => {
                            warn!("skipping role: {}", e.description());
                            skipped_roles += 1;
                        }
                    }
                }
            }
            Some(SESSION_DURATION_ATTRIBUTE) => {
                if let Some(value) = values.first() {
                    assertion.session_duration = Some(value.parse().map_err(|_| {
                        Error::invalid_assertion(&format!("session duration {:?} is not a number", value))
                    })?);
                }
            }
            Some(ROLE_SESSION_NAME_ATTRIBUTE) => {
                assertion.role_session_name = values.first().map(|v| (*v).to_owned());
            }
            _ => {}
        }
    }

    if assertion.roles.is_empty() && skipped_roles > 0 {
        return Err(Error::invalid_assertion(&format!(
            "none of the {} role attribute values could be read",
            skipped_roles
        )));
    }

    debug!(
        "parse_assertion: {} roles, session duration {:?}",
        assertion.roles.len(),
        assertion.session_duration
    );

    Ok(assertion)
}
