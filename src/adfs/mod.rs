//! Browser-less login against an ADFS style identity provider: a forms
//! authentication page followed by a challenge (MFA) page, ending in an
//! auto-submit form that carries the SAML response.

pub mod field;
pub mod flow;
pub mod form;

pub use self::flow::{get_assertion_response, FlowConfig};
