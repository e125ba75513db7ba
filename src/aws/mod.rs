pub mod assume_role;
pub mod credentials;
pub mod xml;

pub use self::assume_role::{AssumeRole, StsClient, StsConfig};
pub use self::xml::Credentials;
