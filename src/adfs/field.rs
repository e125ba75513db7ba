/// Which page of the login the form came from.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Stage {
    Credentials,
    Challenge,
}

/// What an input field of an IdP form is used for.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FieldRole {
    Username,
    Password,
    AuthMethod,
    Challenge,
    Passthrough,
}

/// Guesses the role of a form field from its name.
///
/// ADFS and its MFA adapters name their inputs differently across versions
/// (`UserName`, `ctl00$ContentPlaceHolder1$UsernameTextBox`,
/// `challengeQuestionInput`, ...), so the match is a case-insensitive
/// substring check. The first matching rule of the stage wins.
pub fn classify(name: &str, stage: Stage) -> FieldRole {
    let name = name.to_lowercase();

    let rules: &[(&str, FieldRole)] = match stage {
        Stage::Credentials => &[
            ("username", FieldRole::Username),
            ("authmethod", FieldRole::AuthMethod),
            ("password", FieldRole::Password),
        ],
        Stage::Challenge => &[
            ("challenge", FieldRole::Challenge),
            ("authmethod", FieldRole::AuthMethod),
        ],
    };

    rules
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|(_, role)| *role)
        .unwrap_or(FieldRole::Passthrough)
}
