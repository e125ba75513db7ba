use crate::error::{Error, ErrorKind, Result};
use crate::prompt::Prompt;
use crate::saml::Role;

/// Keeps the roles whose role or principal ARN contains `account`.
pub fn filter_roles(roles: Vec<Role>, account: Option<&str>) -> Vec<Role> {
    match account {
        Some(account) => roles
            .into_iter()
            .filter(|r| r.arn.contains(account) || r.principal_arn.contains(account))
            .collect(),
        None => roles,
    }
}

/// Drops repeated role/principal pairs, keeping the first occurrence.
pub fn dedup_roles(roles: Vec<Role>) -> Vec<Role> {
    let mut unique: Vec<Role> = Vec::with_capacity(roles.len());

    for role in roles {
        if unique.contains(&role) {
            trace!("dedup_roles.skip {}", role.arn);
            continue;
        }
        unique.push(role);
    }

    unique
}

/// Resolves the candidates to the single role to assume. The user is only
/// asked when there is more than one distinct role.
pub fn select_role(roles: Vec<Role>, account: Option<&str>, prompt: &mut dyn Prompt) -> Result<Role> {
    let mut candidates = filter_roles(dedup_roles(roles), account);
    debug!("select_role: {} candidates after filter {:?}", candidates.len(), account);

    match candidates.len() {
        0 => Err(Error::new(
            ErrorKind::NoRole,
            &match account {
                Some(account) => format!("No assumable role found for account {}", account),
                None => "No assumable role found in the SAML assertion".to_owned(),
            },
        )),
        1 => Ok(candidates.remove(0)),
        count => {
            let answer = prompt.choose_role(&candidates)?;

            match answer.trim().parse::<usize>() {
                Ok(index) if index < count => Ok(candidates.remove(index)),
                _ => Err(Error::new(
                    ErrorKind::InvalidSelection,
                    "You selected an invalid role index, please try again",
                )),
            }
        }
    }
}
