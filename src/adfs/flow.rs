use std::mem;

use super::field::{FieldRole, Stage};
use super::form::{extract_saml_response, Form};
use crate::client::{HttpSession, Page};
use crate::error::{Error, ErrorKind, Result};

pub const DEFAULT_IDP_ENTRY_URL: &str =
    "https://federation.visma.com/adfs/ls/idpinitiatedsignon.aspx?loginToRp=urn:amazon:webservices";
pub const FORMS_AUTHENTICATION: &str = "FormsAuthentication";
pub const DEFAULT_MFA_AUTH_METHOD: &str = "VismaMFAAdapter";

#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// IdP initiated sign-on page for the AWS relying party.
    pub entry_url: String,
    /// `AuthMethod` value posted with the MFA token.
    pub mfa_auth_method: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            entry_url: DEFAULT_IDP_ENTRY_URL.into(),
            mfa_auth_method: DEFAULT_MFA_AUTH_METHOD.into(),
        }
    }
}

#[derive(Debug)]
pub enum State {
    AwaitingLoginForm,
    /// Holds the page the credentials post landed on, i.e. the MFA form.
    CredentialsSubmitted(Page),
    /// Holds the page the token post landed on.
    ChallengeSubmitted(Page),
    AssertionReceived(String),
    Failed,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::AwaitingLoginForm => "AwaitingLoginForm",
            State::CredentialsSubmitted(_) => "CredentialsSubmitted",
            State::ChallengeSubmitted(_) => "ChallengeSubmitted",
            State::AssertionReceived(_) => "AssertionReceived",
            State::Failed => "Failed",
        }
    }
}

pub struct LoginFlow<'a, S: HttpSession> {
    config: &'a FlowConfig,
    session: &'a mut S,
    state: State,
}

impl<'a, S: HttpSession> LoginFlow<'a, S> {
    pub fn new(config: &'a FlowConfig, session: &'a mut S) -> Self {
        LoginFlow {
            config,
            session,
            state: State::AwaitingLoginForm,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Fetches the login page and posts the username and password back to
    /// wherever the entry URL redirected to.
    pub fn submit_credentials(&mut self, username: &str, password: &str) -> Result<()> {
        trace!("submit_credentials.start");
        match mem::replace(&mut self.state, State::Failed) {
            State::AwaitingLoginForm => {}
            other => return Err(out_of_order("submit_credentials", &other)),
        }

        let login_page = self.session.get(&self.config.entry_url)?;
        debug!("login form resolved to {}", login_page.url);

        let form = Form::from_html(&login_page.body);
        if form.is_empty() {
            warn!("no input fields found on the login page {}", login_page.url);
        }
        debug!("login form fields: {:?}", form.names().collect::<Vec<&str>>());

        let payload = form.fill(Stage::Credentials, |role| match role {
            FieldRole::Username => Some(username),
            FieldRole::AuthMethod => Some(FORMS_AUTHENTICATION),
            FieldRole::Password => Some(password),
            _ => None,
        });

        trace!("submit_credentials.post");
        let response = self.session.post(&login_page.url, &payload)?;

        self.state = State::CredentialsSubmitted(response);
        trace!("submit_credentials.ok");
        Ok(())
    }

    /// Posts the MFA token on the challenge form returned by the credentials
    /// step.
    pub fn submit_challenge(&mut self, token: &str) -> Result<()> {
        trace!("submit_challenge.start");
        let challenge_page = match mem::replace(&mut self.state, State::Failed) {
            State::CredentialsSubmitted(page) => page,
            other => return Err(out_of_order("submit_challenge", &other)),
        };

        let form = Form::from_html(&challenge_page.body);
        let mfa_auth_method = self.config.mfa_auth_method.as_str();

        let payload = form.fill(Stage::Challenge, |role| match role {
            FieldRole::Challenge => Some(token),
            FieldRole::AuthMethod => Some(mfa_auth_method),
            _ => None,
        });

        trace!("submit_challenge.post");
        let response = self.session.post(&challenge_page.url, &payload)?;

        self.state = State::ChallengeSubmitted(response);
        trace!("submit_challenge.ok");
        Ok(())
    }

    /// Picks the SAML response out of the page returned for the token.
    pub fn finish(&mut self) -> Result<String> {
        trace!("finish.start");
        let page = match mem::replace(&mut self.state, State::Failed) {
            State::ChallengeSubmitted(page) => page,
            other => return Err(out_of_order("finish", &other)),
        };

        match extract_saml_response(&page.body) {
            Some(assertion) => {
                self.state = State::AssertionReceived(assertion.clone());
                trace!("finish.ok");
                Ok(assertion)
            }
            None => {
                debug!("no SAMLResponse on {}", page.url);
                Err(Error::new(
                    ErrorKind::LoginFailed,
                    "Your login failed, please contact launch control or check token/username/password",
                ))
            }
        }
    }
}

fn out_of_order(step: &str, state: &State) -> Error {
    Error::new(
        ErrorKind::LoginFailed,
        &format!("login step {} is not valid in state {}", step, state.name()),
    )
}

/// Runs the whole login and returns the base64 SAML assertion. The MFA token
/// is only asked for once the credentials were accepted.
pub fn get_assertion_response<S, F>(
    session: &mut S,
    config: &FlowConfig,
    username: &str,
    password: &str,
    mfa_token: F,
) -> Result<String>
where
    S: HttpSession,
    F: FnOnce() -> Result<String>,
{
    trace!("get_assertion_response.start");
    let mut flow = LoginFlow::new(config, session);

    flow.submit_credentials(username, password)?;
    let token = mfa_token()?;
    flow.submit_challenge(token.trim())?;

    let assertion = flow.finish();
    debug!("login flow ended in state {}", flow.state().name());
    assertion
}
