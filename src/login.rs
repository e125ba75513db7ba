use std::path::PathBuf;

use chrono::Local;
use crossterm::style::Stylize;

use crate::adfs::{self, FlowConfig};
use crate::aws::credentials::{self, config_file_path, credentials_file_path};
use crate::aws::{AssumeRole, Credentials, StsClient, StsConfig};
use crate::cli::Cli;
use crate::client::{HttpSession, Session};
use crate::config::{self, UserStore};
use crate::error::{Error, ErrorKind, Result};
use crate::prompt::{Prompt, Terminal};
use crate::roles::select_role;
use crate::saml::{parse_assertion, Role};

/// Everything one run needs to know, resolved from flags, the settings
/// file and the defaults.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub profile: String,
    pub account: Option<String>,
    pub region: String,
    pub output: String,
    pub flow: FlowConfig,
    pub sts: StsConfig,
    pub credentials_path: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug)]
pub struct Outcome {
    pub role: Role,
    pub credentials: Credentials,
}

impl LoginRequest {
    pub fn from_cli(cli: &Cli, settings: config::Settings) -> Result<Self> {
        let mut sts = StsConfig::for_region(&cli.region);
        if let Some(endpoint) = settings.sts_endpoint {
            sts.endpoint = endpoint;
        }
        sts.session_duration = cli.session_duration.unwrap_or(settings.session_duration);

        Ok(LoginRequest {
            profile: cli.profile.clone(),
            account: cli.account.clone(),
            region: cli.region.clone(),
            output: settings.output,
            flow: FlowConfig {
                entry_url: cli.idp_url.clone().unwrap_or(settings.idp_url),
                mfa_auth_method: settings.mfa_auth_method,
            },
            sts,
            credentials_path: credentials_file_path()?,
            config_path: config_file_path()?,
        })
    }
}

/// Logs in, assumes the chosen role and stores its credentials. Nothing is
/// written to the AWS files unless every step before succeeded.
pub fn run<S, A>(
    request: &LoginRequest,
    session: &mut S,
    sts: &A,
    prompt: &mut dyn Prompt,
    user_store: &mut UserStore,
) -> Result<Outcome>
where
    S: HttpSession,
    A: AssumeRole,
{
    let remembered = user_store.username().map(|u| u.to_owned());

    let mut username = prompt.username(remembered.as_deref())?;
    if username.is_empty() {
        username = remembered.unwrap_or_default();
    }
    if username.is_empty() {
        return Err(Error::new(ErrorKind::Config, "A username is required"));
    }
    let password = prompt.password()?;

    if user_store.remember(&username)? {
        info!("remembered {} as the default user", username);
    }

    let saml_response = adfs::get_assertion_response(session, &request.flow, &username, &password, || {
        prompt.mfa_token()
    })?;

    let assertion = parse_assertion(&saml_response)?;
    if let Some(name) = &assertion.role_session_name {
        debug!("role session name {}", name);
    }

    let role = select_role(assertion.roles, request.account.as_deref(), prompt)?;
    let duration = request.sts.duration_for(assertion.session_duration);

    let credentials = sts.assume_role_with_saml(&role, &assertion.raw, duration)?;

    credentials::write_credentials(&request.credentials_path, &request.profile, &credentials)?;
    credentials::write_profile_config(
        &request.config_path,
        &request.profile,
        &request.region,
        &request.output,
    )?;

    Ok(Outcome { role, credentials })
}

pub fn command(cli: &Cli) -> Result<()> {
    let settings = config::load_settings(cli.config.as_deref())?;
    let request = LoginRequest::from_cli(cli, settings)?;
    debug!("{:?}", request.flow);

    let user_store_path = config::user_store_path()
        .ok_or_else(|| Error::new(ErrorKind::Config, "Could not determine home directory"))?;
    let mut user_store = UserStore::load(&user_store_path)?;

    let mut session = Session::new(cli.insecure)?;
    let sts = StsClient::new(&request.sts)?;

    println!(
        "{} This script will overwrite your AWS credentials stored at {}, section [{}]\n",
        "Warning:".yellow(),
        request.credentials_path.display(),
        request.profile.as_str().yellow()
    );

    let outcome = run(&request, &mut session, &sts, &mut Terminal, &mut user_store)?;

    let expiration = match outcome.credentials.expires_at() {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => outcome.credentials.expiration.clone(),
    };

    println!("\n----------------------------------------------------------------");
    println!(
        "Assumed {} in account {}",
        outcome.role.arn.as_str().yellow(),
        outcome.role.account_id().unwrap_or_else(|| "unknown".into())
    );
    println!(
        "Your AWS access key pair has been stored in the AWS configuration file {}",
        request.credentials_path.display()
    );
    println!("Note that it will expire at {}", expiration.green());
    println!("----------------------------------------------------------------\n");

    Ok(())
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::fs;

    use ini::Ini;

    use super::*;
    use crate::adfs::flow::test::{saml_page, ScriptedSession, LOGIN_PAGE, LOGIN_URL, MFA_PAGE, MFA_URL};
    use crate::roles::test::ScriptedPrompt;
    use crate::saml::test::encode_response;

    /// Records the calls and hands out fixed credentials.
    struct FakeSts {
        calls: RefCell<Vec<(Role, i64)>>,
    }

    impl FakeSts {
        fn new() -> Self {
            FakeSts {
                calls: RefCell::new(vec![]),
            }
        }
    }

    impl AssumeRole for FakeSts {
        fn assume_role_with_saml(&self, role: &Role, _saml_assertion: &str, session_duration: i64) -> Result<Credentials> {
            self.calls.borrow_mut().push((role.clone(), session_duration));

            Ok(Credentials {
                access_key_id: "ASIAEXAMPLE".into(),
                secret_access_key: "secret/key".into(),
                session_token: "token+==".into(),
                expiration: "2026-10-17T13:34:41Z".into(),
            })
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        request: LoginRequest,
        user_store: UserStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let credentials_path = dir.path().join("credentials");
        let config_path = dir.path().join("config");

        fs::write(&credentials_path, "[keep]\naws_access_key_id = AKIAKEEP\n").unwrap();
        fs::write(&config_path, "[profile keep]\nregion = us-east-1\n").unwrap();

        let user_store = UserStore::load(&dir.path().join(".pum-aws")).unwrap();

        Fixture {
            request: LoginRequest {
                profile: "prod".into(),
                account: None,
                region: "eu-west-1".into(),
                output: "json".into(),
                flow: FlowConfig::default(),
                sts: StsConfig::for_region("eu-west-1"),
                credentials_path,
                config_path,
            },
            user_store,
            dir,
        }
    }

    fn session_with_roles(roles: &[&str]) -> ScriptedSession {
        let saml = saml_page(&encode_response(roles));

        ScriptedSession::new(vec![
            (LOGIN_URL, LOGIN_PAGE),
            (MFA_URL, MFA_PAGE),
            (MFA_URL, saml.as_str()),
        ])
    }

    #[test]
    fn test_run_single_role() {
        let mut f = fixture();
        let mut session = session_with_roles(&[
            "arn:aws:iam::111122223333:saml-provider/ADFS,arn:aws:iam::111122223333:role/Admin",
        ]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("3");

        let outcome = run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap();

        assert_eq!(outcome.role.arn, "arn:aws:iam::111122223333:role/Admin");
        assert_eq!(prompt.role_prompts, 0);
        assert_eq!(
            *sts.calls.borrow(),
            vec![(
                Role {
                    arn: "arn:aws:iam::111122223333:role/Admin".into(),
                    principal_arn: "arn:aws:iam::111122223333:saml-provider/ADFS".into(),
                },
                3600
            )]
        );

        let credentials = Ini::load_from_file(&f.request.credentials_path).unwrap();
        assert_eq!(credentials.sections().flatten().count(), 2);
        assert_eq!(credentials.get_from(Some("keep"), "aws_access_key_id"), Some("AKIAKEEP"));
        assert_eq!(credentials.get_from(Some("prod"), "aws_access_key_id"), Some("ASIAEXAMPLE"));
        assert_eq!(credentials.get_from(Some("prod"), "aws_secret_access_key"), Some("secret/key"));
        assert_eq!(credentials.get_from(Some("prod"), "aws_session_token"), Some("token+=="));

        let config = Ini::load_from_file(&f.request.config_path).unwrap();
        assert_eq!(config.sections().flatten().count(), 2);
        assert_eq!(config.get_from(Some("profile keep"), "region"), Some("us-east-1"));
        assert_eq!(config.get_from(Some("profile prod"), "region"), Some("eu-west-1"));
        assert_eq!(config.get_from(Some("profile prod"), "output"), Some("json"));

        let store = UserStore::load(&f.dir.path().join(".pum-aws")).unwrap();
        assert_eq!(store.username(), Some("adm\\dev_aly"));
    }

    #[test]
    fn test_run_invalid_selection_does_not_assume() {
        let mut f = fixture();
        let mut session = session_with_roles(&[
            "arn:aws:iam::111122223333:role/Admin,arn:aws:iam::111122223333:saml-provider/ADFS",
            "arn:aws:iam::999988887777:role/ReadOnly,arn:aws:iam::999988887777:saml-provider/ADFS",
        ]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("5");

        let err = run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidSelection);
        assert!(sts.calls.borrow().is_empty());
        assert_eq!(
            fs::read_to_string(&f.request.credentials_path).unwrap(),
            "[keep]\naws_access_key_id = AKIAKEEP\n"
        );
    }

    #[test]
    fn test_run_account_filter() {
        let mut f = fixture();
        f.request.account = Some("999988887777".into());
        let mut session = session_with_roles(&[
            "arn:aws:iam::111122223333:role/Admin,arn:aws:iam::111122223333:saml-provider/ADFS",
            "arn:aws:iam::999988887777:role/ReadOnly,arn:aws:iam::999988887777:saml-provider/ADFS",
        ]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("0");

        let outcome = run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap();

        assert_eq!(outcome.role.arn, "arn:aws:iam::999988887777:role/ReadOnly");
        assert_eq!(prompt.role_prompts, 0);
    }

    #[test]
    fn test_run_login_failed_writes_nothing() {
        let mut f = fixture();
        let mut session = ScriptedSession::new(vec![
            (LOGIN_URL, LOGIN_PAGE),
            (MFA_URL, MFA_PAGE),
            (MFA_URL, MFA_PAGE),
        ]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("0");

        let err = run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap_err();

        assert_eq!(err.kind, ErrorKind::LoginFailed);
        assert!(sts.calls.borrow().is_empty());
        assert_eq!(
            fs::read_to_string(&f.request.config_path).unwrap(),
            "[profile keep]\nregion = us-east-1\n"
        );
    }

    #[test]
    fn test_run_without_roles() {
        let mut f = fixture();
        let mut session = session_with_roles(&[]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("0");

        let err = run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap_err();

        assert_eq!(err.kind, ErrorKind::NoRole);
    }

    #[test]
    fn test_run_uses_remembered_username() {
        let mut f = fixture();
        f.user_store.remember("adm\\remembered").unwrap();
        let mut session = session_with_roles(&[
            "arn:aws:iam::111122223333:role/Admin,arn:aws:iam::111122223333:saml-provider/ADFS",
        ]);
        let sts = FakeSts::new();
        let mut prompt = ScriptedPrompt::new("0");
        prompt.username = String::new();

        run(&f.request, &mut session, &sts, &mut prompt, &mut f.user_store).unwrap();

        assert_eq!(session.requests[1].2[0], ("UserName".to_owned(), "adm\\remembered".to_owned()));
    }
}
