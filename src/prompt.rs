use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::{Error, ErrorKind, Result};
use crate::saml::Role;

/// Everything the login needs to ask the user.
pub trait Prompt {
    /// Asks for the username. An empty answer means "use the remembered one",
    /// the caller takes care of that.
    fn username(&mut self, remembered: Option<&str>) -> Result<String>;
    fn password(&mut self) -> Result<String>;
    fn mfa_token(&mut self) -> Result<String>;
    /// Shows the candidate roles and returns the raw answer.
    fn choose_role(&mut self, roles: &[Role]) -> Result<String>;
}

#[derive(Tabled)]
struct RoleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Role")]
    arn: String,
}

/// Prompts on the controlling terminal.
pub struct Terminal;

impl Terminal {
    fn ask(&self, question: &str) -> Result<String> {
        print!("{} {}", "?".green(), question);
        io::stdout().flush()?;

        let mut buf = String::new();
        let read = io::stdin().lock().read_line(&mut buf)?;
        if read == 0 {
            return Err(Error::new(ErrorKind::Io, "stdin was closed"));
        }

        Ok(buf.trim().into())
    }
}

impl Prompt for Terminal {
    fn username(&mut self, remembered: Option<&str>) -> Result<String> {
        match remembered {
            Some(last) => self.ask(&format!("Privileged user (e.g. adm\\dev_aly) [{}]: ", last.yellow())),
            None => self.ask("Privileged user (e.g. adm\\dev_aly): "),
        }
    }

    fn password(&mut self) -> Result<String> {
        Ok(rpassword::prompt_password(format!("{} Domain password: ", "?".green()))?)
    }

    fn mfa_token(&mut self) -> Result<String> {
        self.ask("MFA Token: ")
    }

    fn choose_role(&mut self, roles: &[Role]) -> Result<String> {
        let rows = roles.iter().enumerate().map(|(index, role)| RoleRow {
            index,
            arn: role.arn.clone(),
        });

        println!("\nPlease choose the AWS account and role you would like to assume:\n");
        println!("{}\n", Table::new(rows).with(Style::rounded()));

        self.ask("Selection: ")
    }
}
