use anyhow::{Context, Result, bail};

use remindr_types::EventId;

pub const USAGE: &str = "\
usage: remindr <command>

  register <username> <password>
  login <username> <password>
  logout
  add <name> <MM/DD/YYYY> <hh:mm AM|PM> [--remind]
  list
  edit <id> <name> <MM/DD/YYYY> <hh:mm AM|PM> [--remind]
  delete <id>
  watch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Add { name: String, date: String, time: String, remind: bool },
    List,
    Edit { id: EventId, name: String, date: String, time: String, remind: bool },
    Delete { id: EventId },
    Watch,
}

impl Command {
    /// Parse arguments after the program name. `hh:mm` and the AM/PM marker
    /// may be passed as one argument or two.
    pub fn parse(args: &[String]) -> Result<Self> {
        let remind = args.iter().any(|a| a == "--remind");
        let rest: Vec<&str> = args
            .iter()
            .map(String::as_str)
            .filter(|a| *a != "--remind")
            .collect();

        let command = match rest.as_slice() {
            ["register", username, password] => Command::Register {
                username: username.to_string(),
                password: password.to_string(),
            },
            ["login", username, password] => Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ["logout"] => Command::Logout,
            ["add", name, date, time @ ..] if !time.is_empty() => Command::Add {
                name: name.to_string(),
                date: date.to_string(),
                time: time.join(" "),
                remind,
            },
            ["list"] => Command::List,
            ["edit", id, name, date, time @ ..] if !time.is_empty() => Command::Edit {
                id: parse_id(id)?,
                name: name.to_string(),
                date: date.to_string(),
                time: time.join(" "),
                remind,
            },
            ["delete", id] => Command::Delete { id: parse_id(id)? },
            ["watch"] => Command::Watch,
            _ => bail!("{USAGE}"),
        };
        Ok(command)
    }
}

fn parse_id(raw: &str) -> Result<EventId> {
    raw.parse()
        .with_context(|| format!("event id must be a number, got {raw:?}"))
}
