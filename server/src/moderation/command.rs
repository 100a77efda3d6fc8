//! Grammar for administrator commands.
//!
//! A command is a backslash keyword anywhere in the message, followed by a
//! whitespace-separated argument: `\kick bob`, `please \add carol`. Every
//! keyword in a message counts, so `\add x \kick bob` is two commands. A
//! keyword without an argument is not a command.

const KICK: &str = r"\kick";
const ADD: &str = r"\add";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Force-disconnect the named user.
    Kick { target: String },
    /// Announce a user. Only logged; no session state changes.
    Add { username: String },
}

impl AdminCommand {
    /// All recognised commands in `text`, in order of appearance.
    pub fn parse(text: &str) -> Vec<Self> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .windows(2)
            .filter_map(|pair| match pair {
                [KICK, target] => Some(AdminCommand::Kick {
                    target: target.to_string(),
                }),
                [ADD, username] => Some(AdminCommand::Add {
                    username: username.to_string(),
                }),
                _ => None,
            })
            .collect()
    }
}
