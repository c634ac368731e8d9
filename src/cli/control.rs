//! Line commands accepted by the interactive control loop.

use std::str::FromStr;

pub const HELP: &str = "Commands: start (open camera), stop (close camera), status, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command '{0}'. {help}", help = HELP)]
pub struct UnknownCommand(pub String);

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "open" => Ok(ControlCommand::Start),
            "stop" | "close" => Ok(ControlCommand::Stop),
            "status" => Ok(ControlCommand::Status),
            "help" | "?" => Ok(ControlCommand::Help),
            "quit" | "exit" | "q" => Ok(ControlCommand::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}
