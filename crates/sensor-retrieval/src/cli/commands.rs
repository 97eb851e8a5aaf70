//! Command table and the built-in commands.

use std::collections::HashMap;

use async_trait::async_trait;
use sensor_core::{CapabilityRequest, Result, RunState, SensorError, SensorReading};

use crate::system::RetrievalSystem;

const HELP_TEXT: &str = "
==============================================================================
        SENSOR RETRIEVAL SYSTEM - COMMAND LINE INTERFACE
==============================================================================

USAGE:
    <command> [args...]

COMMANDS:
    temp      Fetch the current temperature reading
    help      Show this help text
    clear     Clear the terminal
    exit      Deregister and stop the sensor retrieval system
";

/// What the loop should render after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    ClearScreen,
    Nothing,
}

/// Everything a command may touch.
pub struct CommandContext<'a> {
    pub system: &'a RetrievalSystem,
    pub run_state: &'a mut RunState,
    pub args: &'a [&'a str],
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Reply>;
}

/// `temp`: resolve a temperature provider and print its reading.
pub struct TempCommand;

#[async_trait]
impl Command for TempCommand {
    fn name(&self) -> &'static str {
        "temp"
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Reply> {
        let body = ctx
            .system
            .get_sensor_data(&CapabilityRequest::temperature())
            .await?;
        let reading = SensorReading::decode(&body)?;
        Ok(Reply::Text(format!("Temperature: {}", reading.temperature)))
    }
}

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn execute(&self, _ctx: &mut CommandContext<'_>) -> Result<Reply> {
        Ok(Reply::Text(HELP_TEXT.to_string()))
    }
}

pub struct ClearCommand;

#[async_trait]
impl Command for ClearCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    async fn execute(&self, _ctx: &mut CommandContext<'_>) -> Result<Reply> {
        Ok(Reply::ClearScreen)
    }
}

pub struct ExitCommand;

#[async_trait]
impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Reply> {
        ctx.run_state.stop();
        Ok(Reply::Nothing)
    }
}

/// Maps lowercase command names to handlers.
pub struct CommandTable {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// The `temp`, `help`, `clear` and `exit` commands.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.insert(Box::new(TempCommand));
        table.insert(Box::new(HelpCommand));
        table.insert(Box::new(ClearCommand));
        table.insert(Box::new(ExitCommand));
        table
    }

    pub fn insert(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(name.to_lowercase().as_str())
            .map(|command| command.as_ref())
    }

    /// Tokenize `line` on whitespace and run the command named by the first
    /// token.
    pub async fn dispatch(
        &self,
        line: &str,
        system: &RetrievalSystem,
        run_state: &mut RunState,
    ) -> Result<Reply> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = tokens.split_first().ok_or_else(SensorError::no_command)?;
        let command = self.lookup(name).ok_or_else(SensorError::no_command)?;

        let mut ctx = CommandContext {
            system,
            run_state,
            args,
        };
        command.execute(&mut ctx).await
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}
