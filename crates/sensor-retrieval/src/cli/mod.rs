//! Interactive command loop.

pub mod commands;

use std::io::{self, Write};

use sensor_core::{Result, RunState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info};

use crate::system::RetrievalSystem;
use commands::{CommandTable, Reply};

const PROMPT: &str = "enter command: ";
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Read-dispatch-print loop over a single persistent reader.
pub struct CommandLoop<R, W> {
    system: RetrievalSystem,
    table: CommandTable,
    run_state: RunState,
    input: R,
    output: W,
}

impl<R, W> CommandLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(system: RetrievalSystem, input: R, output: W) -> Self {
        Self::with_table(system, CommandTable::standard(), input, output)
    }

    pub fn with_table(system: RetrievalSystem, table: CommandTable, input: R, output: W) -> Self {
        Self {
            system,
            table,
            run_state: RunState::Running,
            input,
            output,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Run until `exit` or end of input, then deregister.
    ///
    /// Deregistration runs exactly once before this returns, whether the
    /// loop ended normally or on an I/O error.
    pub async fn run(mut self) -> io::Result<RetrievalSystem> {
        let outcome = self.drive().await;
        self.shutdown().await;
        outcome.map(|()| self.system)
    }

    async fn drive(&mut self) -> io::Result<()> {
        writeln!(self.output, "Starting sensor retrieval system cli...")?;
        while self.run_state().is_running() {
            self.step().await?;
        }
        Ok(())
    }

    /// Prompt, read one line, dispatch it and render the reply.
    pub async fn step(&mut self) -> io::Result<()> {
        write!(self.output, "{}", PROMPT)?;
        self.output.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf).await? == 0 {
            writeln!(self.output)?;
            info!("Input closed, stopping");
            self.run_state.stop();
            return Ok(());
        }

        // Undecodable bytes become U+FFFD and fall through to "no command found".
        let line = String::from_utf8_lossy(&buf);
        let reply = self
            .table
            .dispatch(&line, &self.system, &mut self.run_state)
            .await;
        self.render(reply)
    }

    fn render(&mut self, reply: Result<Reply>) -> io::Result<()> {
        match reply {
            Ok(Reply::Text(text)) => writeln!(self.output, "{}", text),
            Ok(Reply::ClearScreen) => {
                let _ = write!(self.output, "{}", CLEAR_SCREEN).and_then(|()| self.output.flush());
                Ok(())
            }
            Ok(Reply::Nothing) => Ok(()),
            Err(e) => {
                debug!("Command failed: {}", e);
                writeln!(self.output, "error: {}", e)
            }
        }
    }

    async fn shutdown(&mut self) {
        let _ = writeln!(self.output, "Stopping the sensor retrieval system!");
        if let Err(e) = self.system.stop().await {
            error!("❌ {}", e);
            let _ = writeln!(self.output, "error: {}", e);
        }
        debug!("System state after shutdown: {:?}", self.system.state());
        let _ = self.output.flush();
    }
}
