//! Scripted process runner for unit tests.

use async_trait::async_trait;
use camino::Utf8Path;
use qbridge_parsers::{CommandError, ExitStatus, ProcessRunner, SchedulerProcess, command_line};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Answers known command lines with canned stdout and exit codes.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, (String, i32)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, stdout: &str, code: i32) -> Self {
        self.responses
            .insert(command.to_string(), (stdout.to_string(), code));
        self
    }

    /// Command lines spawned so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    type Process = ScriptedProcess;

    fn spawn(&self, program: &Utf8Path, args: &[&str]) -> Result<ScriptedProcess, CommandError> {
        let command = command_line(program, args);
        self.calls.lock().unwrap().push(command.clone());
        match self.responses.get(&command) {
            Some((stdout, code)) => Ok(ScriptedProcess {
                command,
                stdout: stdout.clone(),
                code: *code,
            }),
            None => Err(CommandError::Execution {
                command,
                error: "no scripted response".to_string(),
            }),
        }
    }
}

pub struct ScriptedProcess {
    command: String,
    stdout: String,
    code: i32,
}

#[async_trait]
impl SchedulerProcess for ScriptedProcess {
    fn command(&self) -> &str {
        &self.command
    }

    async fn read_text(&mut self, _timeout: Duration) -> Result<String, CommandError> {
        Ok(self.stdout.clone())
    }

    async fn wait_status(&mut self, _timeout: Duration) -> Result<ExitStatus, CommandError> {
        Ok(ExitStatus::from_code(self.code))
    }

    fn stderr(&self) -> &str {
        if self.code == 0 { "" } else { "scripted failure" }
    }
}
