use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{ThermalClient, ThermalData};
use crate::config::RedfishConf;
use crate::error::FetchError;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Shells out to the DMTF `redfishtool` CLI and parses its JSON output.
pub struct RedfishToolClient {
    program: String,
    target: String,
    user: String,
    password: String,
    chassis: String,
}

impl RedfishToolClient {
    pub fn new(conf: &RedfishConf) -> Self {
        Self {
            program: "redfishtool".into(),
            target: conf.target.clone(),
            user: conf.user.clone(),
            password: conf.password.clone(),
            chassis: conf.chassis.clone(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self) -> Vec<&str> {
        vec![
            "-r", self.target.as_str(),
            "-u", self.user.as_str(),
            "-p", self.password.as_str(),
            "Chassis", "-I", self.chassis.as_str(), "Thermal",
        ]
    }
}

#[async_trait]
impl ThermalClient for RedfishToolClient {
    async fn thermal(&self) -> Result<ThermalData, FetchError> {
        debug!(program = %self.program, target = %self.target, "running redfishtool");
        let child = Command::new(&self.program)
            .args(self.args())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(COMMAND_TIMEOUT, child)
            .await
            .map_err(|_| FetchError::Command(format!("{} timed out", self.program)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        ThermalData::from_json(&output.stdout)
    }
}
