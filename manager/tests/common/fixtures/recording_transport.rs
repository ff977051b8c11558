//! Command transport that records every script run instead of using ssh
//!
//! Failures can be injected per script, and when a sandbox is attached each
//! call also records how many snapshots had been requested at that moment,
//! which lets tests check ordering between remote scripts and provider calls.

use anyhow::{bail, Result};
use async_trait::async_trait;
use fleet_manager::cloud::SandboxCloud;
use fleet_manager::remote::{CommandTransport, RemoteCommand};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: RemoteCommand,
    /// Snapshot requests the sandbox had seen when the call was made
    pub snapshots_before: usize,
}

impl RecordedCall {
    pub fn script(&self) -> &str {
        &self.command.script
    }

    pub fn address(&self) -> &str {
        &self.command.address
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<HashMap<String, u32>>,
    outputs: Mutex<HashMap<String, String>>,
    cloud: Mutex<Option<Arc<SandboxCloud>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, cloud: Arc<SandboxCloud>) {
        *self.cloud.lock().unwrap() = Some(cloud);
    }

    /// The next `times` runs of `script` fail; `u32::MAX` fails forever
    pub fn fail_script(&self, script: &str, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(script.to_string(), times);
    }

    /// Stdout returned by successful runs of `script`
    pub fn respond_with(&self, script: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(script.to_string(), output.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, script: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.script() == script)
            .collect()
    }

    /// Scripts in call order
    pub fn scripts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command.script).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn execute(&self, command: &RemoteCommand) -> Result<String> {
        let cloud = self.cloud.lock().unwrap().clone();
        let snapshots_before = match cloud {
            Some(cloud) => cloud.snapshot_requests().await.len(),
            None => 0,
        };
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.clone(),
            snapshots_before,
        });

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&command.script) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    bail!("{} exited with status 255", command.script);
                }
            }
        }

        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(&command.script)
            .cloned()
            .unwrap_or_default())
    }
}
