//! Orchestrator integration tests
//!
//! Drives the orchestrator against a scripted in-memory transport that
//! records every remote call.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use afl_core::traits::{InteractiveSession, RemoteTransport};
use afl_core::{
    ActionResult, BatchStatusResult, CommandResult, DocumentReadResult, LaunchSpec,
    ServerDefinition, ServerRegistry, ServerState, SnapshotResult, StatusResult, TransportError,
    WriteResult,
};
use afl_orchestrator::document::snapshot_path;
use afl_orchestrator::{JoinOutcome, Orchestrator, OrchestratorSettings, RemoteConfigDocument};

/// A remote call as seen by the fake
#[derive(Debug, Clone, PartialEq)]
struct Call {
    host: String,
    command: String,
    timeout: Option<Duration>,
}

/// Scripted transport: per-host `screen -ls` output, unreachable hosts,
/// hosts that never answer, and an in-memory file system
#[derive(Default)]
struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    listings: Mutex<HashMap<String, String>>,
    down: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    files: Mutex<HashMap<(String, String), String>>,
}

impl FakeTransport {
    fn set_listing(&self, host: &str, sessions: &[&str]) {
        let mut text = String::from("There are screens on:\n");
        for (pid, session) in sessions.iter().enumerate() {
            text.push_str(&format!("\t{}.{}\t(Detached)\n", 4000 + pid, session));
        }
        text.push_str(&format!("{} Sockets in /run/screen/S-afl.\n", sessions.len()));
        self.listings.lock().insert(host.to_string(), text);
    }

    fn set_down(&self, host: &str) {
        self.down.lock().insert(host.to_string());
    }

    fn set_hanging(&self, host: &str) {
        self.hanging.lock().insert(host.to_string());
    }

    fn put_file(&self, host: &str, path: &str, contents: &str) {
        self.files
            .lock()
            .insert((host.to_string(), path.to_string()), contents.to_string());
    }

    fn file(&self, host: &str, path: &str) -> Option<String> {
        self.files
            .lock()
            .get(&(host.to_string(), path.to_string()))
            .cloned()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn listing_count(&self, host: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.host == host && c.command == "screen -ls")
            .count()
    }

    fn is_down(&self, host: &str) -> bool {
        self.down.lock().contains(host)
    }
}

#[async_trait]
impl RemoteTransport for FakeTransport {
    async fn execute(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Option<Duration>,
    ) -> CommandResult {
        self.calls.lock().push(Call {
            host: server.host.clone(),
            command: command.to_string(),
            timeout,
        });

        if self.is_down(&server.host) {
            return CommandResult::SshDown;
        }

        if self.hanging.lock().contains(&server.host) {
            let never = std::future::pending::<()>();
            return match timeout {
                Some(budget) => {
                    let _ = tokio::time::timeout(budget, never).await;
                    CommandResult::SshDown
                }
                None => {
                    never.await;
                    CommandResult::SshDown
                }
            };
        }

        let output = if command == "screen -ls" {
            self.listings
                .lock()
                .get(&server.host)
                .cloned()
                .unwrap_or_else(|| "No Sockets found in /run/screen/S-afl.\n".to_string())
        } else {
            format!("ran: {}\n", command)
        };

        CommandResult::Success {
            output,
            exit_code: Some(0),
            exit_signal: None,
        }
    }

    async fn open_interactive(
        &self,
        server: &ServerDefinition,
        command: &str,
    ) -> Result<InteractiveSession, TransportError> {
        self.calls.lock().push(Call {
            host: server.host.clone(),
            command: command.to_string(),
            timeout: None,
        });

        if self.is_down(&server.host) {
            return Err(TransportError::Connect {
                host: server.host.clone(),
                reason: "unreachable".to_string(),
            });
        }

        let (input_tx, _input_rx) = mpsc::channel(8);
        let (output_tx, output_rx) = mpsc::channel(8);
        output_tx
            .try_send(Bytes::from_static(b"attached"))
            .unwrap();
        Ok(InteractiveSession::new(input_tx, output_rx))
    }

    async fn read_file(
        &self,
        server: &ServerDefinition,
        path: &str,
    ) -> Result<String, TransportError> {
        if self.is_down(&server.host) {
            return Err(TransportError::Connect {
                host: server.host.clone(),
                reason: "unreachable".to_string(),
            });
        }
        self.file(&server.host, path)
            .ok_or_else(|| TransportError::Sftp(format!("No such file: {}", path)))
    }

    async fn write_file(
        &self,
        server: &ServerDefinition,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError> {
        if self.is_down(&server.host) {
            return Err(TransportError::Connect {
                host: server.host.clone(),
                reason: "unreachable".to_string(),
            });
        }
        self.put_file(&server.host, path, contents);
        Ok(())
    }
}

fn module(name: &str) -> LaunchSpec {
    LaunchSpec::Module {
        module: name.to_string(),
        env: Some("venv".to_string()),
    }
}

/// worker_a and worker_b on gpu-1, worker_c on gpu-2, worker_d inactive on gpu-2
fn registry() -> ServerRegistry {
    ServerRegistry::from_definitions(vec![
        ServerDefinition::new("worker_a", "gpu-1", "afl").with_launch(module("afl.worker")),
        ServerDefinition::new("worker_b", "gpu-1", "afl").with_launch(LaunchSpec::Script {
            path: "run.sh".to_string(),
        }),
        ServerDefinition::new("worker_c", "gpu-2", "afl").with_launch(module("afl.worker")),
        ServerDefinition::new("worker_d", "gpu-2", "afl").inactive(),
    ])
}

fn orchestrator() -> Orchestrator<FakeTransport> {
    Orchestrator::new(FakeTransport::default(), registry())
}

/// The snapshot document as currently stored on gpu-1's fake filesystem
fn stored_document(orch: &Orchestrator<FakeTransport>, path: &str) -> RemoteConfigDocument {
    let text = orch.transport().file("gpu-1", path).expect("snapshot file exists");
    RemoteConfigDocument::parse(&text).expect("snapshot file parses")
}

#[tokio::test(start_paused = true)]
async fn test_status_within_ttl_lists_once() {
    let orch = orchestrator();
    orch.transport().set_listing("gpu-1", &["worker_a"]);

    assert_eq!(
        orch.get_server_status("worker_a").await,
        StatusResult::Known { running: true }
    );
    assert_eq!(
        orch.get_server_status("worker_b").await,
        StatusResult::Known { running: false }
    );
    assert_eq!(orch.transport().listing_count("gpu-1"), 1);

    tokio::time::advance(Duration::from_millis(5001)).await;
    orch.get_server_status("worker_a").await;
    assert_eq!(orch.transport().listing_count("gpu-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_status_agrees_with_recent_batch() {
    let orch = orchestrator();
    orch.transport().set_listing("gpu-1", &["worker_a"]);

    let batch = orch.get_batch_server_status("gpu-1").await;
    let BatchStatusResult::Sessions { sessions } = batch else {
        panic!("expected sessions, got {:?}", batch);
    };
    assert!(sessions.contains("worker_a"));
    assert!(!sessions.contains("worker_b"));

    // The host changes behind our back; the cached answer stands
    orch.transport().set_listing("gpu-1", &["worker_a", "worker_b"]);
    assert_eq!(
        orch.get_server_status("worker_b").await,
        StatusResult::Known { running: false }
    );
    assert_eq!(orch.transport().listing_count("gpu-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_always_refreshes() {
    let orch = orchestrator();
    orch.transport().set_listing("gpu-1", &["worker_a"]);

    orch.get_batch_server_status("gpu-1").await;
    orch.get_batch_server_status("gpu-1").await;
    assert_eq!(orch.transport().listing_count("gpu-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_of_unreachable_host_is_ssh_down_and_not_cached() {
    let orch = orchestrator();
    orch.transport().set_down("gpu-2");

    assert_eq!(orch.get_server_status("worker_c").await, StatusResult::SshDown);
    assert_eq!(orch.get_server_status("worker_c").await, StatusResult::SshDown);
    assert_eq!(orch.transport().listing_count("gpu-2"), 2);
    assert!(orch.cache().entry("gpu-2").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_status_query_is_bounded_by_status_timeout() {
    let orch = orchestrator();
    orch.transport().set_hanging("gpu-1");

    let started = tokio::time::Instant::now();
    assert_eq!(orch.get_server_status("worker_a").await, StatusResult::SshDown);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(600));

    let calls = orch.transport().calls();
    assert_eq!(calls[0].timeout, Some(Duration::from_millis(500)));
}

#[tokio::test]
async fn test_unknown_server_fails_without_remote_call() {
    let orch = orchestrator();

    assert!(matches!(
        orch.start_server("nope").await,
        ActionResult::Failed { .. }
    ));
    assert!(matches!(
        orch.stop_server("nope").await,
        ActionResult::Failed { .. }
    ));
    assert!(matches!(
        orch.get_server_log("nope", None).await,
        ActionResult::Failed { .. }
    ));
    assert!(matches!(
        orch.get_server_status("nope").await,
        StatusResult::Failed { .. }
    ));
    assert!(matches!(
        orch.get_batch_server_status("gpu-9").await,
        BatchStatusResult::Failed { .. }
    ));
    assert!(matches!(orch.join_server("nope").await, JoinOutcome::Failed { .. }));

    assert!(orch.transport().calls().is_empty());
}

#[tokio::test]
async fn test_start_without_launch_form_fails_without_remote_call() {
    let orch = orchestrator();

    let result = orch.start_server("worker_d").await;
    let ActionResult::Failed { error } = result else {
        panic!("expected failure, got {:?}", result);
    };
    assert!(error.contains("worker_d"));
    assert!(orch.transport().calls().is_empty());
}

#[tokio::test]
async fn test_start_and_stop_send_screen_commands() {
    let orch = orchestrator();

    assert!(orch.start_server("worker_b").await.is_success());
    assert!(orch.stop_server("worker_b").await.is_success());

    let calls = orch.transport().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].command,
        "mkdir -p .afl && screen -dmS worker_b -L -Logfile .afl/worker_b.screenlog bash run.sh"
    );
    assert_eq!(calls[0].timeout, None);
    assert_eq!(calls[1].command, "screen -S worker_b -X quit");
}

#[tokio::test]
async fn test_restart_stops_then_starts() {
    let orch = orchestrator();

    assert!(orch.restart_server("worker_a").await.is_success());

    let commands: Vec<String> = orch
        .transport()
        .calls()
        .into_iter()
        .map(|c| c.command)
        .collect();
    assert_eq!(commands.len(), 2);
    assert!(commands[0].starts_with("screen -S worker_a -X quit"));
    assert!(commands[1].contains("screen -dmS worker_a"));
}

#[tokio::test]
async fn test_restart_attempts_start_when_stop_cannot_reach_host() {
    let orch = orchestrator();
    orch.transport().set_down("gpu-2");

    let result = orch.restart_server("worker_c").await;
    assert!(result.is_ssh_down());

    let calls = orch.transport().calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].command.contains("screen -dmS worker_c"));
}

#[tokio::test]
async fn test_restart_aborts_on_configuration_failure() {
    let orch = orchestrator();

    let result = orch.restart_server("nope").await;
    assert!(matches!(result, ActionResult::Failed { .. }));
    assert!(orch.transport().calls().is_empty());
}

#[tokio::test]
async fn test_log_uses_configured_default_line_count() {
    let settings = OrchestratorSettings {
        log_lines: 50,
        ..OrchestratorSettings::default()
    };
    let orch = Orchestrator::with_settings(FakeTransport::default(), registry(), settings);

    let result = orch.get_server_log("worker_a", None).await;
    let ActionResult::Completed { output, .. } = result else {
        panic!("expected output, got {:?}", result);
    };
    assert_eq!(output, "ran: tail -n 50 .afl/worker_a.screenlog\n");

    orch.get_server_log("worker_a", Some(5)).await;
    assert_eq!(
        orch.transport().calls()[1].command,
        "tail -n 5 .afl/worker_a.screenlog"
    );
}

#[tokio::test]
async fn test_execute_command_zero_timeout_is_unbounded() {
    let orch = orchestrator();

    orch.execute_command("worker_a", "uptime", 0).await;
    orch.execute_command("worker_a", "uptime", 250).await;

    let calls = orch.transport().calls();
    assert_eq!(calls[0].timeout, None);
    assert_eq!(calls[1].timeout, Some(Duration::from_millis(250)));
}

#[tokio::test]
async fn test_execute_command_reports_ssh_down() {
    let orch = orchestrator();
    orch.transport().set_down("gpu-2");

    assert_eq!(
        orch.execute_command("worker_c", "uptime", 0).await,
        ActionResult::SshDown
    );
}

#[tokio::test]
async fn test_join_attaches_to_screen_session() {
    let orch = orchestrator();

    let JoinOutcome::Attached(mut session) = orch.join_server("worker_a").await else {
        panic!("expected an attached session");
    };
    assert_eq!(session.read().await, Some(Bytes::from_static(b"attached")));
    assert_eq!(session.read().await, None);
    assert_eq!(orch.transport().calls()[0].command, "screen -x worker_a");
}

#[tokio::test]
async fn test_join_unreachable_host_is_ssh_down() {
    let orch = orchestrator();
    orch.transport().set_down("gpu-1");

    assert!(matches!(orch.join_server("worker_a").await, JoinOutcome::SshDown));
}

#[tokio::test(start_paused = true)]
async fn test_poll_all_isolates_hosts() {
    let orch = orchestrator();
    orch.transport().set_listing("gpu-1", &["worker_a"]);
    orch.transport().set_down("gpu-2");

    let states = orch.poll_all().await;
    assert_eq!(states.len(), 3);
    assert_eq!(states["worker_a"], ServerState::Running);
    assert_eq!(states["worker_b"], ServerState::Stopped);
    assert_eq!(states["worker_c"], ServerState::SshDown);
    assert!(!states.contains_key("worker_d"));
}

#[tokio::test(start_paused = true)]
async fn test_poll_all_is_not_held_up_by_a_hanging_host() {
    let orch = orchestrator();
    orch.transport().set_listing("gpu-1", &["worker_b"]);
    orch.transport().set_hanging("gpu-2");

    let started = tokio::time::Instant::now();
    let states = orch.poll_all().await;

    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(states["worker_b"], ServerState::Running);
    assert_eq!(states["worker_c"], ServerState::SshDown);
}

#[test]
fn test_servers_by_host_excludes_inactive() {
    let orch = orchestrator();
    let by_host = orch.get_servers_by_host();

    assert_eq!(by_host["gpu-1"], vec!["worker_a", "worker_b"]);
    assert_eq!(by_host["gpu-2"], vec!["worker_c"]);
}

#[tokio::test]
async fn test_replace_registry_is_seen_by_later_calls() {
    let orch = orchestrator();
    assert!(orch.server("worker_e").is_none());

    orch.replace_registry(ServerRegistry::from_definitions(vec![ServerDefinition::new(
        "worker_e", "gpu-3", "afl",
    )
    .with_launch(module("afl.worker"))]));

    assert!(orch.start_server("worker_e").await.is_success());
    assert_eq!(orch.server_names(), vec!["worker_e".to_string()]);
    assert_eq!(orch.transport().calls()[0].host, "gpu-3");
}

#[tokio::test]
async fn test_save_then_get_snapshot() {
    let orch = orchestrator();
    let worker = orch.server("worker_a").unwrap();
    let path = snapshot_path(&worker);
    assert_eq!(path, "/home/afl/.afl/config.json");

    orch.transport().put_file(
        "gpu-1",
        &path,
        r#"{"24/01/01 00:00:00.000000": {"old": true}}"#,
    );

    assert_eq!(orch.save_snapshot("gpu-1", json!({"a": 1})).await, WriteResult::Written);

    let result = orch.get_remote_snapshot("gpu-1").await;
    let SnapshotResult::Latest { snapshot, .. } = result else {
        panic!("expected a snapshot, got {:?}", result);
    };
    assert_eq!(snapshot, json!({"a": 1}));

    let stored = stored_document(&orch, &path);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored.get("24/01/01 00:00:00.000000"), Some(&json!({"old": true})));
}

#[tokio::test]
async fn test_save_snapshot_starts_fresh_document_when_missing_or_malformed() {
    let orch = orchestrator();

    assert!(orch.save_snapshot("gpu-1", json!({"a": 1})).await.is_success());
    let path = snapshot_path(&orch.server("worker_a").unwrap());
    let stored = stored_document(&orch, &path);
    assert_eq!(stored.len(), 1);

    orch.transport().put_file("gpu-1", &path, "[not, an object");
    assert!(orch.save_snapshot("gpu-1", json!({"b": 2})).await.is_success());
    let stored = stored_document(&orch, &path);
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_snapshot_of_empty_or_unreadable_document_is_empty() {
    let orch = orchestrator();
    assert_eq!(orch.get_remote_snapshot("gpu-1").await, SnapshotResult::Empty);

    orch.transport().set_down("gpu-2");
    assert_eq!(orch.get_remote_snapshot("gpu-2").await, SnapshotResult::Empty);
}

#[tokio::test]
async fn test_snapshot_for_unknown_host_fails() {
    let orch = orchestrator();

    assert!(matches!(
        orch.get_remote_snapshot("gpu-9").await,
        SnapshotResult::Failed { .. }
    ));
    assert!(matches!(
        orch.save_snapshot("gpu-9", json!({})).await,
        WriteResult::Failed { .. }
    ));
}

#[tokio::test]
async fn test_save_snapshot_to_unreachable_host_fails() {
    let orch = orchestrator();
    orch.transport().set_down("gpu-1");

    assert!(matches!(
        orch.save_snapshot("gpu-1", json!({"a": 1})).await,
        WriteResult::Failed { .. }
    ));
}

#[tokio::test]
async fn test_remote_document_read_and_write() {
    let orch = orchestrator();

    assert_eq!(
        orch.write_remote_document("gpu-1", "/tmp/notes.txt", "hello").await,
        WriteResult::Written
    );
    assert_eq!(
        orch.read_remote_document("gpu-1", "/tmp/notes.txt").await,
        DocumentReadResult::Loaded {
            data: "hello".to_string()
        }
    );
    assert!(matches!(
        orch.read_remote_document("gpu-1", "/tmp/missing.txt").await,
        DocumentReadResult::Failed { .. }
    ));
    assert!(matches!(
        orch.read_remote_document("gpu-9", "/tmp/notes.txt").await,
        DocumentReadResult::Failed { .. }
    ));
}
