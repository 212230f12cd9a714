//! End-to-end tests for Ticketsmith missions.
//!
//! These drive the agent facade over journaling adapters and scripted model
//! backends, and run the `ticketsmith` binary against temporary files.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use ticketsmith_agent::Agent;
use ticketsmith_config::AppConfig;
use ticketsmith_core::{
    Capabilities, ChangeType, ExecutionMode, FileChange, IdempotencyStore, Message, Mission,
    ProviderFailure,
};
use ticketsmith_providers::{GatewaySettings, ReasoningGateway, ScriptedCall, ScriptedProvider, ScriptedReply};
use ticketsmith_store::{FileStore, InMemoryStore};
use ticketsmith_tools::{FilesystemDocs, Journal, JournalTracker, JournalVcs};
use ticketsmith_workflow::RunOutcome;

// ── Fixtures ─────────────────────────────────────────────────────────────

const BRANCH: &str = "feature/proj-1-billing";

struct World {
    journal: Journal,
    vcs: Arc<JournalVcs>,
    tracker: Arc<JournalTracker>,
}

impl World {
    fn new() -> Self {
        Self::with(|vcs| vcs, |tracker| tracker)
    }

    fn with(
        vcs: impl FnOnce(JournalVcs) -> JournalVcs,
        tracker: impl FnOnce(JournalTracker) -> JournalTracker,
    ) -> Self {
        let journal = Journal::new();
        Self {
            vcs: Arc::new(vcs(JournalVcs::new(journal.clone()))),
            tracker: Arc::new(tracker(JournalTracker::new(journal.clone()))),
            journal,
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.vcs.clone(), self.tracker.clone(), Arc::new(FilesystemDocs::builtin()))
    }

    fn vcs_side_effects(&self) -> usize {
        self.journal.side_effects().iter().filter(|e| e.system == "gitlab").count()
    }

    fn comments_containing(&self, needle: &str) -> usize {
        self.tracker.comments().iter().filter(|(_, text)| text.contains(needle)).count()
    }
}

fn gateway(providers: Vec<Arc<ScriptedProvider>>) -> Arc<ReasoningGateway> {
    let gateway = providers
        .into_iter()
        .fold(ReasoningGateway::new(GatewaySettings::default()), |g, p| g.with_backend(p));
    Arc::new(gateway)
}

fn scripted(replies: &[&str]) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(
        "scripted",
        replies.iter().map(|r| Ok(Message::assistant(*r))).collect(),
    ))
}

fn scaffolder(provider: Arc<ScriptedProvider>, store: Arc<dyn IdempotencyStore>) -> Agent {
    Agent::scaffolder(Arc::new(AppConfig::default()), gateway(vec![provider]), store)
        .with_models(["scripted:test-model"])
}

fn reviewer(provider: Arc<ScriptedProvider>) -> Agent {
    Agent::reviewer(Arc::new(AppConfig::default()), gateway(vec![provider]), Arc::new(InMemoryStore::new()))
        .with_models(["scripted:test-model"])
}

fn plan() -> String {
    serde_json::json!({
        "commit_message": "feat: scaffold billing service",
        "files": [
            {"path": "Cargo.toml", "content": "[package]\nname = \"billing\""},
            {"path": "src/main.rs", "content": "fn main() {}"}
        ]
    })
    .to_string()
}

fn scaffold_mission_json() -> serde_json::Value {
    serde_json::json!({
        "id": "10001",
        "key": "PROJ-1",
        "summary": "Create billing service",
        "status": "To Do",
        "project_key": "PROJ",
        "issue_type": "Task",
        "description": {
            "raw_content": "Create a billing service that exposes an invoices API.",
            "config": {
                "target": {"gitlab_project_id": "42"},
                "parameters": {"service_name": "billing", "language": "rust"}
            }
        }
    })
}

fn scaffold_mission() -> Mission {
    serde_json::from_value(scaffold_mission_json()).unwrap()
}

fn review_mission() -> Mission {
    serde_json::from_value(serde_json::json!({
        "key": "PROJ-2",
        "summary": "Review billing service",
        "description": {
            "raw_content": "Please review the billing scaffold.",
            "config": {
                "parameters": {"service_name": "billing"},
                "code_review_params": {
                    "review_request_url": "https://gitlab.local/group/project/-/merge_requests/1",
                    "gitlab_project_id": "42",
                    "source_branch_name": BRANCH
                }
            }
        }
    }))
    .unwrap()
}

fn review_world() -> World {
    World::with(
        |vcs| {
            vcs.with_branch(BRANCH)
                .with_open_merge_request("1")
                .with_tree("src/\nsrc/lib.rs")
                .with_diff(vec![FileChange {
                    file_path: "src/lib.rs".into(),
                    old_path: None,
                    change_type: ChangeType::Modified,
                    diff: "+pub fn pay(amount: u64) { let _ = amount; }".into(),
                    is_binary: false,
                }])
        },
        |tracker| tracker,
    )
}

// ── Scaffolding ──────────────────────────────────────────────────────────

#[tokio::test]
async fn scaffold_opens_a_merge_request_and_moves_ticket_to_review() {
    let world = World::new();
    let agent = scaffolder(scripted(&[plan().as_str()]), Arc::new(InMemoryStore::new()));

    let outcome = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap();

    assert!(outcome.is_completed());
    assert!(world.vcs.has_branch(BRANCH));
    assert_eq!(world.vcs.commits().len(), 1);
    assert_eq!(world.vcs.merge_requests().len(), 1);
    assert_eq!(world.tracker.last_status("PROJ-1").as_deref(), Some("In Review"));
    let description = world.tracker.description("PROJ-1").unwrap();
    assert!(description.contains("code_review_params:"));
}

#[tokio::test]
async fn second_run_after_restart_has_no_vcs_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idempotency.json");

    let first = World::new();
    let store = Arc::new(FileStore::open(&path).unwrap());
    scaffolder(scripted(&[plan().as_str()]), store)
        .run(&scaffold_mission(), &first.capabilities())
        .await
        .unwrap();
    assert!(first.vcs_side_effects() > 0);

    // A fresh process: reopened store, repository without the branch.
    let second = World::new();
    let provider = scripted(&[plan().as_str()]);
    let store = Arc::new(FileStore::open(&path).unwrap());
    let outcome = scaffolder(provider.clone(), store)
        .run(&scaffold_mission(), &second.capabilities())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    assert!(outcome.message().contains("already completed"));
    assert_eq!(second.vcs_side_effects(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn existing_branch_halts_with_one_comment_and_no_failure() {
    let world = World::with(|vcs| vcs.with_branch(BRANCH), |tracker| tracker);
    let provider = scripted(&[plan().as_str()]);
    let agent = scaffolder(provider.clone(), Arc::new(InMemoryStore::new()));

    let outcome = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    assert_eq!(provider.calls(), 0);
    assert_eq!(world.journal.count("create_branch"), 0);
    assert_eq!(world.comments_containing("already exists"), 1);
    assert_eq!(world.comments_containing("failed at step"), 0);
    assert_eq!(world.tracker.last_status("PROJ-1").as_deref(), Some("In Review"));
}

#[tokio::test]
async fn step_failure_posts_exactly_one_failure_comment() {
    let world = World::with(|vcs| vcs.fail_on("create_merge_request", "502 Bad Gateway"), |tracker| tracker);
    let store = Arc::new(InMemoryStore::new());
    let agent = scaffolder(scripted(&[plan().as_str()]), store.clone());

    let err = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap_err();

    assert_eq!(err.step, "create_merge_request");
    assert_eq!(world.comments_containing("Scaffolding failed at step 'create_merge_request'"), 1);
    assert_eq!(world.comments_containing("failed at step"), 1);
    assert_eq!(store.len().await, 0);
    assert_eq!(world.tracker.last_status("PROJ-1"), None);
    assert_eq!(world.journal.count("disconnect"), 2);
}

#[tokio::test]
async fn fenced_plan_is_accepted() {
    let world = World::new();
    let fenced = format!("Here is the plan:\n```json\n{}\n```", plan());
    let agent = scaffolder(scripted(&[fenced.as_str()]), Arc::new(InMemoryStore::new()));

    let outcome = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(world.vcs.commits()[0].files.len(), 2);
}

#[tokio::test]
async fn gateway_falls_back_past_failing_candidates() {
    let world = World::new();
    let alpha = Arc::new(ScriptedProvider::failing("alpha", "503 Service Unavailable"));
    let beta = Arc::new(ScriptedProvider::new(
        "beta",
        vec![Err(ProviderFailure::permanent("beta", "model not found"))],
    ));
    let gamma = Arc::new(ScriptedProvider::text("gamma", plan()));
    let agent = Agent::scaffolder(
        Arc::new(AppConfig::default()),
        gateway(vec![alpha.clone(), beta.clone(), gamma.clone()]),
        Arc::new(InMemoryStore::new()),
    )
    .with_models(["alpha:fast", "beta:large", "gamma:small"]);

    let outcome = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!((alpha.calls(), beta.calls(), gamma.calls()), (1, 1, 1));
}

#[tokio::test]
async fn exhausted_gateway_fails_at_generate_plan() {
    let world = World::new();
    let alpha = Arc::new(ScriptedProvider::failing("alpha", "503"));
    let beta = Arc::new(ScriptedProvider::failing("beta", "timeout"));
    let agent = Agent::scaffolder(
        Arc::new(AppConfig::default()),
        gateway(vec![alpha, beta]),
        Arc::new(InMemoryStore::new()),
    )
    .with_models(["alpha:fast", "beta:large"]);

    let err = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap_err();

    assert_eq!(err.step, "generate_plan");
    assert!(err.to_string().contains("All 2 model candidate(s) failed"));
    assert_eq!(world.journal.count("create_branch"), 0);
}

// ── Code review ──────────────────────────────────────────────────────────

#[tokio::test]
async fn clean_review_moves_ticket_to_done() {
    let world = review_world();
    let report = r#"{"is_approved": true, "summary": "Clean change", "issues": []}"#;

    let outcome = reviewer(scripted(&[report])).run(&review_mission(), &world.capabilities()).await.unwrap();

    assert_eq!(outcome.message(), "Merge request !1: approved");
    assert_eq!(world.vcs.published_reviews().len(), 1);
    assert_eq!(world.tracker.last_status("PROJ-2").as_deref(), Some("Done"));
}

#[tokio::test]
async fn critical_finding_requests_changes() {
    let world = review_world();
    let report = r#"{"is_approved": true, "summary": "Looks fine", "issues": [
        {"file_path": "src/lib.rs", "line_number": 1, "severity": "CRITICAL",
         "description": "Amount is silently discarded"}
    ]}"#;

    let outcome = reviewer(scripted(&[report])).run(&review_mission(), &world.capabilities()).await.unwrap();

    assert_eq!(outcome.message(), "Merge request !1: changes requested");
    assert_eq!(world.tracker.last_status("PROJ-2").as_deref(), Some("Changes Requested"));
}

#[tokio::test]
async fn closed_merge_request_halts_without_failure_comment() {
    let world = World::with(|vcs| vcs.with_branch(BRANCH), |tracker| tracker);
    let provider = scripted(&["{}"]);

    let outcome = reviewer(provider.clone()).run(&review_mission(), &world.capabilities()).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    assert_eq!(provider.calls(), 0);
    assert_eq!(world.comments_containing("failed at step"), 0);
    assert!(world.tracker.statuses().is_empty());
}

// ── ReAct mode ───────────────────────────────────────────────────────────

#[tokio::test]
async fn react_mode_stops_at_the_iteration_cap() {
    let world = World::new();
    let mut config = AppConfig::default();
    config.scaffolder.max_iterations = 3;
    let provider = Arc::new(ScriptedProvider::from_replies(
        "scripted",
        vec![ScriptedReply::Message {
            content: "Still checking".into(),
            tool_calls: vec![ScriptedCall {
                id: None,
                name: "validate_branch_existence".into(),
                arguments: serde_json::json!({"branch_name": BRANCH}),
            }],
        }],
    ));
    let agent = Agent::scaffolder(Arc::new(config), gateway(vec![provider.clone()]), Arc::new(InMemoryStore::new()))
        .with_models(["scripted:test-model"])
        .with_mode(ExecutionMode::React);

    let outcome = agent.run(&scaffold_mission(), &world.capabilities()).await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(provider.calls(), 3);
    assert_eq!(world.journal.count("validate_branch_existence"), 3);
    assert_eq!(
        world.comments_containing("Agentic scaffolding stopped at the iteration cap (3) with 3 tool call(s)."),
        1
    );
}

// ── Binary ───────────────────────────────────────────────────────────────

fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn ticketsmith(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ticketsmith"));
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

fn memory_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, "[store]\nbackend = \"memory\"\n").unwrap();
    path
}

#[test]
fn binary_replays_a_scaffold_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = memory_config(dir.path());
    let mission = write_json(dir.path(), "mission.json", &scaffold_mission_json());
    let replay = write_json(dir.path(), "replay.json", &serde_json::json!([{ "content": plan() }]));

    let output = ticketsmith(&config)
        .args(["run", "--flow", "scaffold", "--mission"])
        .arg(&mission)
        .arg("--replay")
        .arg(&replay)
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("create_merge_request"));
    assert!(stdout.contains("✅"));
}

#[test]
fn binary_reports_an_existing_branch_as_a_halt() {
    let dir = tempfile::tempdir().unwrap();
    let config = memory_config(dir.path());
    let mission = write_json(dir.path(), "mission.json", &scaffold_mission_json());
    let replay = write_json(dir.path(), "replay.json", &serde_json::json!([{ "content": plan() }]));
    let state = write_json(dir.path(), "state.json", &serde_json::json!({ "branches": [BRANCH] }));

    let output = ticketsmith(&config)
        .args(["run", "--flow", "scaffold", "--mission"])
        .arg(&mission)
        .arg("--replay")
        .arg(&replay)
        .arg("--repo-state")
        .arg(&state)
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("already exists"));
    assert!(!stdout.contains("create_branch"));
}

#[test]
fn binary_fingerprint_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let config = memory_config(dir.path());
    let mission = write_json(dir.path(), "mission.json", &scaffold_mission_json());

    let run = || {
        let output = ticketsmith(&config).arg("fingerprint").arg("--mission").arg(&mission).output().unwrap();
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or_default().to_string()
    };

    let first = run();
    assert_eq!(first.len(), 64);
    assert_eq!(first, run());
}

#[test]
fn binary_rejects_an_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[scaffolder]\nmax_iterations = 0\n").unwrap();

    let output = ticketsmith(&config).args(["config", "validate"]).output().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("❌"));
}
