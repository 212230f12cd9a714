//! `ticketsmith run`: drive one mission end to end.
//!
//! The repository and tracker are journaling adapters, so a run never
//! touches a real forge. The journal is printed at the end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use serde::Deserialize;
use ticketsmith_agent::Agent;
use ticketsmith_core::{Capabilities, ExecutionMode, FileChange, FileContent};
use ticketsmith_providers::{ReasoningGateway, ScriptedProvider, build_gateway};
use ticketsmith_tools::{FilesystemDocs, Journal, JournalTracker, JournalVcs};
use ticketsmith_workflow::RunOutcome;

use super::{load_config, read_mission};

const REPLAY_MODEL: &str = "replay:scripted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Flow {
    /// Scaffold a service skeleton and open a merge request
    Scaffold,
    /// Review an open merge request
    Review,
}

pub struct RunArgs {
    pub flow: Flow,
    pub mission: PathBuf,
    pub mode: Option<ExecutionMode>,
    pub docs: Option<PathBuf>,
    pub replay: Option<PathBuf>,
    pub repo_state: Option<PathBuf>,
}

/// Initial state of the journaling repository.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepoSeed {
    pub base_url: Option<String>,
    pub branches: Vec<String>,
    pub open_merge_requests: Vec<String>,
    pub tree: Option<String>,
    pub original_code: Vec<FileContent>,
    pub diff: Vec<FileChange>,
}

impl RepoSeed {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read repository state {}: {e}", path.display()))?;
        let seed = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid repository state {}: {e}", path.display()))?;
        Ok(seed)
    }

    pub fn apply(self, mut vcs: JournalVcs) -> JournalVcs {
        if let Some(url) = self.base_url {
            vcs = vcs.with_base_url(url);
        }
        for branch in self.branches {
            vcs = vcs.with_branch(branch);
        }
        for iid in self.open_merge_requests {
            vcs = vcs.with_open_merge_request(iid);
        }
        if let Some(tree) = self.tree {
            vcs = vcs.with_tree(tree);
        }
        vcs.with_original_code(self.original_code).with_diff(self.diff)
    }
}

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let config = Arc::new(config);
    let mission = read_mission(&args.mission)?;

    let seed = match &args.repo_state {
        Some(path) => RepoSeed::load(path)?,
        None => RepoSeed::default(),
    };
    let journal = Journal::new();
    let vcs = seed.apply(JournalVcs::new(journal.clone()));
    let tracker = JournalTracker::new(journal.clone());
    let docs = match &args.docs {
        Some(dir) => FilesystemDocs::new(dir),
        None => FilesystemDocs::builtin(),
    };
    let capabilities = Capabilities::new(Arc::new(vcs), Arc::new(tracker), Arc::new(docs));

    let store = ticketsmith_store::from_config(&config.store)?;

    let (gateway, replay) = match &args.replay {
        Some(path) => {
            let provider = ScriptedProvider::from_file("replay", path)?;
            let gateway = ReasoningGateway::new((&config.reasoning).into()).with_backend(Arc::new(provider));
            (gateway, true)
        }
        None => (build_gateway(&config), false),
    };
    tracing::debug!(backends = ?gateway.backend_names(), "Gateway ready");

    let mut agent = match args.flow {
        Flow::Scaffold => Agent::scaffolder(config.clone(), Arc::new(gateway), store),
        Flow::Review => Agent::reviewer(config.clone(), Arc::new(gateway), store),
    };
    if let Some(mode) = args.mode {
        agent = agent.with_mode(mode);
    }
    if replay {
        agent = agent.with_models([REPLAY_MODEL]);
    }

    println!(
        "🔨 {} {} ({} mode)",
        agent.kind().name(),
        mission.key,
        agent.mode()
    );

    let result = agent.run(&mission, &capabilities).await;
    print_journal(&journal);

    match result {
        Ok(RunOutcome::Completed { summary }) => {
            println!("✅ {summary}");
            Ok(())
        }
        Ok(RunOutcome::Halted { message }) => {
            println!("⚠️  {message}");
            Ok(())
        }
        Err(e) => {
            println!("❌ {e}");
            Err(e.into())
        }
    }
}

fn print_journal(journal: &Journal) {
    let entries = journal.entries();
    println!();
    println!("   Journal ({} calls, {} side effects):", entries.len(), journal.side_effects().len());
    for entry in &entries {
        println!("   {entry}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_seed_parses_partial_state() {
        let seed: RepoSeed = serde_json::from_str(
            r#"{
                "branches": ["feature/proj-1-billing"],
                "open_merge_requests": ["7"],
                "diff": [{"file_path": "src/lib.rs", "change_type": "modified", "diff": "+x"}]
            }"#,
        )
        .unwrap();
        assert_eq!(seed.branches, vec!["feature/proj-1-billing"]);
        assert!(seed.tree.is_none());
        assert_eq!(seed.diff.len(), 1);
    }

    #[test]
    fn repo_seed_applies_branches() {
        let seed = RepoSeed {
            branches: vec!["feature/x".into()],
            ..Default::default()
        };
        let vcs = seed.apply(JournalVcs::new(Journal::new()));
        assert!(vcs.has_branch("feature/x"));
        assert!(vcs.has_branch("main"));
    }
}
