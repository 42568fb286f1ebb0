//! Wires the configured collaborators into a [`Conversation`].

use std::sync::Arc;

use nao_hal::{ActionDispatcher, SimHandle, SimNao, StepPacing};
use nao_memory::{Embedder, HashEmbedder, MemoryBank, MemoryRouter, OpenAiEmbedder};
use nao_runtime::{
    ActionPlanner, CompletionClient, Conversation, LlmDriver, MemoryPlanner, SerperClient,
};
use tracing::{info, warn};

use crate::config::Config;

/// Pacing derived from `step_delay_ms`; zero disables it.
pub fn pacing_for(cfg: &Config) -> StepPacing {
    if cfg.step_delay_ms == 0 {
        StepPacing::None
    } else {
        StepPacing::Fixed(cfg.step_delay())
    }
}

/// Build a conversation for `username` driving a simulated NAO.
///
/// Returns the conversation and a handle on the robot's journal.
pub fn build(cfg: &Config, username: &str) -> Result<(Conversation, SimHandle), String> {
    let timeout = cfg.request_timeout();
    let api_key = (!cfg.openai_api_key.is_empty()).then(|| cfg.openai_api_key.clone());

    let driver = LlmDriver::new(&cfg.api_base_url, &cfg.chat_model, api_key.clone(), timeout)
        .map_err(|e| format!("Failed to build the completion client: {e}"))?;
    let client: Arc<dyn CompletionClient> = Arc::new(driver);

    let embedder: Arc<dyn Embedder> = match api_key {
        Some(key) => Arc::new(
            OpenAiEmbedder::new(&cfg.api_base_url, &cfg.embedding_model, key, timeout)
                .map_err(|e| format!("Failed to build the embedding client: {e}"))?,
        ),
        None => {
            warn!("no API key configured; memories use the offline hash embedder");
            Arc::new(HashEmbedder::default())
        }
    };

    let bank = match &cfg.memory_path {
        Some(path) => {
            info!(path = %path.display(), "opening long-term memory");
            MemoryBank::open(&path.to_string_lossy())
        }
        None => MemoryBank::open_in_memory(),
    }
    .map_err(|e| format!("Failed to open memory: {e}"))?;

    let mut action_planner = ActionPlanner::new(client.clone());
    if !cfg.serper_api_key.is_empty() {
        match SerperClient::new(cfg.serper_api_key.clone(), timeout) {
            Ok(search) => action_planner = action_planner.with_web_search(Arc::new(search)),
            Err(e) => warn!(error = %e, "web search disabled"),
        }
    }

    let nao = SimNao::new();
    let handle = nao.handle();
    let conversation = Conversation::new(
        username,
        MemoryPlanner::new(client),
        MemoryRouter::new(bank, embedder),
        action_planner,
        ActionDispatcher::new(Box::new(nao), pacing_for(cfg)),
    );
    Ok((conversation, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_delay_disables_pacing() {
        let cfg = Config {
            step_delay_ms: 0,
            ..Config::default()
        };
        assert_eq!(pacing_for(&cfg), StepPacing::None);
        assert_eq!(
            pacing_for(&Config::default()),
            StepPacing::Fixed(Duration::from_secs(1))
        );
    }

    #[test]
    fn offline_config_builds() {
        let (convo, robot) = build(&Config::default(), "Tamim").unwrap();
        assert_eq!(convo.username(), "Tamim");
        assert!(robot.calls().is_empty());
    }

    #[test]
    fn memory_file_is_created() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("memory.db");
        let cfg = Config {
            memory_path: Some(path.clone()),
            ..Config::default()
        };
        build(&cfg, "Tamim").unwrap();
        assert!(path.exists());
    }
}
