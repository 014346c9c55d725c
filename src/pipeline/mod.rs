use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agents::{self, AgentDefinition, AgentName};
use crate::config::Config;

/// The assembled agent graph: five agents, handoff edges fixed at
/// construction, one entry point.
pub struct Pipeline {
    agents: HashMap<AgentName, AgentDefinition>,
    entry: AgentName,
}

impl Pipeline {
    /// Builds the agents terminal-first, so every handoff edge points at an
    /// agent that already exists. The graph is acyclic by construction.
    pub fn assemble(config: &Config) -> Self {
        let decision_support = agents::decision_support::definition(config);
        let report_generation = agents::report_generation::definition(config, &decision_support);
        let content_analysis = agents::content_analysis::definition(config, &report_generation);
        let data_collection = agents::data_collection::definition(config, &content_analysis);
        let coordinator =
            agents::coordinator::definition(config, &data_collection, &content_analysis);

        let mut map = HashMap::new();
        for agent in [
            decision_support,
            report_generation,
            content_analysis,
            data_collection,
            coordinator,
        ] {
            map.insert(agent.name, agent);
        }

        Self {
            agents: map,
            entry: AgentName::Coordinator,
        }
    }

    pub fn entry(&self) -> &AgentDefinition {
        &self.agents[&self.entry]
    }

    pub fn agent(&self, name: AgentName) -> Option<&AgentDefinition> {
        self.agents.get(&name)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

/// Explicit, caller-owned pipeline handle. The serving component holds one
/// of these; tests call `reset` to force a rebuild. There is no process
/// global.
pub struct PipelineCell {
    config: Config,
    inner: RwLock<Option<Arc<Pipeline>>>,
}

impl PipelineCell {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: RwLock::new(None),
        }
    }

    /// Returns the current pipeline, building it on first access. A
    /// concurrent first access may race to the write lock; the loser
    /// returns the winner's instance, which is structurally identical.
    pub fn get_or_build(&self) -> Arc<Pipeline> {
        if let Some(pipeline) = self.inner.read().unwrap().as_ref() {
            return pipeline.clone();
        }

        let mut guard = self.inner.write().unwrap();
        if let Some(pipeline) = guard.as_ref() {
            return pipeline.clone();
        }

        let built = Arc::new(Pipeline::assemble(&self.config));
        *guard = Some(built.clone());
        built
    }

    /// Discards the cached instance; the next `get_or_build` rebuilds a
    /// fresh, structurally identical graph.
    pub fn reset(&self) {
        *self.inner.write().unwrap() = None;
    }
}
