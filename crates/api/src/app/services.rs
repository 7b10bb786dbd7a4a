use std::sync::Arc;

use tracing::{info, warn};

use grouppurge_infra::adapters::{InMemoryBackend, LoggingMemberRemover, Seed, SeedError};
use grouppurge_infra::jobs::{InMemoryJobStore, JobRunner, RunnerConfig};
use grouppurge_removal::{MemberRemover, RemovalPorts, RemovalWorkflow};

use crate::settings::Settings;

pub type Runner = JobRunner<Arc<InMemoryJobStore>>;

/// Everything the handlers need.
#[derive(Clone)]
pub struct AppServices {
    pub runner: Runner,
    pub ports: RemovalPorts,
    pub backend: InMemoryBackend,
}

impl AppServices {
    /// In-memory services removing through `remover`.
    pub fn in_memory(
        backend: InMemoryBackend,
        remover: Arc<dyn MemberRemover>,
        config: RunnerConfig,
    ) -> Self {
        let ports = backend.ports_with_remover(remover);
        let runner = JobRunner::new(
            InMemoryJobStore::arc(),
            RemovalWorkflow::new(ports.clone()),
            config,
        );
        Self {
            runner,
            ports,
            backend,
        }
    }
}

/// Wire the in-memory backend, loading seed data when configured.
pub fn build_services(settings: &Settings) -> Result<AppServices, SeedError> {
    let backend = InMemoryBackend::new();
    match &settings.seed_path {
        Some(path) => {
            info!(path = %path.display(), "loading seed data");
            backend.seed(&Seed::from_path(path)?)?;
        }
        None => warn!("SEED_PATH not set; starting with an empty directory"),
    }

    warn!("no messaging platform client configured; removal calls are only logged");
    Ok(AppServices::in_memory(
        backend,
        Arc::new(LoggingMemberRemover),
        settings.runner.clone(),
    ))
}
