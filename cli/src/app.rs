//! Dependency wiring shared by the subcommands

use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use stepwise_application::{
    AgentExecutor, AgentServices, ConversationLogger, NoConversationLogger, NoProgress,
    OrchestrationParams, OrchestrationProgress,
};
use stepwise_infrastructure::{
    AppendProgressCapability, CachingGateway, CapabilityRegistry, FileCheckpointStore,
    FileConfig, FileFeatureLedger, JsonlConversationLogger, ProgressLog, ScriptedBackend,
    UpdateFeatureCapability,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a scripted run needs, built once per invocation.
pub struct Runtime {
    pub executor: AgentExecutor,
    pub gateway: CachingGateway,
    pub params: OrchestrationParams,
}

impl Runtime {
    pub fn build(
        config: &FileConfig,
        params: OrchestrationParams,
        script: &Path,
        quiet: bool,
        token: CancellationToken,
    ) -> Result<Self> {
        let backend = ScriptedBackend::from_file(script)
            .with_context(|| format!("loading response script {}", script.display()))?;
        info!(script = %script.display(), entries = backend.remaining(), "Loaded response script");

        let logger: Arc<dyn ConversationLogger> = match config.paths.conversation_log() {
            Some(path) => match JsonlConversationLogger::open(&path) {
                Some(logger) => Arc::new(logger),
                None => {
                    warn!(path = %path.display(), "Continuing without a conversation log");
                    Arc::new(NoConversationLogger)
                }
            },
            None => Arc::new(NoConversationLogger),
        };

        let gateway = CachingGateway::new(Arc::new(backend), config.gateway_settings())
            .with_logger(Arc::clone(&logger))
            .with_cancellation(token.clone());

        let ledger = Arc::new(FileFeatureLedger::new(config.paths.feature_ledger()));
        let progress_log = Arc::new(ProgressLog::new(config.paths.progress_log()));
        let tools = CapabilityRegistry::new()
            .register(UpdateFeatureCapability::new(ledger))
            .register(AppendProgressCapability::new(progress_log));

        let progress: Arc<dyn OrchestrationProgress> = if quiet {
            Arc::new(NoProgress)
        } else {
            Arc::new(ProgressReporter::new())
        };

        let mut services = AgentServices::new(Arc::new(gateway.clone()))
            .with_progress(progress)
            .with_logger(logger)
            .with_cancellation(token);
        if params.agent.checkpoint_interval.is_some() {
            services = services.with_checkpoints(Arc::new(FileCheckpointStore::new(
                config.paths.checkpoints_dir(),
            )));
        }

        let executor = AgentExecutor::new(services, Arc::new(tools), &params.model)
            .with_sampling(params.sampling.clone())
            .with_params(params.agent.clone());

        Ok(Self {
            executor,
            gateway,
            params,
        })
    }

    /// Log how the shared response cache did over the run.
    pub fn report_cache(&self) {
        let stats = self.gateway.cache().stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            entries = stats.len,
            hit_rate = format!("{:.0}%", stats.hit_rate() * 100.0),
            "Response cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_application::ToolExecutorPort;
    use stepwise_domain::FailurePolicy;

    #[test]
    fn test_build_registers_builtin_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("script.json");
        std::fs::write(&script, r#"["hello"]"#).unwrap();

        let mut config = FileConfig::default();
        config.paths.state_dir = Some(dir.path().join("state"));
        let params = OrchestrationParams::new("m", FailurePolicy::Abort);

        let runtime =
            Runtime::build(&config, params, &script, true, CancellationToken::new()).unwrap();
        let tools = runtime.executor.tools().available_tools();
        assert_eq!(tools, vec!["terminate", "update_feature", "append_progress"]);
    }

    #[test]
    fn test_missing_script_names_the_file() {
        let err = Runtime::build(
            &FileConfig::default(),
            OrchestrationParams::new("m", FailurePolicy::Abort),
            Path::new("/nonexistent/responses.json"),
            true,
            CancellationToken::new(),
        )
        .err()
        .unwrap();
        assert!(format!("{:#}", err).contains("/nonexistent/responses.json"));
    }
}
