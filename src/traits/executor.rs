use async_trait::async_trait;

use crate::engine::GraphRun;
use crate::errors::EngineError;

/// Scheduling strategy for one execution of a submitted graph.
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    /// Short strategy name used in logs.
    fn strategy(&self) -> &'static str;

    /// Drive every operator of `run.graph` from open to close.
    ///
    /// Returns `Ok(())` both on normal completion and when the run's gate was closed by a
    /// stop; the engine tells the two apart through the gate.
    async fn run(&self, run: GraphRun) -> Result<(), EngineError>;
}
