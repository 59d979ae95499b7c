//! Composes one Ingestor task per configured chain plus one Calculator task,
//! and carries them through a shared cancellation signal to a clean exit.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::indexer::Ingestor;
use crate::points::Calculator;

pub struct Supervisor {
    ingestors: Vec<(Ingestor, u64)>,
    calculator: Calculator,
}

impl Supervisor {
    pub fn new(ingestors: Vec<(Ingestor, u64)>, calculator: Calculator) -> Self {
        Self { ingestors, calculator }
    }

    /// Runs every task to completion, returning once all have observed
    /// cancellation and drained. Does not itself install a signal listener —
    /// callers decide what triggers `shutdown`.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut tasks = JoinSet::new();

        for (ingestor, start_block) in self.ingestors {
            let token = shutdown.clone();
            tasks.spawn(async move { ingestor.run(start_block, token).await });
        }

        let token = shutdown.clone();
        let calculator = self.calculator;
        tasks.spawn(async move { calculator.run(token).await });

        info!(tasks = tasks.len(), "supervisor running");

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(err = %e, "a supervised task panicked");
            }
        }

        info!("supervisor: all tasks drained");
    }
}
