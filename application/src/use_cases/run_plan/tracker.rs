//! In-memory plan state with best-effort persistence

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::plan_store::PlanStore;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stepwise_domain::{DomainError, Plan, PlanStatus, Step, StepStatus, StepTransition};
use tracing::warn;

/// Owns the plan during a run.
///
/// The in-memory plan is authoritative. A transition that cannot be applied
/// or persisted is logged and counted; the step keeps its last known status
/// and the run goes on.
pub(super) struct StepTracker {
    plan: Mutex<Plan>,
    store: Arc<dyn PlanStore>,
    logger: Arc<dyn ConversationLogger>,
    marking_failures: AtomicUsize,
}

impl StepTracker {
    pub(super) fn new(
        plan: Plan,
        store: Arc<dyn PlanStore>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        Self {
            plan: Mutex::new(plan),
            store,
            logger,
            marking_failures: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Plan> {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn snapshot(&self) -> Plan {
        self.lock().clone()
    }

    pub(super) fn step(&self, index: usize) -> Result<Step, DomainError> {
        self.lock()
            .step(index)
            .cloned()
            .ok_or(DomainError::UnknownStep(index))
    }

    pub(super) fn len(&self) -> usize {
        self.lock().steps().len()
    }

    /// Apply a step transition and mirror it to the store.
    pub(super) async fn mark<F>(&self, apply: F) -> Option<StepTransition>
    where
        F: FnOnce(&mut Plan) -> Result<StepTransition, DomainError>,
    {
        let applied = {
            let mut plan = self.lock();
            apply(&mut *plan).map(|transition| (transition, plan.clone()))
        };

        let (transition, plan) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                self.marking_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Step status could not be updated, keeping last known status");
                return None;
            }
        };

        self.logger.log(ConversationEvent::new(
            "step_transition",
            json!({
                "plan_id": transition.plan_id,
                "step_id": transition.step_id,
                "from": transition.from,
                "to": transition.to,
                "attempt": transition.attempt,
            }),
        ));

        if let Err(e) = self.store.record_transition(&plan, &transition).await {
            self.marking_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                step = %transition.step_id,
                to = %transition.to,
                error = %e,
                "Failed to persist step status"
            );
        }
        Some(transition)
    }

    /// Start an attempt of step `index`.
    ///
    /// A step still in progress after a rejected attempt is sent back to
    /// `Pending` with that attempt's feedback first, whichever part of the
    /// attempt rejected it.
    pub(super) async fn begin_attempt(
        &self,
        index: usize,
        budget: usize,
        previous_feedback: Option<&str>,
    ) -> Option<StepTransition> {
        if let Some(feedback) = previous_feedback
            && self
                .step(index)
                .is_ok_and(|s| s.status() == StepStatus::InProgress)
        {
            let feedback = feedback.to_string();
            self.mark(|p| p.retry_step(index, feedback)).await;
        }
        self.mark(|p| p.begin_attempt(index, budget)).await
    }

    /// Write the whole plan; failures are counted, never raised.
    pub(super) async fn save(&self) {
        let plan = self.snapshot();
        if let Err(e) = self.store.save_plan(&plan).await {
            self.marking_failures.fetch_add(1, Ordering::Relaxed);
            warn!(plan = %plan.id(), error = %e, "Failed to persist plan");
        }
    }

    pub(super) fn abort(&self) {
        self.lock().abort();
    }

    pub(super) fn finalize(&self) -> Result<PlanStatus, DomainError> {
        self.lock().finalize()
    }

    pub(super) fn into_parts(self) -> (Plan, usize) {
        let failures = self.marking_failures.load(Ordering::Relaxed);
        let plan = self.plan.into_inner().unwrap_or_else(PoisonError::into_inner);
        (plan, failures)
    }
}
