//! JSON-file plan store

use super::write_atomic;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use stepwise_application::ports::plan_store::{PlanStore, StoreError};
use stepwise_domain::{Plan, StepTransition};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Mirrors each plan to `<dir>/<plan-id>.json` and appends every step
/// transition to `<dir>/<plan-id>.transitions.jsonl`.
///
/// The plan file is always replaced atomically, so a crash mid-write leaves
/// the previous snapshot intact.
pub struct JsonFilePlanStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePlanStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn plan_path(&self, plan_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(plan_id)))
    }

    pub fn transitions_path(&self, plan_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.transitions.jsonl", file_stem(plan_id)))
    }

    pub async fn load(&self, plan_id: &str) -> Result<Plan, StoreError> {
        let path = self.plan_path(plan_id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(plan_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    async fn write_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(plan)?;
        write_atomic(&self.plan_path(plan.id()), &json).await?;
        Ok(())
    }
}

fn file_stem(plan_id: &str) -> String {
    plan_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl PlanStore for JsonFilePlanStore {
    async fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_plan(plan).await?;
        debug!(plan = %plan.id(), status = %plan.status(), "Plan saved");
        Ok(())
    }

    async fn record_transition(
        &self,
        plan: &Plan,
        transition: &StepTransition,
    ) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(transition)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.transitions_path(plan.id()))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.write_plan(plan).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::{PlanStatus, Step, StepStatus};

    fn plan() -> Plan {
        Plan::new(
            "plan-1",
            "ship it",
            vec![Step::new("step-1", "build"), Step::new("step-2", "test")],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePlanStore::new(dir.path());
        store.save_plan(&plan()).await.unwrap();

        let loaded = store.load("plan-1").await.unwrap();
        assert_eq!(loaded, plan());
        assert_eq!(loaded.status(), PlanStatus::Running);
    }

    #[tokio::test]
    async fn test_transitions_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePlanStore::new(dir.path().join("plans"));
        let mut plan = plan();

        let first = plan.begin_attempt(0, 3).unwrap();
        store.record_transition(&plan, &first).await.unwrap();
        let second = plan.complete_step(0, "built").unwrap();
        store.record_transition(&plan, &second).await.unwrap();

        let lines = std::fs::read_to_string(store.transitions_path("plan-1")).unwrap();
        let recorded: Vec<StepTransition> = lines
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(recorded, vec![first, second]);

        let loaded = store.load("plan-1").await.unwrap();
        assert_eq!(loaded.steps()[0].status(), StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_plan_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePlanStore::new(dir.path());
        assert_eq!(
            store.load("nope").await.unwrap_err(),
            StoreError::NotFound("nope".into())
        );
    }

    #[test]
    fn test_plan_ids_cannot_escape_the_directory() {
        let store = JsonFilePlanStore::new("/state");
        assert_eq!(
            store.plan_path("../etc/passwd"),
            PathBuf::from("/state/___etc_passwd.json")
        );
    }
}
