//! Execution plans
//!
//! A plan file declares the node tree the engine executes: names, declared
//! modes, exclusive resources and scripted steps per lifecycle phase.
//! Plans are the discovery front-end of the CLI; library callers can build
//! trees directly instead.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::models::{ExclusiveResource, ExecutionMode, LockMode, TestTree, TestUnit};

/// Top-level plan file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanFile {
    /// Name of the run's root node
    pub name: String,

    /// Declared mode of the root node
    #[serde(default)]
    pub mode: Option<ExecutionMode>,

    /// Top-level nodes of the tree
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

/// One node of a plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,

    #[serde(default)]
    pub mode: Option<ExecutionMode>,

    #[serde(default)]
    pub resources: Vec<ResourceSpec>,

    #[serde(default)]
    pub before: Option<StepSpec>,

    #[serde(default)]
    pub run: Option<StepSpec>,

    #[serde(default)]
    pub after: Option<StepSpec>,

    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

/// Declared resource of a plan node. The mode defaults to exclusive
/// access, the safe reading of an unqualified declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub key: String,

    #[serde(default = "default_lock_mode")]
    pub mode: LockMode,
}

fn default_lock_mode() -> LockMode {
    LockMode::ReadWrite
}

impl ResourceSpec {
    fn to_resource(&self) -> ExclusiveResource {
        ExclusiveResource::new(self.key.clone(), self.mode)
    }
}

/// Scripted actions of one lifecycle phase, applied in field order:
/// sleep, then command, then forced failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StepSpec {
    /// Simulated work, in milliseconds
    #[serde(default)]
    pub sleep_ms: Option<u64>,

    /// Shell command; a non-zero exit fails the phase
    #[serde(default)]
    pub command: Option<String>,

    /// Unconditional failure with this message
    #[serde(default)]
    pub fail: Option<String>,
}

impl StepSpec {
    async fn run(&self, phase: &str, node: &str) -> Result<()> {
        if let Some(ms) = self.sleep_ms {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        if let Some(command) = &self.command {
            debug!("{node}: {phase} running `{command}`");
            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .output()
                .await
                .with_context(|| format!("Failed to spawn `{command}`"))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "command `{command}` exited with {}: {}",
                    output.status,
                    stderr.trim()
                );
            }
        }

        if let Some(reason) = &self.fail {
            bail!("{reason}");
        }
        Ok(())
    }
}

impl PlanFile {
    /// Load a plan from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read plan file")?;

        let plan: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML plan")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON plan")?
        };

        Ok(plan)
    }

    /// Parse a plan from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML plan")
    }

    /// Build the executable tree this plan describes
    pub fn build_tree(&self) -> TestTree {
        let root = ScriptedUnit {
            name: self.name.clone(),
            mode: self.mode,
            resources: Vec::new(),
            before: None,
            run: None,
            after: None,
        };
        let mut tree = TestTree::new(Arc::new(root));
        let root_id = tree.root();
        for spec in &self.nodes {
            add_node(&mut tree, root_id, spec);
        }
        tree
    }

    /// Total node count including the root
    pub fn node_count(&self) -> usize {
        fn count(spec: &NodeSpec) -> usize {
            1 + spec.children.iter().map(count).sum::<usize>()
        }
        1 + self.nodes.iter().map(count).sum::<usize>()
    }
}

fn add_node(tree: &mut TestTree, parent: usize, spec: &NodeSpec) {
    let unit = ScriptedUnit {
        name: spec.name.clone(),
        mode: spec.mode,
        resources: spec.resources.iter().map(ResourceSpec::to_resource).collect(),
        before: spec.before.clone(),
        run: spec.run.clone(),
        after: spec.after.clone(),
    };
    let id = tree.add_child(parent, Arc::new(unit));
    for child in &spec.children {
        add_node(tree, id, child);
    }
}

/// Executable unit backed by a plan node's scripted steps
pub struct ScriptedUnit {
    name: String,
    mode: Option<ExecutionMode>,
    resources: Vec<ExclusiveResource>,
    before: Option<StepSpec>,
    run: Option<StepSpec>,
    after: Option<StepSpec>,
}

#[async_trait]
impl TestUnit for ScriptedUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn execution_mode(&self) -> Option<ExecutionMode> {
        self.mode
    }

    fn exclusive_resources(&self) -> Vec<ExclusiveResource> {
        self.resources.clone()
    }

    async fn before(&self) -> Result<()> {
        match &self.before {
            Some(step) => step.run("before", &self.name).await,
            None => Ok(()),
        }
    }

    async fn execute(&self) -> Result<()> {
        match &self.run {
            Some(step) => step.run("run", &self.name).await,
            None => Ok(()),
        }
    }

    async fn after(&self) -> Result<()> {
        match &self.after {
            Some(step) => step.run("after", &self.name).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::executor::{execute_all, CancelToken};
    use crate::models::NodeStatus;
    use crate::output::NullListener;

    const SAMPLE_PLAN: &str = r#"
name: checkout-suite
nodes:
  - name: inventory
    resources:
      - key: inventory-db
    run: { sleep_ms: 1 }
    children:
      - name: restock
        run: { sleep_ms: 1 }
  - name: pricing
    mode: same_thread
    children:
      - name: discounts
        resources:
          - { key: price-table, mode: read }
"#;

    #[test]
    fn test_parse_yaml_plan() {
        let plan = PlanFile::from_yaml(SAMPLE_PLAN).expect("plan parses");
        assert_eq!(plan.name, "checkout-suite");
        assert_eq!(plan.nodes.len(), 2);
        assert_eq!(plan.node_count(), 5);

        let inventory = &plan.nodes[0];
        assert_eq!(inventory.resources.len(), 1);
        assert_eq!(
            inventory.resources[0].mode,
            LockMode::ReadWrite,
            "unqualified resources default to exclusive access"
        );
        assert_eq!(plan.nodes[1].mode, Some(ExecutionMode::SameThread));
        assert_eq!(plan.nodes[1].children[0].resources[0].mode, LockMode::Read);
    }

    #[test]
    fn test_build_tree_mirrors_plan_shape() {
        let plan = PlanFile::from_yaml(SAMPLE_PLAN).expect("plan parses");
        let tree = plan.build_tree();

        assert_eq!(tree.len(), 5);
        assert_eq!(tree.children(tree.root()).len(), 2);
        assert_eq!(tree.path_of(2), "checkout-suite/inventory/restock");
        assert_eq!(
            tree.resources_of(1),
            vec![ExclusiveResource::read_write("inventory-db")]
        );
    }

    #[test]
    fn test_plan_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, SAMPLE_PLAN).expect("write plan");

        let plan = PlanFile::load(&path).expect("load plan");
        assert_eq!(plan.name, "checkout-suite");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scripted_plan_executes() {
        let plan = PlanFile::from_yaml(SAMPLE_PLAN).expect("plan parses");
        let summary = execute_all(
            plan.build_tree(),
            Arc::new(NullListener),
            CancelToken::new(),
            &ExecutionConfig::default().with_parallelism(2),
        )
        .await
        .expect("run succeeds");

        assert_eq!(summary.total, 5);
        assert!(summary.is_all_passed());
    }

    #[tokio::test]
    async fn test_fail_step_marks_node_failed() {
        let plan = PlanFile::from_yaml(
            r#"
name: failing
nodes:
  - name: broken
    run: { fail: "wired to fail" }
"#,
        )
        .expect("plan parses");

        let summary = execute_all(
            plan.build_tree(),
            Arc::new(NullListener),
            CancelToken::new(),
            &ExecutionConfig::default().with_parallelism(1),
        )
        .await
        .expect("run completes");

        let result = summary.result_for("failing/broken").expect("result");
        assert_eq!(result.status, NodeStatus::Failed);
        assert!(result
            .message
            .as_deref()
            .is_some_and(|m| m.contains("wired to fail")));
    }

    #[tokio::test]
    async fn test_command_step_failure_is_reported() {
        let step = StepSpec {
            command: Some("exit 3".to_string()),
            ..StepSpec::default()
        };
        let err = step.run("run", "node").await.expect_err("must fail");
        assert!(err.to_string().contains("exit"));

        let ok = StepSpec {
            command: Some("true".to_string()),
            ..StepSpec::default()
        };
        ok.run("run", "node").await.expect("true succeeds");
    }
}
