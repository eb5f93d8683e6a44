//! Node registry for the workflow host

use std::collections::HashMap;
use std::sync::Arc;

use castflow_browser::BrowserLauncher;
use serde_json::Value;

use crate::logger::NodeLogger;
use crate::node::{NodeSchema, UploaderNode, WorkflowNode};
use crate::pipeline::RunSettings;
use crate::platforms;
use crate::report::NodeResult;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("node not found: {0}")]
    NotFound(String),
}

/// Registry of executable workflow nodes, keyed by node id
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// One upload node per built-in platform, all sharing `launcher`.
    pub fn with_builtin(launcher: Arc<dyn BrowserLauncher>, settings: RunSettings) -> Self {
        let mut registry = Self::new();
        for platform in platforms::all() {
            registry.register(UploaderNode::new(
                platform,
                launcher.clone(),
                settings.clone(),
            ));
        }
        registry
    }

    pub fn register<N: WorkflowNode + 'static>(&mut self, node: N) {
        self.register_arc(Arc::new(node));
    }

    /// Register a node from Arc. A node with the same id is replaced.
    pub fn register_arc(&mut self, node: Arc<dyn WorkflowNode>) {
        let id = node.id().to_string();
        self.nodes.insert(id, node);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn WorkflowNode>> {
        self.nodes.get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in sorted order
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Schemas for all registered nodes, sorted by id
    pub fn schemas(&self) -> Vec<NodeSchema> {
        let mut schemas: Vec<NodeSchema> = self.nodes.values().map(|node| node.schema()).collect();
        schemas.sort_by(|a, b| a.id.cmp(&b.id));
        schemas
    }

    /// Execute a node by id
    pub async fn execute(
        &self,
        id: &str,
        inputs: &Value,
        logger: &dyn NodeLogger,
    ) -> Result<NodeResult, RegistryError> {
        let node = self
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(node.execute(inputs, logger).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::RecordingLogger;
    use crate::testing::{MockLauncher, MockPage};
    use serde_json::json;

    fn builtin() -> NodeRegistry {
        NodeRegistry::with_builtin(
            Arc::new(MockLauncher::new(MockPage::new())),
            RunSettings::instant(),
        )
    }

    #[test]
    fn test_registry_empty() {
        let registry = NodeRegistry::new();
        assert!(!registry.has("douyin"));
        assert!(registry.list().is_empty());
        assert!(registry.schemas().is_empty());
    }

    #[test]
    fn test_builtin_nodes_are_sorted() {
        let registry = builtin();
        assert_eq!(
            registry.list(),
            vec![
                "baijiahao",
                "bilibili",
                "douyin",
                "kuaishou",
                "weixin_channels",
                "xiaohongshu",
                "xiaohongshu_images",
                "youtube",
            ]
        );
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 8);
        assert_eq!(schemas[0].id, "baijiahao");
        assert!(schemas.iter().all(|schema| schema.outputs.len() == 2));
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let registry = builtin();
        let result = registry
            .execute("tiktok", &json!({}), &RecordingLogger::new())
            .await;
        assert!(matches!(result, Err(RegistryError::NotFound(id)) if id == "tiktok"));
    }

    #[tokio::test]
    async fn test_execute_reports_validation_failure() {
        let registry = builtin();
        let result = registry
            .execute("youtube", &json!({}), &RecordingLogger::new())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "invalid input `video_path`: is required");
    }
}
