use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::skills::NewSkill;
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{object_schema, open_store, to_json};

pub struct AddSkillTool {
    stores: Arc<AgentStores>,
}

impl AddSkillTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct AddArgs {
    category: String,
    name: String,
    description: String,
    full_doc: Option<String>,
}

#[async_trait]
impl Tool for AddSkillTool {
    fn name(&self) -> &str {
        "add_skill"
    }

    fn description(&self) -> &str {
        "Register a skill under a category. The full documentation is only \
         returned by load_skill, never in the catalog."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "category": {"type": "string"},
                "name": {"type": "string"},
                "description": {"type": "string", "description": "One-line summary"},
                "full_doc": {"type": "string", "description": "Complete instructions"}
            }),
            &["category", "name", "description"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: AddArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.skills().add(NewSkill {
            category: &args.category,
            name: &args.name,
            description: &args.description,
            full_doc: args.full_doc.as_deref(),
        })?;
        Ok(json!({ "skill_id": row.id }))
    }
}

pub struct GetSkillCatalogTool {
    stores: Arc<AgentStores>,
}

impl GetSkillCatalogTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl Tool for GetSkillCatalogTool {
    fn name(&self) -> &str {
        "get_skill_catalog"
    }

    fn description(&self) -> &str {
        "List skill names and descriptions grouped by category"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let catalog = open_store(&self.stores, ctx)?.skills().catalog()?;
        to_json(&catalog)
    }
}

pub struct LoadSkillTool {
    stores: Arc<AgentStores>,
}

impl LoadSkillTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct LoadArgs {
    skill_id: i64,
}

#[async_trait]
impl Tool for LoadSkillTool {
    fn name(&self) -> &str {
        "load_skill"
    }

    fn description(&self) -> &str {
        "Load a skill including its full documentation"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({ "skill_id": {"type": "integer"} }), &["skill_id"])
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: LoadArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.skills().get(args.skill_id)?;
        to_json(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ctx, stores};

    #[tokio::test]
    async fn catalog_hides_doc_until_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let add = AddSkillTool::new(stores.clone());
        let catalog = GetSkillCatalogTool::new(stores.clone());
        let load = LoadSkillTool::new(stores);

        let added = add
            .execute(
                json!({
                    "category": "coding",
                    "name": "rust",
                    "description": "systems language",
                    "full_doc": "Borrow checker manual"
                }),
                &ctx("s"),
            )
            .await
            .unwrap();

        let listed = catalog.execute(json!({}), &ctx("s")).await.unwrap();
        assert_eq!(listed["coding"][0]["name"], "rust");
        assert!(!listed.to_string().contains("Borrow checker"));

        let full = load
            .execute(json!({"skill_id": added["skill_id"]}), &ctx("s"))
            .await
            .unwrap();
        assert_eq!(full["full_doc"], "Borrow checker manual");
    }

    #[tokio::test]
    async fn load_missing_skill_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let load = LoadSkillTool::new(stores(&dir));
        let err = load.execute(json!({"skill_id": 1}), &ctx("s")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
