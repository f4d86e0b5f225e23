//! Tool handlers and the dispatch table.
//!
//! A handler is a plain function taking the shared service and the raw
//! argument payload. It narrows the payload into its typed record, calls one
//! [`LinearService`] operation and returns the result as JSON. Handlers never
//! build protocol envelopes; that is the server's job.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use linear_core::args::*;
use linear_core::LinearService;
use serde_json::Value;

use crate::error::ToolError;
use crate::protocol::ToolDefinition;
use crate::schema::{self, Field};

/// Future returned by a handler, borrowing the service for `'a`.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

/// Executable implementation of one tool.
pub type HandlerFn = for<'a> fn(&'a dyn LinearService, Value) -> HandlerFuture<'a>;

/// A tool: its advertised metadata, input shape and handler.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input: &'static [Field],
    /// Documented result shape
    pub output: fn() -> Value,
    pub handler: HandlerFn,
}

impl ToolSpec {
    /// Validate `args` against the input shape, then run the handler.
    pub async fn invoke(
        &self,
        service: &dyn LinearService,
        args: Value,
    ) -> Result<Value, ToolError> {
        schema::check(self.name, self.input, &args)?;
        (self.handler)(service, args).await
    }

    /// Wire form for `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: schema::input_schema(self.input),
            output_schema: None,
        }
    }

    /// Full descriptor, including the documented output shape.
    pub fn descriptor(&self) -> ToolDefinition {
        ToolDefinition {
            output_schema: Some((self.output)()),
            ..self.definition()
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("fields", &self.input.len())
            .finish()
    }
}

/// Name to handler lookup, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry. A spec whose name is already taken is dropped.
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        let mut tools = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());

        for spec in specs {
            if index.contains_key(spec.name) {
                tracing::error!(tool = spec.name, "Duplicate tool name, keeping the first");
                continue;
            }
            index.insert(spec.name, tools.len());
            tools.push(spec);
        }

        Self { tools, index }
    }

    /// Registry holding the full Linear catalog.
    pub fn builtin() -> Self {
        Self::new(crate::tools::catalog())
    }

    pub fn resolve(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Wire definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolSpec::definition).collect()
    }

    /// Definitions with output shapes, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolSpec::descriptor).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|t| t.name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Define a handler forwarding to one service method.
macro_rules! handler {
    ($name:ident => $method:ident) => {
        pub fn $name<'a>(service: &'a dyn LinearService, _args: Value) -> HandlerFuture<'a> {
            Box::pin(async move {
                let result = service.$method().await?;
                Ok(serde_json::to_value(result)?)
            })
        }
    };
    ($name:ident => $method:ident($args:ty)) => {
        pub fn $name<'a>(service: &'a dyn LinearService, args: Value) -> HandlerFuture<'a> {
            Box::pin(async move {
                let args: $args = serde_json::from_value(args)?;
                let result = service.$method(&args).await?;
                Ok(serde_json::to_value(result)?)
            })
        }
    };
}

// Users and organization
handler!(get_viewer => get_viewer);
handler!(get_organization => get_organization);
handler!(get_users => get_users);
handler!(get_labels => get_labels);

// Teams
handler!(get_teams => get_teams);
handler!(get_workflow_states => get_workflow_states(GetWorkflowStatesArgs));

// Projects
handler!(get_projects => get_projects);
handler!(create_project => create_project(CreateProjectArgs));
handler!(update_project => update_project(UpdateProjectArgs));
handler!(add_issue_to_project => add_issue_to_project(AddIssueToProjectArgs));
handler!(get_project_issues => get_project_issues(GetProjectIssuesArgs));

// Issues
handler!(get_issues => get_issues(GetIssuesArgs));
handler!(get_issue_by_id => get_issue_by_id(GetIssueByIdArgs));
handler!(search_issues => search_issues(SearchIssuesArgs));
handler!(create_issue => create_issue(CreateIssueArgs));
handler!(update_issue => update_issue(UpdateIssueArgs));
handler!(create_comment => create_comment(CreateCommentArgs));
handler!(get_comments => get_comments(GetCommentsArgs));
handler!(add_issue_label => add_issue_label(IssueLabelArgs));
handler!(remove_issue_label => remove_issue_label(IssueLabelArgs));
handler!(assign_issue => assign_issue(AssignIssueArgs));
handler!(subscribe_to_issue => subscribe_to_issue(IssueIdArgs));
handler!(convert_issue_to_subtask => convert_issue_to_subtask(ConvertToSubtaskArgs));
handler!(create_issue_relation => create_issue_relation(CreateRelationArgs));
handler!(archive_issue => archive_issue(IssueIdArgs));
handler!(set_issue_priority => set_issue_priority(SetPriorityArgs));
handler!(transfer_issue => transfer_issue(TransferIssueArgs));
handler!(duplicate_issue => duplicate_issue(IssueIdArgs));
handler!(get_issue_history => get_issue_history(GetIssueHistoryArgs));

// Cycles
handler!(get_cycles => get_cycles(GetCyclesArgs));
handler!(get_active_cycle => get_active_cycle(TeamIdArgs));
handler!(add_issue_to_cycle => add_issue_to_cycle(AddIssueToCycleArgs));
