//! The backend boundary the protocol server dispatches into.

use async_trait::async_trait;

use crate::args::*;
use crate::error::Result;
use crate::types::*;

/// Default page size for list operations when the caller gives no limit.
pub const DEFAULT_LIMIT: u32 = 25;

/// Remote issue-tracker operations.
///
/// Implementations hold no per-request state; one instance is shared by every
/// in-flight tool call.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait LinearService: Send + Sync {
    // Users and organization

    /// The user the API key belongs to
    async fn get_viewer(&self) -> Result<Viewer>;

    async fn get_organization(&self) -> Result<Organization>;

    async fn get_users(&self) -> Result<Vec<User>>;

    async fn get_labels(&self) -> Result<Vec<Label>>;

    // Teams

    async fn get_teams(&self) -> Result<Vec<Team>>;

    async fn get_workflow_states(&self, args: &GetWorkflowStatesArgs) -> Result<Vec<WorkflowState>>;

    // Projects

    async fn get_projects(&self) -> Result<Vec<Project>>;

    async fn create_project(&self, args: &CreateProjectArgs) -> Result<Project>;

    async fn update_project(&self, args: &UpdateProjectArgs) -> Result<Project>;

    async fn add_issue_to_project(&self, args: &AddIssueToProjectArgs) -> Result<IssueMutation>;

    async fn get_project_issues(&self, args: &GetProjectIssuesArgs) -> Result<Vec<Issue>>;

    // Issues

    /// Most recently created issues, newest first
    async fn get_issues(&self, args: &GetIssuesArgs) -> Result<Vec<Issue>>;

    /// Fetch one issue by UUID or identifier (e.g. `ENG-123`), comments included
    async fn get_issue_by_id(&self, args: &GetIssueByIdArgs) -> Result<IssueDetail>;

    async fn search_issues(&self, args: &SearchIssuesArgs) -> Result<Vec<Issue>>;

    async fn create_issue(&self, args: &CreateIssueArgs) -> Result<Issue>;

    async fn update_issue(&self, args: &UpdateIssueArgs) -> Result<Issue>;

    async fn create_comment(&self, args: &CreateCommentArgs) -> Result<Comment>;

    async fn get_comments(&self, args: &GetCommentsArgs) -> Result<Vec<Comment>>;

    async fn add_issue_label(&self, args: &IssueLabelArgs) -> Result<LabelChange>;

    async fn remove_issue_label(&self, args: &IssueLabelArgs) -> Result<LabelChange>;

    async fn assign_issue(&self, args: &AssignIssueArgs) -> Result<IssueMutation>;

    /// Subscribe the viewer to issue notifications
    async fn subscribe_to_issue(&self, args: &IssueIdArgs) -> Result<ActionResult>;

    async fn convert_issue_to_subtask(&self, args: &ConvertToSubtaskArgs) -> Result<IssueMutation>;

    async fn create_issue_relation(&self, args: &CreateRelationArgs) -> Result<RelationResult>;

    async fn archive_issue(&self, args: &IssueIdArgs) -> Result<ActionResult>;

    async fn set_issue_priority(&self, args: &SetPriorityArgs) -> Result<IssueMutation>;

    async fn transfer_issue(&self, args: &TransferIssueArgs) -> Result<IssueMutation>;

    /// Copy an issue within its team
    async fn duplicate_issue(&self, args: &IssueIdArgs) -> Result<DuplicateResult>;

    async fn get_issue_history(&self, args: &GetIssueHistoryArgs) -> Result<IssueHistory>;

    // Cycles

    async fn get_cycles(&self, args: &GetCyclesArgs) -> Result<Vec<Cycle>>;

    /// Fails with `NotFound` when the team has no running cycle
    async fn get_active_cycle(&self, args: &TeamIdArgs) -> Result<ActiveCycle>;

    async fn add_issue_to_cycle(&self, args: &AddIssueToCycleArgs) -> Result<IssueMutation>;
}
