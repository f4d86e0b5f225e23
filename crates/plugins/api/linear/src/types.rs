//! Linear GraphQL response types.
//!
//! These types mirror the selections made in `queries.rs`. They are
//! deserialized from the `data` object and then mapped to unified types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Request body posted to the GraphQL endpoint.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

/// Response envelope; `data` and `errors` may both be present.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Relay-style connection; only `nodes` is selected.
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

// =============================================================================
// Shared selections
// =============================================================================

/// Any `{ id name }` selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearNamed {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearStateName {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearTeamRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearCycleRef {
    pub id: String,
    pub number: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearIssueRef {
    pub id: String,
    pub identifier: String,
    pub title: String,
}

// =============================================================================
// Users and organization
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearViewer {
    #[serde(flatten)]
    pub user: LinearUser,
    #[serde(default)]
    pub organization: Option<LinearNamed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearOrganization {
    pub id: String,
    pub name: String,
    pub url_key: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearLabel {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub team: Option<LinearNamed>,
}

// =============================================================================
// Teams and workflow states
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LinearTeam {
    pub id: String,
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub states: Connection<LinearNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearWorkflowState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub position: f64,
    #[serde(default)]
    pub team: Option<LinearNamed>,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LinearProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub teams: Connection<LinearNamed>,
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearIssue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<f64>,
    pub url: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub state: Option<LinearStateName>,
    #[serde(default)]
    pub team: Option<LinearTeamRef>,
    #[serde(default)]
    pub assignee: Option<LinearNamed>,
    #[serde(default)]
    pub project: Option<LinearNamed>,
    #[serde(default)]
    pub cycle: Option<LinearCycleRef>,
    #[serde(default)]
    pub parent: Option<LinearIssueRef>,
}

/// `issue(id:)` with its comment thread.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearIssueWithComments {
    #[serde(flatten)]
    pub issue: LinearIssue,
    #[serde(default)]
    pub comments: Connection<LinearComment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearComment {
    pub id: String,
    pub body: String,
    pub created_at: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<LinearNamed>,
}

/// `issue(id:) { comments }` selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearIssueComments {
    #[serde(default)]
    pub comments: Connection<LinearComment>,
}

/// `project(id:) { issues }` selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearProjectIssues {
    #[serde(default)]
    pub issues: Connection<LinearIssue>,
}

/// One entry of `issue.history`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearHistory {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub actor: Option<LinearNamed>,
    #[serde(default)]
    pub from_state: Option<LinearStateName>,
    #[serde(default)]
    pub to_state: Option<LinearStateName>,
    #[serde(default)]
    pub from_assignee: Option<LinearNamed>,
    #[serde(default)]
    pub to_assignee: Option<LinearNamed>,
    #[serde(default)]
    pub from_priority: Option<f64>,
    #[serde(default)]
    pub to_priority: Option<f64>,
    #[serde(default)]
    pub from_title: Option<String>,
    #[serde(default)]
    pub to_title: Option<String>,
    #[serde(default)]
    pub from_team: Option<LinearNamed>,
    #[serde(default)]
    pub to_team: Option<LinearNamed>,
    #[serde(default)]
    pub from_project: Option<LinearNamed>,
    #[serde(default)]
    pub to_project: Option<LinearNamed>,
}

/// `issue(id:) { history }` selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearIssueHistory {
    pub id: String,
    pub identifier: String,
    #[serde(default)]
    pub history: Connection<LinearHistory>,
}

// =============================================================================
// Cycles
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearCycle {
    pub id: String,
    pub number: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub team: Option<LinearTeamRef>,
}

/// Active cycle plus the completion state of each of its issues.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearActiveCycle {
    #[serde(flatten)]
    pub cycle: LinearCycle,
    #[serde(default)]
    pub issues: Connection<LinearCompletion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearCompletion {
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// `team(id:) { activeCycle }` selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearTeamActiveCycle {
    #[serde(default)]
    pub active_cycle: Option<LinearActiveCycle>,
}

// =============================================================================
// Mutation payloads
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    pub success: bool,
    #[serde(default)]
    pub issue: Option<LinearIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    pub success: bool,
    #[serde(default)]
    pub comment: Option<LinearComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPayload {
    pub success: bool,
    #[serde(default)]
    pub project: Option<LinearProject>,
}

/// Payload of mutations where only `success` is selected.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessPayload {
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationPayload {
    pub success: bool,
    #[serde(default)]
    pub issue_relation: Option<LinearRelation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearRelation {
    pub id: String,
    pub issue: LinearIssueRef,
    pub related_issue: LinearIssueRef,
}
