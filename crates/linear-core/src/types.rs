//! Result records returned by backend operations.
//!
//! Field names serialize in camelCase, which is what tool clients see in the
//! pretty-printed result text.

use serde::{Deserialize, Serialize};

/// A `{id, name}` pointer to a related entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

/// A team pointer that also carries the team key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A short issue pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRef {
    pub id: String,
    pub identifier: String,
    pub title: String,
}

/// A short cycle pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRef {
    pub id: String,
    pub number: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub active: bool,
}

/// The authenticated user and the organization the key belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub organization: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub url_key: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub team: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub states: Vec<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    /// backlog, unstarted, started, completed or canceled
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub position: f64,
    #[serde(default)]
    pub team: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub teams: Vec<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow state name
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub assignee: Option<EntityRef>,
    #[serde(default)]
    pub project: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<CycleRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueRef>,
    pub url: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Issue {
    pub fn summary(&self) -> IssueRef {
        IssueRef {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            title: self.title.clone(),
        }
    }
}

/// An issue together with its comment thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub created_at: String,
    #[serde(default)]
    pub user: Option<EntityRef>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
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
    pub team: Option<TeamRef>,
}

/// A team's current cycle with completion figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCycle {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub progress: f64,
    pub issue_count: usize,
    pub completed_issue_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub actor: Option<EntityRef>,
    /// What changed: state, assignee, priority, title, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueHistory {
    pub issue_id: String,
    pub identifier: String,
    pub history: Vec<HistoryEntry>,
}

// =============================================================================
// Mutation results
// =============================================================================

/// Outcome of a mutation that returns the updated issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueMutation {
    pub success: bool,
    pub issue: Issue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelChange {
    pub success: bool,
    pub issue_id: String,
    pub label_id: String,
}

/// Outcome of a mutation that has nothing to return but a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRelation {
    pub id: String,
    /// The relation as the caller asked for it, e.g. `blocked_by`
    #[serde(rename = "type")]
    pub kind: String,
    pub issue_identifier: String,
    pub related_issue_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationResult {
    pub success: bool,
    pub relation: IssueRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResult {
    pub success: bool,
    pub original_issue: IssueRef,
    pub duplicated_issue: Issue,
}
