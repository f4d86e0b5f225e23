//! GraphQL documents sent to Linear.
//!
//! Documents reference the shared fragments by name; [`document`] appends the
//! fragment definitions each one uses before it goes on the wire.

pub const ISSUE_FIELDS: &str = r#"
fragment IssueFields on Issue {
  id identifier title description priority url createdAt updatedAt completedAt
  state { name }
  team { id name key }
  assignee { id name }
  project { id name }
  cycle { id number name }
  parent { id identifier title }
}"#;

pub const CYCLE_FIELDS: &str = r#"
fragment CycleFields on Cycle {
  id number name description startsAt endsAt completedAt progress
  team { id name key }
}"#;

pub const COMMENT_FIELDS: &str = r#"
fragment CommentFields on Comment {
  id body createdAt url
  user { id name }
}"#;

pub const PROJECT_FIELDS: &str = r#"
fragment ProjectFields on Project {
  id name description state url
  teams { nodes { id name } }
}"#;

/// Append the fragment definitions a query spreads.
pub fn document(query: &str) -> String {
    let mut doc = query.to_string();
    for (name, fragment) in [
        ("...IssueFields", ISSUE_FIELDS),
        ("...CycleFields", CYCLE_FIELDS),
        ("...CommentFields", COMMENT_FIELDS),
        ("...ProjectFields", PROJECT_FIELDS),
    ] {
        if query.contains(name) {
            doc.push_str(fragment);
        }
    }
    doc
}

// =============================================================================
// Users and organization
// =============================================================================

pub const VIEWER: &str = r#"
query Viewer {
  viewer { id name email displayName active organization { id name } }
}"#;

pub const ORGANIZATION: &str = r#"
query Organization {
  organization { id name urlKey logoUrl createdAt }
}"#;

pub const USERS: &str = r#"
query Users {
  users { nodes { id name email displayName active } }
}"#;

pub const LABELS: &str = r#"
query Labels {
  issueLabels { nodes { id name color description team { id name } } }
}"#;

// =============================================================================
// Teams
// =============================================================================

pub const TEAMS: &str = r#"
query Teams {
  teams { nodes { id name key description states { nodes { id name } } } }
}"#;

pub const WORKFLOW_STATES: &str = r#"
query WorkflowStates($teamId: ID!, $includeArchived: Boolean) {
  workflowStates(filter: { team: { id: { eq: $teamId } } }, includeArchived: $includeArchived) {
    nodes { id name type color position team { id name } }
  }
}"#;

// =============================================================================
// Projects
// =============================================================================

pub const PROJECTS: &str = r#"
query Projects {
  projects { nodes { ...ProjectFields } }
}"#;

pub const PROJECT_CREATE: &str = r#"
mutation ProjectCreate($input: ProjectCreateInput!) {
  projectCreate(input: $input) { success project { ...ProjectFields } }
}"#;

pub const PROJECT_UPDATE: &str = r#"
mutation ProjectUpdate($id: String!, $input: ProjectUpdateInput!) {
  projectUpdate(id: $id, input: $input) { success project { ...ProjectFields } }
}"#;

pub const PROJECT_ISSUES: &str = r#"
query ProjectIssues($id: String!, $first: Int) {
  project(id: $id) { issues(first: $first) { nodes { ...IssueFields } } }
}"#;

// =============================================================================
// Issues
// =============================================================================

pub const ISSUES: &str = r#"
query Issues($first: Int, $filter: IssueFilter) {
  issues(first: $first, filter: $filter, orderBy: createdAt) { nodes { ...IssueFields } }
}"#;

pub const ISSUE: &str = r#"
query Issue($id: String!) {
  issue(id: $id) { ...IssueFields comments { nodes { ...CommentFields } } }
}"#;

pub const ISSUE_COMMENTS: &str = r#"
query IssueComments($id: String!, $first: Int) {
  issue(id: $id) { comments(first: $first) { nodes { ...CommentFields } } }
}"#;

pub const ISSUE_HISTORY: &str = r#"
query IssueHistory($id: String!, $first: Int) {
  issue(id: $id) {
    id identifier
    history(first: $first) {
      nodes {
        id createdAt
        actor { id name }
        fromState { name } toState { name }
        fromAssignee { id name } toAssignee { id name }
        fromPriority toPriority
        fromTitle toTitle
        fromTeam { id name } toTeam { id name }
        fromProject { id name } toProject { id name }
      }
    }
  }
}"#;

pub const ISSUE_CREATE: &str = r#"
mutation IssueCreate($input: IssueCreateInput!) {
  issueCreate(input: $input) { success issue { ...IssueFields } }
}"#;

pub const ISSUE_UPDATE: &str = r#"
mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
  issueUpdate(id: $id, input: $input) { success issue { ...IssueFields } }
}"#;

pub const COMMENT_CREATE: &str = r#"
mutation CommentCreate($input: CommentCreateInput!) {
  commentCreate(input: $input) { success comment { ...CommentFields } }
}"#;

pub const ISSUE_ADD_LABEL: &str = r#"
mutation IssueAddLabel($id: String!, $labelId: String!) {
  issueAddLabel(id: $id, labelId: $labelId) { success issue { ...IssueFields } }
}"#;

pub const ISSUE_REMOVE_LABEL: &str = r#"
mutation IssueRemoveLabel($id: String!, $labelId: String!) {
  issueRemoveLabel(id: $id, labelId: $labelId) { success issue { ...IssueFields } }
}"#;

pub const ISSUE_SUBSCRIBE: &str = r#"
mutation IssueSubscribe($id: String!) {
  issueSubscribe(id: $id) { success }
}"#;

pub const ISSUE_ARCHIVE: &str = r#"
mutation IssueArchive($id: String!) {
  issueArchive(id: $id) { success }
}"#;

pub const ISSUE_RELATION_CREATE: &str = r#"
mutation IssueRelationCreate($input: IssueRelationCreateInput!) {
  issueRelationCreate(input: $input) {
    success
    issueRelation { id issue { id identifier title } relatedIssue { id identifier title } }
  }
}"#;

// =============================================================================
// Cycles
// =============================================================================

pub const CYCLES: &str = r#"
query Cycles($first: Int, $filter: CycleFilter) {
  cycles(first: $first, filter: $filter) { nodes { ...CycleFields } }
}"#;

pub const ACTIVE_CYCLE: &str = r#"
query ActiveCycle($teamId: String!) {
  team(id: $teamId) {
    activeCycle { ...CycleFields issues { nodes { completedAt } } }
  }
}"#;
