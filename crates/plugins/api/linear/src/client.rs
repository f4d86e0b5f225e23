//! Linear GraphQL client implementation.

use async_trait::async_trait;
use linear_core::service::DEFAULT_LIMIT;
use linear_core::*;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::queries::{self, document};
use crate::types::*;
use crate::DEFAULT_LINEAR_URL;

/// Linear API client.
pub struct LinearClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

impl LinearClient {
    /// Create a new Linear client against the public endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_LINEAR_URL, token)
    }

    /// Create a new Linear client with a custom endpoint URL (for testing).
    pub fn with_base_url(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("linear-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into(),
            token: token.into(),
            client,
        })
    }

    /// Post a GraphQL document and return its `data` object.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let doc = document(query);
        let body = GraphQlRequest {
            query: &doc,
            variables,
        };

        debug!(url = %self.api_url, "Linear GraphQL request");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let envelope = self.handle_response(response).await?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(message = %message, "Linear GraphQL errors");
            return Err(Error::GraphQl(message));
        }

        envelope
            .data
            .ok_or_else(|| Error::InvalidData("GraphQL response carried no data".to_string()))
    }

    /// Handle response and map errors.
    async fn handle_response(&self, response: reqwest::Response) -> Result<GraphQlResponse> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Linear API error response"
            );
            // Validation failures come back as 400 with a GraphQL error body.
            if let Ok(GraphQlResponse {
                errors: Some(errors),
                ..
            }) = serde_json::from_str::<GraphQlResponse>(&message)
            {
                if status_code == 400 && !errors.is_empty() {
                    let joined = errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(Error::GraphQl(joined));
                }
            }
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Run a query and decode its single root field; `null` becomes `None`.
    async fn query_optional<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        root: &str,
    ) -> Result<Option<T>> {
        let mut data = self.execute(query, variables).await?;
        match data.get_mut(root).map(Value::take) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                Error::InvalidData(format!("Failed to decode {}: {}", root, e))
            }),
        }
    }

    /// Run a query and decode its single root field.
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value, root: &str) -> Result<T> {
        self.query_optional(query, variables, root)
            .await?
            .ok_or_else(|| Error::NotFound(root.to_string()))
    }

    async fn fetch_issue(&self, id: &str) -> Result<LinearIssueWithComments> {
        self.query_optional(queries::ISSUE, json!({ "id": id }), "issue")
            .await?
            .ok_or_else(|| Error::NotFound(format!("Issue {}", id)))
    }

    /// Send `issueUpdate` with every field of `update` except `id`.
    async fn update_issue_fields(&self, update: &UpdateIssueArgs, action: &str) -> Result<LinearIssue> {
        let mut input = serde_json::to_value(update)?;
        if let Some(map) = input.as_object_mut() {
            map.remove("id");
        }

        let payload: IssuePayload = self
            .query(
                queries::ISSUE_UPDATE,
                json!({ "id": update.id, "input": input }),
                "issueUpdate",
            )
            .await?;
        mutated_issue(payload, action)
    }

    async fn issue_mutation(&self, update: UpdateIssueArgs, action: &str) -> Result<IssueMutation> {
        let issue = self.update_issue_fields(&update, action).await?;
        Ok(IssueMutation {
            success: true,
            issue: map_issue(issue),
        })
    }

    async fn change_label(&self, query: &str, root: &str, args: &IssueLabelArgs) -> Result<LabelChange> {
        let payload: IssuePayload = self
            .query(
                query,
                json!({ "id": args.issue_id, "labelId": args.label_id }),
                root,
            )
            .await?;

        if !payload.success {
            return Err(Error::InvalidData(format!(
                "Failed to change label {} on issue {}",
                args.label_id, args.issue_id
            )));
        }

        Ok(LabelChange {
            success: true,
            issue_id: payload.issue.map(|i| i.id).unwrap_or_else(|| args.issue_id.clone()),
            label_id: args.label_id.clone(),
        })
    }
}

// =============================================================================
// Mapping functions: Linear types -> Unified types
// =============================================================================

fn map_named(named: LinearNamed) -> EntityRef {
    EntityRef {
        id: named.id,
        name: named.name,
    }
}

fn map_team_ref(team: LinearTeamRef) -> TeamRef {
    TeamRef {
        id: team.id,
        name: team.name,
        key: team.key,
    }
}

fn map_user(user: LinearUser) -> User {
    User {
        id: user.id,
        name: user.name,
        email: user.email,
        display_name: user.display_name,
        active: user.active,
    }
}

fn map_issue(issue: LinearIssue) -> Issue {
    Issue {
        id: issue.id,
        identifier: issue.identifier,
        title: issue.title,
        description: issue.description,
        state: issue.state.map(|s| s.name),
        priority: issue.priority,
        team: issue.team.map(map_team_ref),
        assignee: issue.assignee.map(map_named),
        project: issue.project.map(map_named),
        cycle: issue.cycle.map(|c| CycleRef {
            id: c.id,
            number: c.number,
            name: c.name,
        }),
        parent: issue.parent.map(map_issue_ref),
        url: issue.url,
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    }
}

fn map_issue_ref(issue: LinearIssueRef) -> IssueRef {
    IssueRef {
        id: issue.id,
        identifier: issue.identifier,
        title: issue.title,
    }
}

fn map_comment(comment: LinearComment) -> Comment {
    Comment {
        id: comment.id,
        body: comment.body,
        created_at: comment.created_at,
        user: comment.user.map(map_named),
        url: comment.url,
    }
}

fn map_project(project: LinearProject) -> Project {
    Project {
        id: project.id,
        name: project.name,
        description: project.description,
        state: project.state,
        url: project.url,
        teams: project.teams.nodes.into_iter().map(map_named).collect(),
    }
}

fn map_cycle(cycle: LinearCycle) -> Cycle {
    Cycle {
        id: cycle.id,
        number: cycle.number,
        name: cycle.name,
        description: cycle.description,
        starts_at: cycle.starts_at,
        ends_at: cycle.ends_at,
        completed_at: cycle.completed_at,
        team: cycle.team.map(map_team_ref),
    }
}

fn map_active_cycle(active: LinearActiveCycle) -> ActiveCycle {
    let issue_count = active.issues.nodes.len();
    let completed_issue_count = active
        .issues
        .nodes
        .iter()
        .filter(|i| i.completed_at.is_some())
        .count();
    let progress = active.cycle.progress.unwrap_or(if issue_count == 0 {
        0.0
    } else {
        completed_issue_count as f64 / issue_count as f64
    });

    ActiveCycle {
        cycle: map_cycle(active.cycle),
        progress,
        issue_count,
        completed_issue_count,
    }
}

/// Classify a history entry by the first field pair it carries.
fn map_history(entry: LinearHistory) -> HistoryEntry {
    let name = |n: Option<LinearNamed>| n.map(|n| n.name);

    let (kind, from, to) = if entry.from_state.is_some() || entry.to_state.is_some() {
        (
            "state",
            entry.from_state.map(|s| s.name),
            entry.to_state.map(|s| s.name),
        )
    } else if entry.from_assignee.is_some() || entry.to_assignee.is_some() {
        ("assignee", name(entry.from_assignee), name(entry.to_assignee))
    } else if entry.from_priority.is_some() || entry.to_priority.is_some() {
        (
            "priority",
            entry.from_priority.map(|p| p.to_string()),
            entry.to_priority.map(|p| p.to_string()),
        )
    } else if entry.from_title.is_some() || entry.to_title.is_some() {
        ("title", entry.from_title, entry.to_title)
    } else if entry.from_team.is_some() || entry.to_team.is_some() {
        ("team", name(entry.from_team), name(entry.to_team))
    } else if entry.from_project.is_some() || entry.to_project.is_some() {
        ("project", name(entry.from_project), name(entry.to_project))
    } else {
        ("update", None, None)
    };

    HistoryEntry {
        id: entry.id,
        created_at: entry.created_at,
        actor: entry.actor.map(map_named),
        kind: kind.to_string(),
        from,
        to,
    }
}

fn mutated_issue(payload: IssuePayload, action: &str) -> Result<LinearIssue> {
    match payload {
        IssuePayload {
            success: true,
            issue: Some(issue),
        } => Ok(issue),
        _ => Err(Error::InvalidData(format!("Failed to {}", action))),
    }
}

fn ensure_success(payload: SuccessPayload, action: &str) -> Result<()> {
    if payload.success {
        Ok(())
    } else {
        Err(Error::InvalidData(format!("Failed to {}", action)))
    }
}

/// Build an `IssueFilter` from search arguments; empty values are ignored.
fn issue_filter(args: &SearchIssuesArgs) -> Value {
    let mut filter = Map::new();
    let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());

    if let Some(team_id) = non_empty(&args.team_id) {
        filter.insert("team".into(), json!({ "id": { "eq": team_id } }));
    }
    if let Some(assignee_id) = non_empty(&args.assignee_id) {
        filter.insert("assignee".into(), json!({ "id": { "eq": assignee_id } }));
    }
    if let Some(project_id) = non_empty(&args.project_id) {
        filter.insert("project".into(), json!({ "id": { "eq": project_id } }));
    }
    if let Some(states) = args.states.as_ref().filter(|s| !s.is_empty()) {
        filter.insert("state".into(), json!({ "name": { "in": states } }));
    }
    if let Some(query) = non_empty(&args.query) {
        filter.insert(
            "or".into(),
            json!([
                { "title": { "containsIgnoreCase": query } },
                { "description": { "containsIgnoreCase": query } }
            ]),
        );
    }

    Value::Object(filter)
}

// =============================================================================
// LinearService implementation
// =============================================================================

#[async_trait]
impl LinearService for LinearClient {
    async fn get_viewer(&self) -> Result<Viewer> {
        let viewer: LinearViewer = self.query(queries::VIEWER, json!({}), "viewer").await?;
        Ok(Viewer {
            user: map_user(viewer.user),
            organization: viewer.organization.map(map_named),
        })
    }

    async fn get_organization(&self) -> Result<Organization> {
        let org: LinearOrganization = self
            .query(queries::ORGANIZATION, json!({}), "organization")
            .await?;
        Ok(Organization {
            id: org.id,
            name: org.name,
            url_key: org.url_key,
            logo_url: org.logo_url,
            created_at: org.created_at,
        })
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        let users: Connection<LinearUser> = self.query(queries::USERS, json!({}), "users").await?;
        Ok(users.nodes.into_iter().map(map_user).collect())
    }

    async fn get_labels(&self) -> Result<Vec<Label>> {
        let labels: Connection<LinearLabel> =
            self.query(queries::LABELS, json!({}), "issueLabels").await?;
        Ok(labels
            .nodes
            .into_iter()
            .map(|l| Label {
                id: l.id,
                name: l.name,
                color: l.color,
                description: l.description,
                team: l.team.map(map_named),
            })
            .collect())
    }

    async fn get_teams(&self) -> Result<Vec<Team>> {
        let teams: Connection<LinearTeam> = self.query(queries::TEAMS, json!({}), "teams").await?;
        Ok(teams
            .nodes
            .into_iter()
            .map(|t| Team {
                id: t.id,
                name: t.name,
                key: t.key,
                description: t.description,
                states: t.states.nodes.into_iter().map(map_named).collect(),
            })
            .collect())
    }

    async fn get_workflow_states(&self, args: &GetWorkflowStatesArgs) -> Result<Vec<WorkflowState>> {
        let states: Connection<LinearWorkflowState> = self
            .query(
                queries::WORKFLOW_STATES,
                json!({
                    "teamId": args.team_id,
                    "includeArchived": args.include_archived.unwrap_or(false),
                }),
                "workflowStates",
            )
            .await?;

        let mut states: Vec<WorkflowState> = states
            .nodes
            .into_iter()
            .map(|s| WorkflowState {
                id: s.id,
                name: s.name,
                kind: s.kind,
                color: s.color,
                position: s.position,
                team: s.team.map(map_named),
            })
            .collect();
        states.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(states)
    }

    async fn get_projects(&self) -> Result<Vec<Project>> {
        let projects: Connection<LinearProject> =
            self.query(queries::PROJECTS, json!({}), "projects").await?;
        Ok(projects.nodes.into_iter().map(map_project).collect())
    }

    async fn create_project(&self, args: &CreateProjectArgs) -> Result<Project> {
        let payload: ProjectPayload = self
            .query(
                queries::PROJECT_CREATE,
                json!({ "input": args }),
                "projectCreate",
            )
            .await?;

        match payload {
            ProjectPayload {
                success: true,
                project: Some(project),
            } => Ok(map_project(project)),
            _ => Err(Error::InvalidData("Failed to create project".to_string())),
        }
    }

    async fn update_project(&self, args: &UpdateProjectArgs) -> Result<Project> {
        let mut input = serde_json::to_value(args)?;
        if let Some(map) = input.as_object_mut() {
            map.remove("id");
        }

        let payload: ProjectPayload = self
            .query(
                queries::PROJECT_UPDATE,
                json!({ "id": args.id, "input": input }),
                "projectUpdate",
            )
            .await?;

        match payload {
            ProjectPayload {
                success: true,
                project: Some(project),
            } => Ok(map_project(project)),
            _ => Err(Error::InvalidData(format!(
                "Failed to update project {}",
                args.id
            ))),
        }
    }

    async fn add_issue_to_project(&self, args: &AddIssueToProjectArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.project_id = Some(args.project_id.clone());
        self.issue_mutation(update, "add issue to project").await
    }

    async fn get_project_issues(&self, args: &GetProjectIssuesArgs) -> Result<Vec<Issue>> {
        let project: Option<LinearProjectIssues> = self
            .query_optional(
                queries::PROJECT_ISSUES,
                json!({
                    "id": args.project_id,
                    "first": args.limit.unwrap_or(DEFAULT_LIMIT),
                }),
                "project",
            )
            .await?;

        let project =
            project.ok_or_else(|| Error::NotFound(format!("Project {}", args.project_id)))?;
        Ok(project.issues.nodes.into_iter().map(map_issue).collect())
    }

    async fn get_issues(&self, args: &GetIssuesArgs) -> Result<Vec<Issue>> {
        let issues: Connection<LinearIssue> = self
            .query(
                queries::ISSUES,
                json!({ "first": args.limit.unwrap_or(DEFAULT_LIMIT) }),
                "issues",
            )
            .await?;
        Ok(issues.nodes.into_iter().map(map_issue).collect())
    }

    async fn get_issue_by_id(&self, args: &GetIssueByIdArgs) -> Result<IssueDetail> {
        let issue = self.fetch_issue(&args.id).await?;
        Ok(IssueDetail {
            issue: map_issue(issue.issue),
            comments: issue.comments.nodes.into_iter().map(map_comment).collect(),
        })
    }

    async fn search_issues(&self, args: &SearchIssuesArgs) -> Result<Vec<Issue>> {
        let issues: Connection<LinearIssue> = self
            .query(
                queries::ISSUES,
                json!({
                    "first": args.limit.unwrap_or(DEFAULT_LIMIT),
                    "filter": issue_filter(args),
                }),
                "issues",
            )
            .await?;
        Ok(issues.nodes.into_iter().map(map_issue).collect())
    }

    async fn create_issue(&self, args: &CreateIssueArgs) -> Result<Issue> {
        let payload: IssuePayload = self
            .query(queries::ISSUE_CREATE, json!({ "input": args }), "issueCreate")
            .await?;
        mutated_issue(payload, "create issue").map(map_issue)
    }

    async fn update_issue(&self, args: &UpdateIssueArgs) -> Result<Issue> {
        self.update_issue_fields(args, "update issue")
            .await
            .map(map_issue)
    }

    async fn create_comment(&self, args: &CreateCommentArgs) -> Result<Comment> {
        let payload: CommentPayload = self
            .query(
                queries::COMMENT_CREATE,
                json!({ "input": args }),
                "commentCreate",
            )
            .await?;

        match payload {
            CommentPayload {
                success: true,
                comment: Some(comment),
            } => Ok(map_comment(comment)),
            _ => Err(Error::InvalidData("Failed to create comment".to_string())),
        }
    }

    async fn get_comments(&self, args: &GetCommentsArgs) -> Result<Vec<Comment>> {
        let issue: LinearIssueComments = self
            .query_optional(
                queries::ISSUE_COMMENTS,
                json!({
                    "id": args.issue_id,
                    "first": args.limit.unwrap_or(DEFAULT_LIMIT),
                }),
                "issue",
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Issue {}", args.issue_id)))?;
        Ok(issue.comments.nodes.into_iter().map(map_comment).collect())
    }

    async fn add_issue_label(&self, args: &IssueLabelArgs) -> Result<LabelChange> {
        self.change_label(queries::ISSUE_ADD_LABEL, "issueAddLabel", args)
            .await
    }

    async fn remove_issue_label(&self, args: &IssueLabelArgs) -> Result<LabelChange> {
        self.change_label(queries::ISSUE_REMOVE_LABEL, "issueRemoveLabel", args)
            .await
    }

    async fn assign_issue(&self, args: &AssignIssueArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.assignee_id = Some(args.assignee_id.clone());
        self.issue_mutation(update, "assign issue").await
    }

    async fn subscribe_to_issue(&self, args: &IssueIdArgs) -> Result<ActionResult> {
        let payload: SuccessPayload = self
            .query(
                queries::ISSUE_SUBSCRIBE,
                json!({ "id": args.issue_id }),
                "issueSubscribe",
            )
            .await?;
        ensure_success(payload, "subscribe to issue")?;

        Ok(ActionResult {
            success: true,
            message: format!("Subscribed to issue {}", args.issue_id),
        })
    }

    async fn convert_issue_to_subtask(&self, args: &ConvertToSubtaskArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.parent_id = Some(args.parent_issue_id.clone());
        self.issue_mutation(update, "convert issue to subtask").await
    }

    async fn create_issue_relation(&self, args: &CreateRelationArgs) -> Result<RelationResult> {
        let (remote_type, swap) = args.kind.remote();
        let (issue_id, related_issue_id) = if swap {
            (&args.related_issue_id, &args.issue_id)
        } else {
            (&args.issue_id, &args.related_issue_id)
        };

        let payload: RelationPayload = self
            .query(
                queries::ISSUE_RELATION_CREATE,
                json!({
                    "input": {
                        "issueId": issue_id,
                        "relatedIssueId": related_issue_id,
                        "type": remote_type,
                    }
                }),
                "issueRelationCreate",
            )
            .await?;

        let relation = match payload {
            RelationPayload {
                success: true,
                issue_relation: Some(relation),
            } => relation,
            _ => {
                return Err(Error::InvalidData(
                    "Failed to create issue relation".to_string(),
                ))
            }
        };

        // Report from the caller's point of view even when the pair was swapped.
        let (issue, related) = if swap {
            (relation.related_issue, relation.issue)
        } else {
            (relation.issue, relation.related_issue)
        };

        Ok(RelationResult {
            success: true,
            relation: IssueRelation {
                id: relation.id,
                kind: args.kind.as_str().to_string(),
                issue_identifier: issue.identifier,
                related_issue_identifier: related.identifier,
            },
        })
    }

    async fn archive_issue(&self, args: &IssueIdArgs) -> Result<ActionResult> {
        let payload: SuccessPayload = self
            .query(
                queries::ISSUE_ARCHIVE,
                json!({ "id": args.issue_id }),
                "issueArchive",
            )
            .await?;
        ensure_success(payload, "archive issue")?;

        Ok(ActionResult {
            success: true,
            message: format!("Issue {} has been archived", args.issue_id),
        })
    }

    async fn set_issue_priority(&self, args: &SetPriorityArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.priority = Some(args.priority);
        self.issue_mutation(update, "set issue priority").await
    }

    async fn transfer_issue(&self, args: &TransferIssueArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.team_id = Some(args.team_id.clone());
        self.issue_mutation(update, "transfer issue").await
    }

    async fn duplicate_issue(&self, args: &IssueIdArgs) -> Result<DuplicateResult> {
        let original = self.fetch_issue(&args.issue_id).await?.issue;

        let team_id = original
            .team
            .as_ref()
            .map(|t| t.id.clone())
            .ok_or_else(|| {
                Error::InvalidData(format!("Issue {} has no team", original.identifier))
            })?;

        let copy = CreateIssueArgs {
            title: format!("{} (copy)", original.title),
            team_id,
            description: original.description.clone(),
            priority: original.priority.and_then(|p| Priority::try_from(p).ok()),
            project_id: original.project.as_ref().map(|p| p.id.clone()),
            assignee_id: original.assignee.as_ref().map(|a| a.id.clone()),
            ..Default::default()
        };

        let duplicated = self.create_issue(&copy).await?;
        let original = map_issue(original);

        Ok(DuplicateResult {
            success: true,
            original_issue: original.summary(),
            duplicated_issue: duplicated,
        })
    }

    async fn get_issue_history(&self, args: &GetIssueHistoryArgs) -> Result<IssueHistory> {
        let issue: LinearIssueHistory = self
            .query_optional(
                queries::ISSUE_HISTORY,
                json!({
                    "id": args.issue_id,
                    "first": args.limit.unwrap_or(10),
                }),
                "issue",
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Issue {}", args.issue_id)))?;

        Ok(IssueHistory {
            issue_id: issue.id,
            identifier: issue.identifier,
            history: issue.history.nodes.into_iter().map(map_history).collect(),
        })
    }

    async fn get_cycles(&self, args: &GetCyclesArgs) -> Result<Vec<Cycle>> {
        let filter = args
            .team_id
            .as_ref()
            .map(|team_id| json!({ "team": { "id": { "eq": team_id } } }))
            .unwrap_or(Value::Null);

        let cycles: Connection<LinearCycle> = self
            .query(
                queries::CYCLES,
                json!({
                    "first": args.limit.unwrap_or(DEFAULT_LIMIT),
                    "filter": filter,
                }),
                "cycles",
            )
            .await?;
        Ok(cycles.nodes.into_iter().map(map_cycle).collect())
    }

    async fn get_active_cycle(&self, args: &TeamIdArgs) -> Result<ActiveCycle> {
        let team: LinearTeamActiveCycle = self
            .query_optional(
                queries::ACTIVE_CYCLE,
                json!({ "teamId": args.team_id }),
                "team",
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Team {}", args.team_id)))?;

        team.active_cycle
            .map(map_active_cycle)
            .ok_or_else(|| Error::NotFound(format!("No active cycle for team {}", args.team_id)))
    }

    async fn add_issue_to_cycle(&self, args: &AddIssueToCycleArgs) -> Result<IssueMutation> {
        let mut update = UpdateIssueArgs::for_issue(&args.issue_id);
        update.cycle_id = Some(args.cycle_id.clone());
        self.issue_mutation(update, "add issue to cycle").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(value: Value) -> LinearHistory {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_map_history_state_change() {
        let entry = map_history(history(json!({
            "id": "h1",
            "createdAt": "2024-01-02T00:00:00.000Z",
            "actor": {"id": "u1", "name": "Ada"},
            "fromState": {"name": "Todo"},
            "toState": {"name": "In Progress"}
        })));

        assert_eq!(entry.kind, "state");
        assert_eq!(entry.from.as_deref(), Some("Todo"));
        assert_eq!(entry.to.as_deref(), Some("In Progress"));
        assert_eq!(entry.actor.unwrap().name, "Ada");
    }

    #[test]
    fn test_map_history_priority_change() {
        let entry = map_history(history(json!({
            "id": "h2",
            "createdAt": "2024-01-02T00:00:00.000Z",
            "fromPriority": 3.0,
            "toPriority": 1.0
        })));

        assert_eq!(entry.kind, "priority");
        assert_eq!(entry.from.as_deref(), Some("3"));
        assert_eq!(entry.to.as_deref(), Some("1"));
    }

    #[test]
    fn test_map_history_without_field_pair() {
        let entry = map_history(history(json!({
            "id": "h3",
            "createdAt": "2024-01-02T00:00:00.000Z"
        })));
        assert_eq!(entry.kind, "update");
        assert!(entry.from.is_none());
    }

    #[test]
    fn test_issue_filter_all_fields() {
        let filter = issue_filter(&SearchIssuesArgs {
            query: Some("crash".into()),
            team_id: Some("T1".into()),
            assignee_id: None,
            project_id: Some("P1".into()),
            states: Some(vec!["Todo".into()]),
            limit: None,
        });

        assert_eq!(filter["team"]["id"]["eq"], "T1");
        assert_eq!(filter["project"]["id"]["eq"], "P1");
        assert_eq!(filter["state"]["name"]["in"], json!(["Todo"]));
        assert_eq!(filter["or"][0]["title"]["containsIgnoreCase"], "crash");
        assert!(filter.get("assignee").is_none());
    }

    #[test]
    fn test_issue_filter_ignores_empty_values() {
        let filter = issue_filter(&SearchIssuesArgs {
            query: Some(String::new()),
            states: Some(vec![]),
            ..Default::default()
        });
        assert_eq!(filter, json!({}));
    }

    #[test]
    fn test_active_cycle_progress_fallback() {
        let active: LinearActiveCycle = serde_json::from_value(json!({
            "id": "c1",
            "number": 7,
            "startsAt": "2024-01-01T00:00:00.000Z",
            "endsAt": "2024-01-15T00:00:00.000Z",
            "issues": {"nodes": [
                {"completedAt": "2024-01-03T00:00:00.000Z"},
                {"completedAt": null},
                {},
                {"completedAt": "2024-01-04T00:00:00.000Z"}
            ]}
        }))
        .unwrap();

        let mapped = map_active_cycle(active);
        assert_eq!(mapped.issue_count, 4);
        assert_eq!(mapped.completed_issue_count, 2);
        assert_eq!(mapped.progress, 0.5);
    }

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        const TOKEN: &str = "lin_api_test_token";

        fn create_test_client(server: &MockServer) -> LinearClient {
            LinearClient::with_base_url(server.url("/graphql"), TOKEN).unwrap()
        }

        fn sample_issue_json(id: &str, identifier: &str, title: &str) -> Value {
            json!({
                "id": id,
                "identifier": identifier,
                "title": title,
                "description": "Steps to reproduce",
                "priority": 2,
                "url": format!("https://linear.app/acme/issue/{}", identifier),
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-01-02T00:00:00.000Z",
                "state": {"name": "Todo"},
                "team": {"id": "T1", "name": "Engineering", "key": "ENG"},
                "assignee": {"id": "U1", "name": "Ada"},
                "project": {"id": "P1", "name": "Launch"},
                "cycle": null,
                "parent": null
            })
        }

        #[tokio::test]
        async fn test_get_viewer() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .header("Authorization", TOKEN)
                    .body_includes("query Viewer");
                then.status(200).json_body(json!({
                    "data": {"viewer": {
                        "id": "U1",
                        "name": "Ada",
                        "email": "ada@example.com",
                        "displayName": "ada",
                        "active": true,
                        "organization": {"id": "O1", "name": "Acme"}
                    }}
                }));
            });

            let client = create_test_client(&server);
            let viewer = client.get_viewer().await.unwrap();

            mock.assert();
            assert_eq!(viewer.user.name, "Ada");
            assert_eq!(viewer.organization.unwrap().name, "Acme");
        }

        #[tokio::test]
        async fn test_get_issues_passes_limit() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("query Issues")
                    .body_includes("\"first\":5");
                then.status(200).json_body(json!({
                    "data": {"issues": {"nodes": [
                        sample_issue_json("i1", "ENG-1", "First"),
                        sample_issue_json("i2", "ENG-2", "Second")
                    ]}}
                }));
            });

            let client = create_test_client(&server);
            let issues = client
                .get_issues(&GetIssuesArgs { limit: Some(5) })
                .await
                .unwrap();

            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0].identifier, "ENG-1");
            assert_eq!(issues[0].state.as_deref(), Some("Todo"));
            assert_eq!(issues[0].team.as_ref().unwrap().key.as_deref(), Some("ENG"));
        }

        #[tokio::test]
        async fn test_get_issues_default_limit() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql").body_includes("\"first\":25");
                then.status(200)
                    .json_body(json!({"data": {"issues": {"nodes": []}}}));
            });

            let client = create_test_client(&server);
            let issues = client.get_issues(&GetIssuesArgs::default()).await.unwrap();
            assert!(issues.is_empty());
        }

        #[tokio::test]
        async fn test_get_issue_by_id_includes_comments() {
            let server = MockServer::start();

            let mut issue = sample_issue_json("i1", "ENG-1", "First");
            issue["comments"] = json!({"nodes": [{
                "id": "c1",
                "body": "Looking into it",
                "createdAt": "2024-01-03T00:00:00.000Z",
                "url": "https://linear.app/acme/issue/ENG-1#comment-c1",
                "user": {"id": "U1", "name": "Ada"}
            }]});

            server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("query Issue(")
                    .body_includes("\"id\":\"ENG-1\"");
                then.status(200).json_body(json!({"data": {"issue": issue}}));
            });

            let client = create_test_client(&server);
            let detail = client
                .get_issue_by_id(&GetIssueByIdArgs { id: "ENG-1".into() })
                .await
                .unwrap();

            assert_eq!(detail.issue.title, "First");
            assert_eq!(detail.comments.len(), 1);
            assert_eq!(detail.comments[0].user.as_ref().unwrap().name, "Ada");
        }

        #[tokio::test]
        async fn test_get_issue_by_id_not_found() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(json!({"data": {"issue": null}}));
            });

            let client = create_test_client(&server);
            let err = client
                .get_issue_by_id(&GetIssueByIdArgs { id: "ENG-404".into() })
                .await
                .unwrap_err();

            assert!(matches!(err, Error::NotFound(_)));
            assert_eq!(err.to_string(), "Not found: Issue ENG-404");
        }

        #[tokio::test]
        async fn test_graphql_errors() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(json!({
                    "data": null,
                    "errors": [{"message": "Entity not found"}, {"message": "Second"}]
                }));
            });

            let client = create_test_client(&server);
            let err = client.get_teams().await.unwrap_err();

            assert!(matches!(err, Error::GraphQl(_)));
            assert_eq!(err.to_string(), "GraphQL error: Entity not found; Second");
        }

        #[tokio::test]
        async fn test_bad_request_with_graphql_body() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql");
                then.status(400)
                    .json_body(json!({"errors": [{"message": "Argument Validation Error"}]}));
            });

            let client = create_test_client(&server);
            let err = client.get_users().await.unwrap_err();
            assert!(matches!(err, Error::GraphQl(_)));
        }

        #[tokio::test]
        async fn test_unauthorized() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql");
                then.status(401).body("Authentication required");
            });

            let client = create_test_client(&server);
            let err = client.get_organization().await.unwrap_err();
            assert!(matches!(err, Error::Auth(_)));
        }

        #[tokio::test]
        async fn test_create_issue() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("issueCreate")
                    .body_includes("\"title\":\"Bug\"")
                    .body_includes("\"teamId\":\"T1\"");
                then.status(200).json_body(json!({
                    "data": {"issueCreate": {
                        "success": true,
                        "issue": sample_issue_json("i9", "ENG-9", "Bug")
                    }}
                }));
            });

            let client = create_test_client(&server);
            let issue = client
                .create_issue(&CreateIssueArgs {
                    title: "Bug".into(),
                    team_id: "T1".into(),
                    ..Default::default()
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(issue.id, "i9");
            assert_eq!(issue.url, "https://linear.app/acme/issue/ENG-9");
        }

        #[tokio::test]
        async fn test_create_issue_unsuccessful() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(json!({
                    "data": {"issueCreate": {"success": false, "issue": null}}
                }));
            });

            let client = create_test_client(&server);
            let err = client
                .create_issue(&CreateIssueArgs {
                    title: "Bug".into(),
                    team_id: "T1".into(),
                    ..Default::default()
                })
                .await
                .unwrap_err();

            assert_eq!(err.to_string(), "Invalid data: Failed to create issue");
        }

        #[tokio::test]
        async fn test_set_priority_uses_issue_update() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("issueUpdate")
                    .body_includes("\"id\":\"ENG-1\"")
                    .body_includes("\"input\":{\"priority\":1}");
                then.status(200).json_body(json!({
                    "data": {"issueUpdate": {
                        "success": true,
                        "issue": sample_issue_json("i1", "ENG-1", "First")
                    }}
                }));
            });

            let client = create_test_client(&server);
            let result = client
                .set_issue_priority(&SetPriorityArgs {
                    issue_id: "ENG-1".into(),
                    priority: Priority::Urgent,
                })
                .await
                .unwrap();

            mock.assert();
            assert!(result.success);
            assert_eq!(result.issue.identifier, "ENG-1");
        }

        #[tokio::test]
        async fn test_blocked_by_relation_swaps_issues() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("issueRelationCreate")
                    .body_includes("\"issueId\":\"ENG-2\"")
                    .body_includes("\"relatedIssueId\":\"ENG-1\"")
                    .body_includes("\"type\":\"blocks\"");
                then.status(200).json_body(json!({
                    "data": {"issueRelationCreate": {
                        "success": true,
                        "issueRelation": {
                            "id": "r1",
                            "issue": {"id": "i2", "identifier": "ENG-2", "title": "Blocker"},
                            "relatedIssue": {"id": "i1", "identifier": "ENG-1", "title": "Blocked"}
                        }
                    }}
                }));
            });

            let client = create_test_client(&server);
            let result = client
                .create_issue_relation(&CreateRelationArgs {
                    issue_id: "ENG-1".into(),
                    related_issue_id: "ENG-2".into(),
                    kind: RelationType::BlockedBy,
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(result.relation.kind, "blocked_by");
            assert_eq!(result.relation.issue_identifier, "ENG-1");
            assert_eq!(result.relation.related_issue_identifier, "ENG-2");
        }

        #[tokio::test]
        async fn test_add_issue_label() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("issueAddLabel")
                    .body_includes("\"labelId\":\"L1\"");
                then.status(200).json_body(json!({
                    "data": {"issueAddLabel": {
                        "success": true,
                        "issue": sample_issue_json("i1", "ENG-1", "First")
                    }}
                }));
            });

            let client = create_test_client(&server);
            let change = client
                .add_issue_label(&IssueLabelArgs {
                    issue_id: "ENG-1".into(),
                    label_id: "L1".into(),
                })
                .await
                .unwrap();

            assert!(change.success);
            assert_eq!(change.issue_id, "i1");
            assert_eq!(change.label_id, "L1");
        }

        #[tokio::test]
        async fn test_duplicate_issue() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql").body_includes("query Issue(");
                then.status(200).json_body(json!({
                    "data": {"issue": sample_issue_json("i1", "ENG-1", "Crash")}
                }));
            });

            let create = server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("issueCreate")
                    .body_includes("\"title\":\"Crash (copy)\"")
                    .body_includes("\"teamId\":\"T1\"")
                    .body_includes("\"projectId\":\"P1\"")
                    .body_includes("\"assigneeId\":\"U1\"");
                then.status(200).json_body(json!({
                    "data": {"issueCreate": {
                        "success": true,
                        "issue": sample_issue_json("i2", "ENG-2", "Crash (copy)")
                    }}
                }));
            });

            let client = create_test_client(&server);
            let result = client
                .duplicate_issue(&IssueIdArgs {
                    issue_id: "ENG-1".into(),
                })
                .await
                .unwrap();

            create.assert();
            assert_eq!(result.original_issue.identifier, "ENG-1");
            assert_eq!(result.duplicated_issue.title, "Crash (copy)");
        }

        #[tokio::test]
        async fn test_active_cycle_missing() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/graphql").body_includes("query ActiveCycle");
                then.status(200)
                    .json_body(json!({"data": {"team": {"activeCycle": null}}}));
            });

            let client = create_test_client(&server);
            let err = client
                .get_active_cycle(&TeamIdArgs {
                    team_id: "T1".into(),
                })
                .await
                .unwrap_err();

            assert_eq!(err.to_string(), "Not found: No active cycle for team T1");
        }

        #[tokio::test]
        async fn test_get_cycles_filters_by_team() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("query Cycles")
                    .body_includes("\"eq\":\"T1\"");
                then.status(200).json_body(json!({
                    "data": {"cycles": {"nodes": [{
                        "id": "c1",
                        "number": 3,
                        "name": "Sprint 3",
                        "startsAt": "2024-01-01T00:00:00.000Z",
                        "endsAt": "2024-01-15T00:00:00.000Z",
                        "team": {"id": "T1", "name": "Engineering", "key": "ENG"}
                    }]}}
                }));
            });

            let client = create_test_client(&server);
            let cycles = client
                .get_cycles(&GetCyclesArgs {
                    team_id: Some("T1".into()),
                    limit: None,
                })
                .await
                .unwrap();

            assert_eq!(cycles.len(), 1);
            assert_eq!(cycles[0].name.as_deref(), Some("Sprint 3"));
        }

        #[tokio::test]
        async fn test_get_workflow_states_sorted_by_position() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_includes("query WorkflowStates")
                    .body_includes("\"includeArchived\":false");
                then.status(200).json_body(json!({
                    "data": {"workflowStates": {"nodes": [
                        {"id": "s2", "name": "Done", "type": "completed", "color": "#0f0", "position": 3.0},
                        {"id": "s1", "name": "Todo", "type": "unstarted", "color": "#ccc", "position": 1.0}
                    ]}}
                }));
            });

            let client = create_test_client(&server);
            let states = client
                .get_workflow_states(&GetWorkflowStatesArgs {
                    team_id: "T1".into(),
                    include_archived: None,
                })
                .await
                .unwrap();

            assert_eq!(states[0].name, "Todo");
            assert_eq!(states[1].kind, "completed");
        }
    }
}
