//! The Linear tool catalog.
//!
//! Each tool's input is declared once as a slice of [`Field`]s; the catalog
//! pairs it with a description, a documented output shape and its handler.

use linear_core::args::{Priority, RelationType};
use serde_json::{json, Value};

use crate::handlers::{self, ToolSpec};
use crate::schema::Field;

const PRIORITY_HELP: &str =
    "Priority of the issue (0 = No priority, 1 = Urgent, 2 = High, 3 = Normal, 4 = Low)";

const PRIORITIES: &[i64] = &[
    Priority::NoPriority as i64,
    Priority::Urgent as i64,
    Priority::High as i64,
    Priority::Normal as i64,
    Priority::Low as i64,
];

/// Page sizes are carried as `u32`.
const LIMIT_MAX: i64 = u32::MAX as i64;

const NO_INPUT: &[Field] = &[];

// =============================================================================
// Input shapes
// =============================================================================

const GET_WORKFLOW_STATES: &[Field] = &[
    Field::string("teamId", "ID of the team to get workflow states for").required(),
    Field::boolean("includeArchived", "Whether to include archived states (default: false)"),
];

const CREATE_PROJECT: &[Field] = &[
    Field::string("name", "Name of the project").required(),
    Field::string("description", "Description of the project (Markdown supported)"),
    Field::string_array("teamIds", "IDs of the teams this project belongs to").required(),
    Field::string(
        "state",
        "Initial state of the project (e.g., 'planned', 'started', 'paused', 'completed', 'canceled')",
    ),
];

const UPDATE_PROJECT: &[Field] = &[
    Field::string("id", "ID of the project to update").required(),
    Field::string("name", "New name of the project"),
    Field::string("description", "New description of the project (Markdown supported)"),
    Field::string(
        "state",
        "New state of the project (e.g., 'planned', 'started', 'paused', 'completed', 'canceled')",
    ),
];

const ADD_ISSUE_TO_PROJECT: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to add to the project").required(),
    Field::string("projectId", "ID of the project to add the issue to").required(),
];

const GET_PROJECT_ISSUES: &[Field] = &[
    Field::string("projectId", "ID of the project to get issues for").required(),
    Field::integer("limit", "Maximum number of issues to return (default: 25)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const GET_ISSUES: &[Field] = &[
    Field::integer("limit", "Maximum number of issues to return (default: 25)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const GET_ISSUE_BY_ID: &[Field] =
    &[Field::string("id", "The ID or identifier of the issue (e.g., ABC-123)").required()];

const SEARCH_ISSUES: &[Field] = &[
    Field::string("query", "Text to search for in issue title or description"),
    Field::string("teamId", "Filter issues by team ID"),
    Field::string("assigneeId", "Filter issues by assignee ID"),
    Field::string("projectId", "Filter issues by project ID"),
    Field::string_array(
        "states",
        "Filter issues by state name (e.g., 'Todo', 'In Progress', 'Done')",
    ),
    Field::integer("limit", "Maximum number of issues to return (default: 25)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const CREATE_ISSUE: &[Field] = &[
    Field::string("title", "Title of the issue").required(),
    Field::string("description", "Description of the issue (Markdown supported)"),
    Field::string("teamId", "ID of the team the issue belongs to").required(),
    Field::string("assigneeId", "ID of the user to assign the issue to"),
    Field::number("priority", PRIORITY_HELP).one_of_numbers(PRIORITIES),
    Field::string("projectId", "ID of the project the issue belongs to"),
    Field::string("cycleId", "ID of the cycle to add the issue to"),
    Field::number("estimate", "Estimate in points"),
    Field::string("dueDate", "Due date (YYYY-MM-DD)"),
    Field::string_array("labelIds", "IDs of labels to apply"),
    Field::string("parentId", "ID of the parent issue"),
    Field::string_array("subscriberIds", "IDs of users to subscribe to the issue"),
    Field::string("stateId", "ID of the initial workflow state"),
    Field::string("templateId", "ID of a template to create the issue from"),
    Field::number("sortOrder", "Position of the issue in its list"),
];

const UPDATE_ISSUE: &[Field] = &[
    Field::string("id", "ID or identifier of the issue to update (e.g., ABC-123)").required(),
    Field::string("title", "New title for the issue"),
    Field::string("description", "New description for the issue (Markdown supported)"),
    Field::string("stateId", "ID of the new state for the issue"),
    Field::number("priority", PRIORITY_HELP).one_of_numbers(PRIORITIES),
    Field::string("projectId", "ID of the project to move the issue to"),
    Field::string("assigneeId", "ID of the user to assign the issue to"),
    Field::string("cycleId", "ID of the cycle to move the issue to"),
    Field::number("estimate", "Estimate in points"),
    Field::string("dueDate", "Due date (YYYY-MM-DD)"),
    Field::string_array("labelIds", "IDs of labels replacing the current set"),
    Field::string_array("addedLabelIds", "IDs of labels to add"),
    Field::string_array("removedLabelIds", "IDs of labels to remove"),
    Field::string("parentId", "ID of the parent issue"),
    Field::string_array("subscriberIds", "IDs of users subscribed to the issue"),
    Field::string("teamId", "ID of the team to move the issue to"),
    Field::number("sortOrder", "Position of the issue in its list"),
];

const CREATE_COMMENT: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to comment on (e.g., ABC-123)")
        .required(),
    Field::string("body", "Text of the comment (Markdown supported)").required(),
];

const GET_COMMENTS: &[Field] = &[
    Field::string(
        "issueId",
        "ID or identifier of the issue to get comments from (e.g., ABC-123)",
    )
    .required(),
    Field::integer("limit", "Maximum number of comments to return (default: 25)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const ADD_ISSUE_LABEL: &[Field] = &[
    Field::string(
        "issueId",
        "ID or identifier of the issue to add the label to (e.g., ABC-123)",
    )
    .required(),
    Field::string("labelId", "ID of the label to add to the issue").required(),
];

const REMOVE_ISSUE_LABEL: &[Field] = &[
    Field::string(
        "issueId",
        "ID or identifier of the issue to remove the label from (e.g., ABC-123)",
    )
    .required(),
    Field::string("labelId", "ID of the label to remove from the issue").required(),
];

const ASSIGN_ISSUE: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to assign (e.g., ABC-123)").required(),
    Field::string("assigneeId", "ID of the user to assign the issue to").required(),
];

const SUBSCRIBE_TO_ISSUE: &[Field] = &[Field::string(
    "issueId",
    "ID or identifier of the issue to subscribe to (e.g., ABC-123)",
)
.required()];

const CONVERT_TO_SUBTASK: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to convert (e.g., ABC-123)").required(),
    Field::string("parentIssueId", "ID or identifier of the parent issue (e.g., ABC-456)")
        .required(),
];

const CREATE_ISSUE_RELATION: &[Field] = &[
    Field::string("issueId", "ID or identifier of the first issue (e.g., ABC-123)").required(),
    Field::string("relatedIssueId", "ID or identifier of the second issue (e.g., ABC-456)")
        .required(),
    Field::string(
        "type",
        "Type of relation: 'blocks', 'blocked_by', 'related', 'duplicate', 'duplicate_of'",
    )
    .required()
    .one_of_strings(&RelationType::NAMES),
];

const ARCHIVE_ISSUE: &[Field] = &[Field::string(
    "issueId",
    "ID or identifier of the issue to archive (e.g., ABC-123)",
)
.required()];

const SET_ISSUE_PRIORITY: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue (e.g., ABC-123)").required(),
    Field::number(
        "priority",
        "Priority level (0 = No priority, 1 = Urgent, 2 = High, 3 = Normal, 4 = Low)",
    )
    .required()
    .one_of_numbers(PRIORITIES),
];

const TRANSFER_ISSUE: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to transfer (e.g., ABC-123)").required(),
    Field::string("teamId", "ID of the team to transfer the issue to").required(),
];

const DUPLICATE_ISSUE: &[Field] = &[Field::string(
    "issueId",
    "ID or identifier of the issue to duplicate (e.g., ABC-123)",
)
.required()];

const GET_ISSUE_HISTORY: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue (e.g., ABC-123)").required(),
    Field::integer("limit", "Maximum number of history events to return (default: 10)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const GET_CYCLES: &[Field] = &[
    Field::string("teamId", "ID of the team to get cycles for (optional)"),
    Field::integer("limit", "Maximum number of cycles to return (default: 25)")
        .minimum(1)
        .maximum(LIMIT_MAX),
];

const GET_ACTIVE_CYCLE: &[Field] =
    &[Field::string("teamId", "ID of the team to get the active cycle for").required()];

const ADD_ISSUE_TO_CYCLE: &[Field] = &[
    Field::string("issueId", "ID or identifier of the issue to add to the cycle").required(),
    Field::string("cycleId", "ID of the cycle to add the issue to").required(),
];

// =============================================================================
// Output shapes
// =============================================================================

fn object(properties: Value) -> Value {
    json!({ "type": "object", "properties": properties })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "array", "items": items })
}

fn named() -> Value {
    object(json!({ "id": { "type": "string" }, "name": { "type": "string" } }))
}

fn user() -> Value {
    object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "email": { "type": "string" },
        "displayName": { "type": "string" },
        "active": { "type": "boolean" }
    }))
}

fn viewer() -> Value {
    let mut viewer = user();
    viewer["properties"]["organization"] = named();
    viewer
}

fn organization() -> Value {
    object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "urlKey": { "type": "string" },
        "logoUrl": { "type": "string" }
    }))
}

fn users() -> Value {
    array_of(user())
}

fn labels() -> Value {
    array_of(object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "description": { "type": "string" },
        "color": { "type": "string" },
        "team": named()
    })))
}

fn teams() -> Value {
    array_of(object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "key": { "type": "string" },
        "description": { "type": "string" },
        "states": array_of(named())
    })))
}

fn workflow_states() -> Value {
    array_of(object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "type": { "type": "string" },
        "color": { "type": "string" },
        "position": { "type": "number" },
        "team": named()
    })))
}

fn project() -> Value {
    object(json!({
        "id": { "type": "string" },
        "name": { "type": "string" },
        "description": { "type": "string" },
        "state": { "type": "string" },
        "url": { "type": "string" },
        "teams": array_of(named())
    }))
}

fn projects() -> Value {
    array_of(project())
}

fn issue() -> Value {
    object(json!({
        "id": { "type": "string" },
        "identifier": { "type": "string" },
        "title": { "type": "string" },
        "description": { "type": "string" },
        "state": { "type": "string" },
        "priority": { "type": "number" },
        "team": { "type": "object" },
        "assignee": { "type": "object" },
        "project": { "type": "object" },
        "cycle": { "type": "object" },
        "parent": { "type": "object" },
        "url": { "type": "string" },
        "createdAt": { "type": "string" }
    }))
}

fn issues() -> Value {
    array_of(issue())
}

fn issue_ref() -> Value {
    object(json!({
        "id": { "type": "string" },
        "identifier": { "type": "string" },
        "title": { "type": "string" }
    }))
}

fn comment() -> Value {
    object(json!({
        "id": { "type": "string" },
        "body": { "type": "string" },
        "createdAt": { "type": "string" },
        "user": named(),
        "url": { "type": "string" }
    }))
}

fn comments() -> Value {
    array_of(comment())
}

fn issue_detail() -> Value {
    let mut detail = issue();
    detail["properties"]["comments"] = comments();
    detail
}

fn issue_mutation() -> Value {
    object(json!({ "success": { "type": "boolean" }, "issue": issue() }))
}

fn label_change() -> Value {
    object(json!({
        "success": { "type": "boolean" },
        "issueId": { "type": "string" },
        "labelId": { "type": "string" }
    }))
}

fn action_result() -> Value {
    object(json!({ "success": { "type": "boolean" }, "message": { "type": "string" } }))
}

fn relation_result() -> Value {
    object(json!({
        "success": { "type": "boolean" },
        "relation": object(json!({
            "id": { "type": "string" },
            "type": { "type": "string" },
            "issueIdentifier": { "type": "string" },
            "relatedIssueIdentifier": { "type": "string" }
        }))
    }))
}

fn duplicate_result() -> Value {
    object(json!({
        "success": { "type": "boolean" },
        "originalIssue": issue_ref(),
        "duplicatedIssue": issue()
    }))
}

fn issue_history() -> Value {
    object(json!({
        "issueId": { "type": "string" },
        "identifier": { "type": "string" },
        "history": array_of(object(json!({
            "id": { "type": "string" },
            "createdAt": { "type": "string" },
            "actor": named(),
            "type": { "type": "string" },
            "from": { "type": "string" },
            "to": { "type": "string" }
        })))
    }))
}

fn cycle() -> Value {
    object(json!({
        "id": { "type": "string" },
        "number": { "type": "number" },
        "name": { "type": "string" },
        "description": { "type": "string" },
        "startsAt": { "type": "string" },
        "endsAt": { "type": "string" },
        "completedAt": { "type": "string" },
        "team": object(json!({
            "id": { "type": "string" },
            "name": { "type": "string" },
            "key": { "type": "string" }
        }))
    }))
}

fn cycles() -> Value {
    array_of(cycle())
}

fn active_cycle() -> Value {
    let mut active = cycle();
    active["properties"]["progress"] = json!({ "type": "number" });
    active["properties"]["issueCount"] = json!({ "type": "number" });
    active["properties"]["completedIssueCount"] = json!({ "type": "number" });
    active
}

// =============================================================================
// Catalog
// =============================================================================

fn tool(
    name: &'static str,
    description: &'static str,
    input: &'static [Field],
    output: fn() -> Value,
    handler: handlers::HandlerFn,
) -> ToolSpec {
    ToolSpec {
        name,
        description,
        input,
        output,
        handler,
    }
}

/// Every Linear tool, in listing order.
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        // Users and organization
        tool(
            "linear_getViewer",
            "Get information about the currently authenticated user",
            NO_INPUT,
            viewer,
            handlers::get_viewer,
        ),
        tool(
            "linear_getOrganization",
            "Get information about the current Linear organization",
            NO_INPUT,
            organization,
            handlers::get_organization,
        ),
        tool(
            "linear_getUsers",
            "Get a list of users in the Linear organization",
            NO_INPUT,
            users,
            handlers::get_users,
        ),
        tool(
            "linear_getLabels",
            "Get a list of issue labels from Linear",
            NO_INPUT,
            labels,
            handlers::get_labels,
        ),
        // Teams
        tool(
            "linear_getTeams",
            "Get a list of teams from Linear",
            NO_INPUT,
            teams,
            handlers::get_teams,
        ),
        tool(
            "linear_getWorkflowStates",
            "Get the workflow states of a team, ordered by position",
            GET_WORKFLOW_STATES,
            workflow_states,
            handlers::get_workflow_states,
        ),
        // Projects
        tool(
            "linear_getProjects",
            "Get a list of projects from Linear",
            NO_INPUT,
            projects,
            handlers::get_projects,
        ),
        tool(
            "linear_createProject",
            "Create a new project in Linear",
            CREATE_PROJECT,
            project,
            handlers::create_project,
        ),
        tool(
            "linear_updateProject",
            "Update an existing project in Linear",
            UPDATE_PROJECT,
            project,
            handlers::update_project,
        ),
        tool(
            "linear_addIssueToProject",
            "Add an existing issue to a project",
            ADD_ISSUE_TO_PROJECT,
            issue_mutation,
            handlers::add_issue_to_project,
        ),
        tool(
            "linear_getProjectIssues",
            "Get all issues associated with a project",
            GET_PROJECT_ISSUES,
            issues,
            handlers::get_project_issues,
        ),
        // Issues
        tool(
            "linear_getIssues",
            "Get a list of recent issues from Linear",
            GET_ISSUES,
            issues,
            handlers::get_issues,
        ),
        tool(
            "linear_getIssueById",
            "Get a specific issue by ID or identifier (e.g., ABC-123)",
            GET_ISSUE_BY_ID,
            issue_detail,
            handlers::get_issue_by_id,
        ),
        tool(
            "linear_searchIssues",
            "Search for issues with various filters",
            SEARCH_ISSUES,
            issues,
            handlers::search_issues,
        ),
        tool(
            "linear_createIssue",
            "Create a new issue in Linear",
            CREATE_ISSUE,
            issue,
            handlers::create_issue,
        ),
        tool(
            "linear_updateIssue",
            "Update an existing issue in Linear",
            UPDATE_ISSUE,
            issue,
            handlers::update_issue,
        ),
        tool(
            "linear_createComment",
            "Add a comment to an issue in Linear",
            CREATE_COMMENT,
            comment,
            handlers::create_comment,
        ),
        tool(
            "linear_getComments",
            "Get all comments for an issue",
            GET_COMMENTS,
            comments,
            handlers::get_comments,
        ),
        tool(
            "linear_addIssueLabel",
            "Add a label to an issue in Linear",
            ADD_ISSUE_LABEL,
            label_change,
            handlers::add_issue_label,
        ),
        tool(
            "linear_removeIssueLabel",
            "Remove a label from an issue in Linear",
            REMOVE_ISSUE_LABEL,
            label_change,
            handlers::remove_issue_label,
        ),
        tool(
            "linear_assignIssue",
            "Assign an issue to a user",
            ASSIGN_ISSUE,
            issue_mutation,
            handlers::assign_issue,
        ),
        tool(
            "linear_subscribeToIssue",
            "Subscribe to issue updates",
            SUBSCRIBE_TO_ISSUE,
            action_result,
            handlers::subscribe_to_issue,
        ),
        tool(
            "linear_convertIssueToSubtask",
            "Convert an issue to a subtask",
            CONVERT_TO_SUBTASK,
            issue_mutation,
            handlers::convert_issue_to_subtask,
        ),
        tool(
            "linear_createIssueRelation",
            "Create relations between issues (blocks, is blocked by, etc.)",
            CREATE_ISSUE_RELATION,
            relation_result,
            handlers::create_issue_relation,
        ),
        tool(
            "linear_archiveIssue",
            "Archive an issue",
            ARCHIVE_ISSUE,
            action_result,
            handlers::archive_issue,
        ),
        tool(
            "linear_setIssuePriority",
            "Set the priority of an issue",
            SET_ISSUE_PRIORITY,
            issue_mutation,
            handlers::set_issue_priority,
        ),
        tool(
            "linear_transferIssue",
            "Transfer an issue to another team",
            TRANSFER_ISSUE,
            issue_mutation,
            handlers::transfer_issue,
        ),
        tool(
            "linear_duplicateIssue",
            "Duplicate an issue",
            DUPLICATE_ISSUE,
            duplicate_result,
            handlers::duplicate_issue,
        ),
        tool(
            "linear_getIssueHistory",
            "Get the history of changes made to an issue",
            GET_ISSUE_HISTORY,
            issue_history,
            handlers::get_issue_history,
        ),
        // Cycles
        tool(
            "linear_getCycles",
            "Get a list of all cycles",
            GET_CYCLES,
            cycles,
            handlers::get_cycles,
        ),
        tool(
            "linear_getActiveCycle",
            "Get the currently active cycle for a team",
            GET_ACTIVE_CYCLE,
            active_cycle,
            handlers::get_active_cycle,
        ),
        tool(
            "linear_addIssueToCycle",
            "Add an issue to a cycle",
            ADD_ISSUE_TO_CYCLE,
            issue_mutation,
            handlers::add_issue_to_cycle,
        ),
    ]
}
