use crate::mcp::ToolCall;

pub const GET_ME: &str = "get_me";
pub const GET_TEAMS: &str = "get_teams";
pub const GET_TEAM_MEMBERS: &str = "get_team_members";

/// The authenticated identity. Responds with a user object carrying `login`.
pub fn get_me() -> ToolCall {
    ToolCall::new(GET_ME)
}

/// Teams of `user`, or of the authenticated user when `None`.
pub fn get_teams(user: Option<&str>) -> ToolCall {
    ToolCall::new(GET_TEAMS).opt_arg("user", user)
}

pub fn get_team_members(org: &str, team_slug: &str) -> ToolCall {
    ToolCall::new(GET_TEAM_MEMBERS)
        .arg("org", org)
        .arg("team_slug", team_slug)
}
