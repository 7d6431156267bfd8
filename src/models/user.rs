use serde::{Deserialize, Serialize};

/// Role attached to a GrantEzy account. Each role owns one dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    ProgramManager,
    Reviewer,
    Applicant,
    CoApplicant,
    /// Grant-committee viewer.
    Gcv,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Landing route for the role's dashboard, if it has one.
    pub fn dashboard_route(&self) -> Option<&'static str> {
        match self {
            Role::Admin => Some("/admin"),
            Role::ProgramManager => Some("/pm"),
            Role::Reviewer => Some("/reviewer"),
            Role::Applicant => Some("/applicant"),
            Role::CoApplicant => Some("/co-applicant"),
            Role::Gcv => Some("/gcv"),
            Role::Unknown => None,
        }
    }
}

/// Profile snapshot cached next to the session token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        User {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            role,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
