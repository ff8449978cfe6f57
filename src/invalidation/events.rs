//! Data-change taxonomy and the table mapping it to cache key groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::keys;

// == Key Group ==
/// A family of cache entries cleared together. Each group is one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyGroup {
    User,
    UserData,
    UserPreferences,
    MathlabRequests,
    MathlabSessions,
    Clubs,
    Events,
    JoinRequests,
    SchoolJoinRequests,
    DashboardStats,
    Tags,
}

impl KeyGroup {
    pub const ALL: [KeyGroup; 11] = [
        KeyGroup::User,
        KeyGroup::UserData,
        KeyGroup::UserPreferences,
        KeyGroup::MathlabRequests,
        KeyGroup::MathlabSessions,
        KeyGroup::Clubs,
        KeyGroup::Events,
        KeyGroup::JoinRequests,
        KeyGroup::SchoolJoinRequests,
        KeyGroup::DashboardStats,
        KeyGroup::Tags,
    ];

    /// Namespace of the keys in this group.
    pub fn namespace(self) -> &'static str {
        match self {
            KeyGroup::User => keys::USER,
            KeyGroup::UserData => keys::USER_DATA,
            KeyGroup::UserPreferences => keys::USER_PREFERENCES,
            KeyGroup::MathlabRequests => keys::MATHLAB_REQUESTS,
            KeyGroup::MathlabSessions => keys::MATHLAB_SESSIONS,
            KeyGroup::Clubs => keys::CLUBS,
            KeyGroup::Events => keys::EVENTS,
            KeyGroup::JoinRequests => keys::JOIN_REQUESTS,
            KeyGroup::SchoolJoinRequests => keys::SCHOOL_JOIN_REQUESTS,
            KeyGroup::DashboardStats => keys::DASHBOARD_STATS,
            KeyGroup::Tags => keys::TAGS,
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.namespace() == namespace)
    }
}

impl fmt::Display for KeyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

// == Data Type ==
/// What kind of record a mutation touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    UserProfile,
    UserPreferences,
    MathlabRole,
    TutoringRequest,
    TutoringSession,
    Club,
    ClubEvent,
    JoinRequest,
    Tag,
    /// Anything unrecognized; handled conservatively
    Other(String),
}

impl DataType {
    /// Key groups a change of this type invalidates.
    pub fn key_groups(&self) -> &'static [KeyGroup] {
        match self {
            DataType::UserProfile => &[KeyGroup::UserData, KeyGroup::User],
            DataType::UserPreferences => &[KeyGroup::UserPreferences],
            DataType::MathlabRole => &[
                KeyGroup::UserData,
                KeyGroup::MathlabRequests,
                KeyGroup::MathlabSessions,
            ],
            DataType::TutoringRequest | DataType::TutoringSession => {
                &[KeyGroup::MathlabRequests, KeyGroup::MathlabSessions]
            }
            DataType::Club => &[KeyGroup::Clubs, KeyGroup::DashboardStats],
            DataType::ClubEvent => &[KeyGroup::Events],
            DataType::JoinRequest => &[
                KeyGroup::JoinRequests,
                KeyGroup::SchoolJoinRequests,
                KeyGroup::DashboardStats,
            ],
            DataType::Tag => &[KeyGroup::Tags],
            DataType::Other(_) => &[KeyGroup::User],
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::UserProfile => "user_profile",
            DataType::UserPreferences => "user_preferences",
            DataType::MathlabRole => "mathlab_role",
            DataType::TutoringRequest => "tutoring_request",
            DataType::TutoringSession => "tutoring_session",
            DataType::Club => "club",
            DataType::ClubEvent => "club_event",
            DataType::JoinRequest => "join_request",
            DataType::Tag => "tag",
            DataType::Other(raw) => raw,
        }
    }
}

impl From<&str> for DataType {
    fn from(raw: &str) -> Self {
        match raw {
            "user_profile" => DataType::UserProfile,
            "user_preferences" => DataType::UserPreferences,
            "mathlab_role" => DataType::MathlabRole,
            "tutoring_request" => DataType::TutoringRequest,
            "tutoring_session" => DataType::TutoringSession,
            "club" => DataType::Club,
            "club_event" => DataType::ClubEvent,
            "join_request" => DataType::JoinRequest,
            "tag" => DataType::Tag,
            other => DataType::Other(other.to_string()),
        }
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Change Type ==
/// What happened to the record. Informational: it travels with the signal
/// but does not change which groups are cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    /// e.g. a tutoring request was cancelled
    Cancel,
    /// e.g. a tutoring session ended
    End,
    Other(String),
}

impl ChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
            ChangeType::Cancel => "cancel",
            ChangeType::End => "end",
            ChangeType::Other(raw) => raw,
        }
    }
}

impl From<&str> for ChangeType {
    fn from(raw: &str) -> Self {
        match raw {
            "create" => ChangeType::Create,
            "update" => ChangeType::Update,
            "delete" => ChangeType::Delete,
            "cancel" => ChangeType::Cancel,
            "end" => ChangeType::End,
            other => ChangeType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaces the staleness sweep covers: the user and tutoring groups.
/// Club, event, join request and tag entries expire by TTL only.
pub fn managed_namespaces() -> Vec<&'static str> {
    let mut namespaces: Vec<&'static str> = [
        DataType::UserProfile,
        DataType::UserPreferences,
        DataType::MathlabRole,
        DataType::TutoringRequest,
        DataType::TutoringSession,
    ]
    .iter()
    .flat_map(|dt| dt.key_groups().iter().map(|g| g.namespace()))
    .collect();
    namespaces.sort_unstable();
    namespaces.dedup();
    namespaces
}
