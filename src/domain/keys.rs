//! Key templates and per-entity TTLs of the domain facades.

use crate::cache::CacheKey;

pub const USER: &str = "user";
pub const SCHOOL: &str = "school";
pub const CLUBS: &str = "clubs";
pub const EVENTS: &str = "events";
pub const TAGS: &str = "tags";
pub const JOIN_REQUESTS: &str = "joinRequests";
pub const SCHOOL_JOIN_REQUESTS: &str = "schoolJoinRequests";
pub const DASHBOARD_STATS: &str = "dashboardStats";
pub const USER_DATA: &str = "userData";
pub const USER_PREFERENCES: &str = "userPreferences";
pub const MATHLAB_REQUESTS: &str = "mathlabRequests";
pub const MATHLAB_SESSIONS: &str = "mathlabSessions";

// TTLs in seconds
pub const USER_TTL: u64 = 1800;
pub const SCHOOL_TTL: u64 = 3600;
pub const CLUBS_TTL: u64 = 900;
pub const EVENTS_TTL: u64 = 300;
pub const EVENTS_SHORT_TTL: u64 = 180;
pub const TAGS_TTL: u64 = 1800;
pub const JOIN_REQUESTS_TTL: u64 = 120;
pub const DASHBOARD_STATS_TTL: u64 = 300;
pub const TUTORING_TTL: u64 = 300;

pub fn user(uid: &str) -> CacheKey {
    CacheKey::new(USER, uid)
}

pub fn school(id: &str) -> CacheKey {
    CacheKey::new(SCHOOL, id)
}

pub fn clubs(school_id: &str) -> CacheKey {
    CacheKey::new(CLUBS, school_id)
}

pub fn events(club_id: &str) -> CacheKey {
    CacheKey::new(EVENTS, club_id)
}

/// Tag sets are keyed by their sorted ids so lookup order does not matter.
pub fn tags<S: AsRef<str>>(ids: &[S]) -> CacheKey {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    CacheKey::new(TAGS, sorted.join(","))
}

pub fn join_requests(club_id: &str) -> CacheKey {
    CacheKey::new(JOIN_REQUESTS, club_id)
}

pub fn school_join_requests(school_id: &str) -> CacheKey {
    CacheKey::new(SCHOOL_JOIN_REQUESTS, school_id)
}

pub fn dashboard_stats(school_id: &str) -> CacheKey {
    CacheKey::new(DASHBOARD_STATS, school_id)
}

pub fn user_data(uid: &str) -> CacheKey {
    CacheKey::new(USER_DATA, uid)
}

pub fn user_preferences(uid: &str) -> CacheKey {
    CacheKey::new(USER_PREFERENCES, uid)
}

pub fn mathlab_requests(uid: &str) -> CacheKey {
    CacheKey::new(MATHLAB_REQUESTS, uid)
}

pub fn mathlab_sessions(uid: &str) -> CacheKey {
    CacheKey::new(MATHLAB_SESSIONS, uid)
}
