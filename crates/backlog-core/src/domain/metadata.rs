//! Inventory entries and group tags.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RunResults, TaskId, TaskType};

/// Opaque tag naming a dependency chain of tasks.
///
/// A task can start a group (`group_start`) and be blocked by other groups
/// (`group_member`). When a group's starter fails, its members are skipped for
/// the rest of that run-loop pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupTag(String);

impl GroupTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Group of everything sent on behalf of an identified profile.
    pub fn identified_profile(identifier: &str) -> Self {
        Self(format!("identified_profile_{identifier}"))
    }

    /// Group of everything that needs a registered push token.
    pub fn registered_push_token(token: &str) -> Self {
        Self(format!("registered_push_token_{token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lightweight reference to a queued task, as kept in the inventory.
///
/// Position in the inventory defines execution order. Two entries are the same
/// task when their `task_persisted_id` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task_persisted_id: TaskId,

    pub task_type: TaskType,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_start: Option<GroupTag>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub group_member: BTreeSet<GroupTag>,

    /// Run history as of enqueue. The task store holds the live counter.
    #[serde(default)]
    pub run_history: RunResults,
}

impl TaskMetadata {
    pub fn new(task_persisted_id: TaskId, task_type: TaskType, created_at: DateTime<Utc>) -> Self {
        Self {
            task_persisted_id,
            task_type,
            created_at,
            group_start: None,
            group_member: BTreeSet::new(),
            run_history: RunResults::default(),
        }
    }

    pub fn starting_group(mut self, group: Option<GroupTag>) -> Self {
        self.group_start = group;
        self
    }

    pub fn member_of(mut self, groups: impl IntoIterator<Item = GroupTag>) -> Self {
        self.group_member.extend(groups);
        self
    }

    pub fn is_same_task(&self, other: &TaskMetadata) -> bool {
        self.task_persisted_id == other.task_persisted_id
    }

    /// Is this task blocked by any of the given groups?
    pub fn is_member_of_any(&self, groups: &BTreeSet<GroupTag>) -> bool {
        !self.group_member.is_disjoint(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn metadata() -> TaskMetadata {
        TaskMetadata::new(
            TaskId::from_ulid(Ulid::new()),
            TaskType::new("track_event"),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn membership_is_set_intersection() {
        let task = metadata().member_of([GroupTag::new("a"), GroupTag::new("b")]);

        let excluded: BTreeSet<_> = [GroupTag::new("b")].into();
        assert!(task.is_member_of_any(&excluded));

        let excluded: BTreeSet<_> = [GroupTag::new("c")].into();
        assert!(!task.is_member_of_any(&excluded));
        assert!(!task.is_member_of_any(&BTreeSet::new()));
    }

    #[test]
    fn ungrouped_metadata_omits_group_fields() {
        let value = serde_json::to_value(metadata()).unwrap();
        assert!(value.get("group_start").is_none());
        assert!(value.get("group_member").is_none());
        assert_eq!(value["task_type"], "track_event");
        assert_eq!(value["created_at"], "2024-01-01T12:00:00Z");
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let id = TaskId::from_ulid(Ulid::new());
        let json = format!(
            r#"{{"task_persisted_id":"{id}","task_type":"t","created_at":"2024-01-01T12:00:00Z","extra":1}}"#
        );

        let parsed: TaskMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.group_start, None);
        assert!(parsed.group_member.is_empty());
        assert_eq!(parsed.run_history.total_runs, 0);
    }

    #[test]
    fn group_helpers_namespace_their_tags() {
        assert_eq!(
            GroupTag::identified_profile("ann").as_str(),
            "identified_profile_ann"
        );
        assert_eq!(
            GroupTag::registered_push_token("tok").as_str(),
            "registered_push_token_tok"
        );
    }
}
