//! Next-task selection for a run-loop pass.

use std::collections::{BTreeSet, HashSet};

use crate::domain::{GroupTag, TaskId, TaskMetadata};

/// Picks the next eligible task from an inventory snapshot.
///
/// Selection is a linear scan in inventory order. State accumulated during a
/// pass (groups whose starter failed, tasks already handed out) lives here and
/// is cleared by [`reset`](Self::reset) when the pass ends.
#[derive(Debug, Default)]
pub struct QueryRunner {
    excluded_groups: BTreeSet<GroupTag>,
    ran_this_pass: HashSet<TaskId>,
}

impl QueryRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_next_task(
        &mut self,
        inventory: &[TaskMetadata],
        last_ran: Option<&TaskMetadata>,
        last_failed: Option<&TaskMetadata>,
    ) -> Option<TaskMetadata> {
        if inventory.is_empty() {
            return None;
        }

        if let Some(last_ran) = last_ran {
            self.ran_this_pass.insert(last_ran.task_persisted_id);
        }
        if let Some(group) = last_failed.and_then(|task| task.group_start.as_ref()) {
            self.excluded_groups.insert(group.clone());
        }

        tasks_left_to_run(inventory, last_ran)
            .iter()
            .find(|task| {
                !self.ran_this_pass.contains(&task.task_persisted_id)
                    && !task.is_member_of_any(&self.excluded_groups)
            })
            .cloned()
    }

    pub fn reset(&mut self) {
        self.excluded_groups.clear();
        self.ran_this_pass.clear();
    }

    pub fn excluded_groups(&self) -> &BTreeSet<GroupTag> {
        &self.excluded_groups
    }
}

/// Tasks after `last_ran`, or the whole inventory when it is not in there.
fn tasks_left_to_run<'a>(
    inventory: &'a [TaskMetadata],
    last_ran: Option<&TaskMetadata>,
) -> &'a [TaskMetadata] {
    let position = last_ran.and_then(|last_ran| {
        inventory
            .iter()
            .position(|task| task.is_same_task(last_ran))
    });
    match position {
        Some(index) => &inventory[index + 1..],
        None => inventory,
    }
}
