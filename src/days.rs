//! Days-spent bookkeeping.
//!
//! Everything here is a pure function of a task and the current calendar
//! date. A completed task is frozen: its counter stays where it was when it
//! was completed. Reopening resumes counting from the task's creation date,
//! so the days spent while completed are counted again once it is reopened.

use chrono::NaiveDate;

use crate::task::{Task, TaskPatch};

/// Calendar days between `reference` and `today`, never negative.
pub fn days_spent(reference: NaiveDate, today: NaiveDate) -> u32 {
    if reference > today {
        return 0;
    }
    let days = today.signed_duration_since(reference).num_days();
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Patch that marks `task` complete and freezes its counter.
pub fn complete(task: &Task, today: NaiveDate) -> TaskPatch {
    TaskPatch {
        completed: Some(true),
        frozen: Some(true),
        days_spent: Some(days_spent(task.date, today)),
        completed_on: Some(Some(today)),
        ..TaskPatch::default()
    }
}

/// Patch that reopens `task`, counting again from its creation date.
pub fn reopen(task: &Task, today: NaiveDate) -> TaskPatch {
    TaskPatch {
        completed: Some(false),
        frozen: Some(false),
        days_spent: Some(days_spent(task.date, today)),
        completed_on: Some(None),
        ..TaskPatch::default()
    }
}

pub fn toggle(task: &Task, today: NaiveDate) -> TaskPatch {
    if task.completed {
        reopen(task, today)
    } else {
        complete(task, today)
    }
}

/// Moves an overdue open task forward to `today`.
///
/// Returns `None` when the task is completed, frozen, or already listed on or
/// after `today`.
pub fn rollover(task: &Task, today: NaiveDate) -> Option<TaskPatch> {
    if task.completed || task.frozen || task.display_date >= today {
        return None;
    }
    Some(TaskPatch {
        display_date: Some(today),
        days_spent: Some(days_spent(task.date, today)),
        ..TaskPatch::default()
    })
}
