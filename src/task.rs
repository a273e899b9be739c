use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::days;

/// A user-owned, dated to-do item.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Date the task was created for. Counting starts here.
    pub date: NaiveDate,
    /// Date the task is currently listed under; rolls forward while overdue.
    pub display_date: NaiveDate,
    pub completed: bool,
    pub days_spent: u32,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
    pub user_id: String,
}

impl Task {
    /// Days to show for this task on `today`. Frozen tasks keep their counter.
    pub fn shown_days(&self, today: NaiveDate) -> u32 {
        if self.frozen {
            self.days_spent
        } else {
            days::days_spent(self.date, today)
        }
    }

    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(frozen) = patch.frozen {
            self.frozen = frozen;
        }
        if let Some(days_spent) = patch.days_spent {
            self.days_spent = days_spent;
        }
        if let Some(display_date) = patch.display_date {
            self.display_date = display_date;
        }
        if let Some(completed_on) = patch.completed_on {
            self.completed_on = completed_on;
        }
    }
}

/// A validated task waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub user_id: String,
}

/// Partial update of a stored task. `None` leaves a field untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskPatch {
    pub completed: Option<bool>,
    pub frozen: Option<bool>,
    pub days_spent: Option<u32>,
    pub display_date: Option<NaiveDate>,
    pub completed_on: Option<Option<NaiveDate>>,
}
