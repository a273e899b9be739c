use chrono::{Days, NaiveDate};
use tracing::{error, info, warn};

use crate::{
    auth::{IdentityProvider, User},
    clock::Clock,
    days,
    store::{Subscription, TaskStore},
    task::Task,
    validate::{self, TaskForm},
};

/// Application state behind the terminal UI.
///
/// Every user action lands in one method here. Failures stop at that method:
/// they become `error`/`auth_error` for the screen or a log record.
pub struct Tracker {
    store: Box<dyn TaskStore>,
    identity: Box<dyn IdentityProvider>,
    clock: Box<dyn Clock>,
    user: Option<User>,
    subscription: Option<Subscription>,
    /// Day the last rollover pass ran on.
    rolled_on: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub title: String,
    pub description: String,
    pub selected_date: Option<NaiveDate>,
    pub selected_task: usize,
    pub error: Option<String>,
    pub auth_error: Option<String>,
}

impl Tracker {
    pub fn new(
        store: Box<dyn TaskStore>,
        identity: Box<dyn IdentityProvider>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let today = clock.today();
        Self {
            store,
            identity,
            clock,
            user: None,
            subscription: None,
            rolled_on: None,
            tasks: Vec::new(),
            title: String::new(),
            description: String::new(),
            selected_date: Some(today),
            selected_task: 0,
            error: None,
            auth_error: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> bool {
        let result = self.identity.sign_in(email, password);
        self.finish_auth(result.map_err(|e| e.to_string()))
    }

    pub fn register(&mut self, email: &str, password: &str) -> bool {
        let result = self.identity.register(email, password);
        self.finish_auth(result.map_err(|e| e.to_string()))
    }

    fn finish_auth(&mut self, result: Result<User, String>) -> bool {
        match result {
            Ok(user) => {
                self.auth_error = None;
                self.set_user(Some(user));
                true
            }
            Err(message) => {
                self.auth_error = Some(message);
                false
            }
        }
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = &self.user {
            if let Err(e) = self.identity.sign_out(user) {
                error!("Error signing out: {e}");
                return;
            }
        }
        self.set_user(None);
    }

    /// Switches the owner: the old subscription is dropped before the new
    /// one is opened.
    fn set_user(&mut self, user: Option<User>) {
        self.subscription = None;
        self.rolled_on = None;
        self.tasks.clear();
        self.selected_task = 0;
        self.error = None;
        self.user = user;

        let Some(user) = &self.user else {
            return;
        };
        match self.store.subscribe(&user.uid) {
            Ok(subscription) => {
                info!(uid = %user.uid, "Watching tasks");
                self.subscription = Some(subscription);
                self.refresh();
            }
            Err(e) => error!("Error subscribing to tasks: {e}"),
        }
    }

    /// Pulls the newest snapshot, if any, and rolls overdue open tasks
    /// forward to today. Without a new snapshot the held tasks are rolled
    /// once the date has moved past the last pass.
    pub fn refresh(&mut self) {
        if let Some(snapshot) = self.subscription.as_ref().and_then(Subscription::latest) {
            self.tasks = snapshot;
            self.roll_over();
        } else if self.rolled_on.is_some_and(|day| day < self.today()) {
            self.roll_over();
        }
        self.clamp_selection();
    }

    fn roll_over(&mut self) {
        let today = self.today();
        self.rolled_on = Some(today);
        for task in &mut self.tasks {
            let Some(patch) = days::rollover(task, today) else {
                continue;
            };
            match self.store.update(&task.id, &patch) {
                Ok(updated) => *task = updated,
                Err(e) => {
                    warn!(id = %task.id, "Error rolling task over: {e}");
                    task.apply(&patch);
                }
            }
        }
    }

    pub fn add_task(&mut self) {
        let form = TaskForm {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.selected_date,
        };
        let today = self.today();
        let new_task = match validate::validate(&form, self.user.as_ref(), today) {
            Ok(new_task) => new_task,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };

        match self.store.create(new_task, today) {
            Ok(task) => {
                info!(id = %task.id, "Added task");
                self.title.clear();
                self.description.clear();
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn toggle_task(&mut self, id: &str) {
        let Some(task) = self.tasks.iter().find(|t| t.id == id) else {
            warn!(id, "Toggle of unknown task");
            return;
        };
        let patch = days::toggle(task, self.today());

        if let Err(e) = self.store.update(id, &patch) {
            error!("Error updating task: {e}");
            return;
        }
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.apply(&patch);
        }
    }

    pub fn delete_task(&mut self, id: &str) {
        if let Err(e) = self.store.delete(id) {
            error!("Error deleting task: {e}");
            return;
        }
        self.tasks.retain(|task| task.id != id);
        self.clamp_selection();
    }

    pub fn set_selected_date(&mut self, date: Option<NaiveDate>) {
        self.selected_date = date;
        self.selected_task = 0;
    }

    /// Moves the selected date by `days`. With no date selected, starts from
    /// today.
    pub fn shift_selected_date(&mut self, days: i64) {
        let from = self.selected_date.unwrap_or_else(|| self.today());
        let step = Days::new(days.unsigned_abs());
        let to = if days >= 0 {
            from.checked_add_days(step)
        } else {
            from.checked_sub_days(step)
        };
        if let Some(to) = to {
            self.set_selected_date(Some(to));
        }
    }

    /// Tasks listed under the selected date. Empty when no date is selected.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let Some(date) = self.selected_date else {
            return Vec::new();
        };
        self.tasks
            .iter()
            .filter(|task| task.display_date == date)
            .collect()
    }

    pub fn selected(&self) -> Option<&Task> {
        self.visible_tasks().get(self.selected_task).copied()
    }

    pub fn select_next(&mut self) {
        if self.selected_task + 1 < self.visible_tasks().len() {
            self.selected_task += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_task = self.selected_task.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible_tasks().len();
        if self.selected_task >= visible {
            self.selected_task = visible.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        auth::LocalIdentity,
        clock::FixedClock,
        error::StoreError,
        store::DocumentStore,
        task::{NewTask, TaskPatch},
    };

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tracker() -> (Tracker, Rc<DocumentStore>, FixedClock) {
        let store = Rc::new(DocumentStore::in_memory());
        let clock = FixedClock::new(day(2024, 4, 10));
        let tracker = Tracker::new(
            Box::new(Rc::clone(&store)),
            Box::new(LocalIdentity::in_memory()),
            Box::new(clock.clone()),
        );
        (tracker, store, clock)
    }

    fn signed_in() -> (Tracker, Rc<DocumentStore>, FixedClock) {
        let (mut tracker, store, clock) = tracker();
        assert!(tracker.register("ann@example.com", "secret1"));
        (tracker, store, clock)
    }

    fn add(tracker: &mut Tracker, title: &str) {
        tracker.title = title.to_string();
        tracker.description = format!("{title} details");
        tracker.add_task();
        tracker.refresh();
    }

    /// Store whose writes always fail.
    struct BrokenStore(DocumentStore);

    impl TaskStore for BrokenStore {
        fn create(&self, _: NewTask, _: NaiveDate) -> Result<Task, StoreError> {
            Err(StoreError::NotFound("offline".to_string()))
        }

        fn update(&self, id: &str, _: &TaskPatch) -> Result<Task, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        fn delete(&self, id: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        fn subscribe(&self, owner: &str) -> Result<Subscription, StoreError> {
            self.0.subscribe(owner)
        }
    }

    #[test]
    fn starts_on_today_without_user() {
        let (tracker, _, _) = tracker();
        assert_eq!(tracker.selected_date, Some(day(2024, 4, 10)));
        assert!(tracker.user().is_none());
        assert!(tracker.visible_tasks().is_empty());
    }

    #[test]
    fn add_without_user_creates_nothing() {
        let (mut tracker, store, _) = tracker();
        tracker.title = "Title".to_string();
        tracker.description = "Description".to_string();
        tracker.add_task();

        assert_eq!(tracker.error.as_deref(), Some("User is not authenticated."));
        assert!(store.is_empty());
    }

    #[test]
    fn add_with_empty_title_creates_nothing() {
        let (mut tracker, store, _) = signed_in();
        tracker.description = "Description".to_string();
        tracker.add_task();

        assert_eq!(tracker.error.as_deref(), Some("Task title is required."));
        assert!(store.is_empty());
    }

    #[test]
    fn add_with_cleared_date_is_rejected() {
        let (mut tracker, store, _) = signed_in();
        tracker.set_selected_date(None);
        tracker.title = "Title".to_string();
        tracker.description = "Description".to_string();
        tracker.add_task();

        assert_eq!(
            tracker.error.as_deref(),
            Some("Please select a date for the task.")
        );
        assert!(store.is_empty());
    }

    #[test]
    fn successful_add_clears_form() {
        let (mut tracker, store, _) = signed_in();
        tracker.error = Some("stale".to_string());
        add(&mut tracker, "Write");

        assert!(tracker.title.is_empty());
        assert!(tracker.description.is_empty());
        assert!(tracker.error.is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(tracker.visible_tasks().len(), 1);
    }

    #[test]
    fn store_failure_is_shown_inline() {
        let identity = LocalIdentity::in_memory();
        let mut tracker = Tracker::new(
            Box::new(BrokenStore(DocumentStore::in_memory())),
            Box::new(identity),
            Box::new(FixedClock::new(day(2024, 4, 10))),
        );
        assert!(tracker.register("ann@example.com", "secret1"));
        tracker.title = "Title".to_string();
        tracker.description = "Description".to_string();
        tracker.add_task();

        assert_eq!(tracker.error.as_deref(), Some("No task with id offline"));
        assert_eq!(tracker.title, "Title");
    }

    #[test]
    fn failed_toggle_and_delete_leave_local_state() {
        let inner = DocumentStore::in_memory();
        let task = inner
            .create(
                NewTask {
                    title: "T".to_string(),
                    description: "D".to_string(),
                    date: day(2024, 4, 10),
                    user_id: "nobody".to_string(),
                },
                day(2024, 4, 10),
            )
            .unwrap();
        let mut tracker = Tracker::new(
            Box::new(BrokenStore(inner)),
            Box::new(LocalIdentity::in_memory()),
            Box::new(FixedClock::new(day(2024, 4, 10))),
        );
        tracker.tasks = vec![task.clone()];

        tracker.toggle_task(&task.id);
        tracker.delete_task(&task.id);

        assert_eq!(tracker.tasks, vec![task]);
        assert!(tracker.error.is_none());
    }

    #[test]
    fn delete_removes_exactly_one() {
        let (mut tracker, store, _) = signed_in();
        add(&mut tracker, "A");
        add(&mut tracker, "B");
        add(&mut tracker, "C");
        let ids: Vec<String> = tracker.tasks.iter().map(|t| t.id.clone()).collect();

        tracker.delete_task(&ids[1]);

        let left: Vec<&str> = tracker.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(left, vec![ids[0].as_str(), ids[2].as_str()]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn toggle_freezes_and_resumes() {
        let (mut tracker, _, clock) = signed_in();
        add(&mut tracker, "Long job");
        let id = tracker.tasks[0].id.clone();

        clock.advance(3);
        tracker.toggle_task(&id);
        let task = &tracker.tasks[0];
        assert!(task.completed);
        assert_eq!(task.days_spent, 3);

        clock.advance(4);
        tracker.refresh();
        assert_eq!(tracker.tasks[0].shown_days(tracker.today()), 3);

        tracker.toggle_task(&id);
        let task = &tracker.tasks[0];
        assert!(!task.completed);
        assert_eq!(task.days_spent, 7);
    }

    #[test]
    fn overdue_task_rolls_to_today() {
        let (mut tracker, store, clock) = signed_in();
        add(&mut tracker, "Overdue");
        let id = tracker.tasks[0].id.clone();

        clock.advance(2);
        tracker.set_selected_date(Some(tracker.today()));
        // Any store change for this owner delivers a new snapshot.
        add(&mut tracker, "Fresh");

        let task = store.get(&id).unwrap();
        assert_eq!(task.display_date, day(2024, 4, 12));
        assert_eq!(task.date, day(2024, 4, 10));
        assert_eq!(task.days_spent, 2);
        assert_eq!(tracker.visible_tasks().len(), 2);
    }

    #[test]
    fn overdue_task_rolls_over_in_running_session() {
        let (mut tracker, store, clock) = signed_in();
        add(&mut tracker, "Left open");
        let id = tracker.tasks[0].id.clone();

        clock.advance(1);
        tracker.refresh();
        tracker.set_selected_date(Some(tracker.today()));

        assert_eq!(tracker.visible_tasks().len(), 1);
        assert_eq!(tracker.tasks[0].display_date, day(2024, 4, 11));
        assert_eq!(tracker.tasks[0].days_spent, 1);
        assert_eq!(store.get(&id).unwrap().display_date, day(2024, 4, 11));

        // The write-back snapshot changes nothing further.
        tracker.refresh();
        assert_eq!(tracker.tasks[0].display_date, day(2024, 4, 11));
    }

    #[test]
    fn completed_task_stays_put_in_running_session() {
        let (mut tracker, store, clock) = signed_in();
        add(&mut tracker, "Done");
        let id = tracker.tasks[0].id.clone();
        tracker.toggle_task(&id);
        tracker.refresh();

        clock.advance(2);
        tracker.refresh();

        assert_eq!(store.get(&id).unwrap().display_date, day(2024, 4, 10));
        assert_eq!(tracker.tasks[0].shown_days(tracker.today()), 0);
    }

    #[test]
    fn visible_tasks_follow_selected_date() {
        let (mut tracker, _, _) = signed_in();
        tracker.set_selected_date(Some(day(2024, 4, 11)));
        add(&mut tracker, "Tomorrow");
        tracker.set_selected_date(Some(day(2024, 4, 10)));
        add(&mut tracker, "Today");

        assert_eq!(tracker.visible_tasks()[0].title, "Today");
        tracker.shift_selected_date(1);
        assert_eq!(tracker.visible_tasks()[0].title, "Tomorrow");
        tracker.set_selected_date(None);
        assert!(tracker.visible_tasks().is_empty());
    }

    #[test]
    fn sign_out_tears_down_subscription() {
        let (mut tracker, store, _) = signed_in();
        add(&mut tracker, "Mine");

        tracker.sign_out();
        assert!(tracker.user().is_none());
        assert!(tracker.tasks.is_empty());

        assert!(tracker.register("bob@example.com", "secret2"));
        assert!(tracker.tasks.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn bad_credentials_set_auth_error() {
        let (mut tracker, _, _) = tracker();
        assert!(!tracker.sign_in("ann@example.com", "nope123"));
        assert_eq!(
            tracker.auth_error.as_deref(),
            Some("Invalid email or password.")
        );
        assert!(tracker.user().is_none());
    }
}
