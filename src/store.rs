//! Task persistence.
//!
//! [`TaskStore`] is the narrow document-store surface the tracker talks to:
//! create, update by id, delete by id, and a live subscription to one
//! owner's tasks. [`DocumentStore`] implements it in memory or on top of a
//! JSON file that is rewritten after every mutation.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    rc::{Rc, Weak},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
};

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    days,
    error::StoreError,
    task::{NewTask, Task, TaskPatch},
};

pub trait TaskStore {
    fn create(&self, task: NewTask, today: NaiveDate) -> Result<Task, StoreError>;

    /// Fails with [`StoreError::NotFound`] when `id` does not exist.
    fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError>;

    /// Deleting an id that does not exist succeeds.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Live snapshots of every task owned by `owner`, starting with the
    /// current one.
    fn subscribe(&self, owner: &str) -> Result<Subscription, StoreError>;
}

impl<T: TaskStore + ?Sized> TaskStore for Rc<T> {
    fn create(&self, task: NewTask, today: NaiveDate) -> Result<Task, StoreError> {
        (**self).create(task, today)
    }

    fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn subscribe(&self, owner: &str) -> Result<Subscription, StoreError> {
        (**self).subscribe(owner)
    }
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    entries: BTreeMap<u64, Subscriber>,
}

#[derive(Debug)]
struct Subscriber {
    owner: String,
    sender: Sender<Vec<Task>>,
}

/// Receiving end of an owner-filtered task feed. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    owner: String,
    receiver: Receiver<Vec<Task>>,
    subscribers: Weak<RefCell<Subscribers>>,
}

impl Subscription {
    /// Newest pending snapshot, skipping older ones. `None` when nothing new
    /// arrived since the last call.
    pub fn latest(&self) -> Option<Vec<Task>> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.borrow_mut().entries.remove(&self.id);
            debug!(owner = %self.owner, id = self.id, "Unsubscribed");
        }
    }
}

#[derive(Debug)]
pub struct DocumentStore {
    path: Option<PathBuf>,
    tasks: RefCell<BTreeMap<String, Task>>,
    subscribers: Rc<RefCell<Subscribers>>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tasks: RefCell::new(BTreeMap::new()),
            subscribers: Rc::default(),
        }
    }

    /// Opens the store backed by `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks = load_tasks(&path)?;
        info!(path = %path.display(), count = tasks.len(), "Opened task store");
        Ok(Self {
            path: Some(path),
            tasks: RefCell::new(tasks),
            subscribers: Rc::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.borrow().get(id).cloned()
    }

    fn snapshot(&self, owner: &str) -> Vec<Task> {
        self.tasks
            .borrow()
            .values()
            .filter(|task| task.user_id == owner)
            .cloned()
            .collect()
    }

    /// Persists `next` and then makes it the current state, so a failed write
    /// leaves the store untouched.
    fn commit(&self, next: BTreeMap<String, Task>) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            save_tasks(path, &next)?;
        }
        *self.tasks.borrow_mut() = next;
        Ok(())
    }

    fn notify(&self, owner: &str) {
        let snapshot = self.snapshot(owner);
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.entries.retain(|id, subscriber| {
            if subscriber.owner != owner {
                return true;
            }
            let delivered = subscriber.sender.send(snapshot.clone()).is_ok();
            if !delivered {
                debug!(id, "Dropping closed subscriber");
            }
            delivered
        });
    }
}

impl TaskStore for DocumentStore {
    fn create(&self, task: NewTask, today: NaiveDate) -> Result<Task, StoreError> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            days_spent: days::days_spent(task.date, today),
            title: task.title,
            description: task.description,
            date: task.date,
            display_date: task.date,
            completed: false,
            frozen: false,
            completed_on: None,
            user_id: task.user_id,
        };

        let mut next = self.tasks.borrow().clone();
        next.insert(task.id.clone(), task.clone());
        self.commit(next)?;

        debug!(id = %task.id, owner = %task.user_id, "Created task");
        self.notify(&task.user_id);
        Ok(task)
    }

    fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut next = self.tasks.borrow().clone();
        let task = next
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.apply(patch);
        let updated = task.clone();
        self.commit(next)?;

        debug!(id, "Updated task");
        self.notify(&updated.user_id);
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut next = self.tasks.borrow().clone();
        let Some(removed) = next.remove(id) else {
            debug!(id, "Delete of unknown task ignored");
            return Ok(());
        };
        self.commit(next)?;

        debug!(id, "Deleted task");
        self.notify(&removed.user_id);
        Ok(())
    }

    fn subscribe(&self, owner: &str) -> Result<Subscription, StoreError> {
        let (sender, receiver) = mpsc::channel();
        // The receiver is alive until the end of this call.
        let _ = sender.send(self.snapshot(owner));

        let mut subscribers = self.subscribers.borrow_mut();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.entries.insert(
            id,
            Subscriber {
                owner: owner.to_string(),
                sender,
            },
        );
        debug!(owner, id, "Subscribed");

        Ok(Subscription {
            id,
            owner: owner.to_string(),
            receiver,
            subscribers: Rc::downgrade(&self.subscribers),
        })
    }
}

fn load_tasks(path: &Path) -> Result<BTreeMap<String, Task>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if data.trim().is_empty() {
        warn!(path = %path.display(), "Task file is empty");
        return Ok(BTreeMap::new());
    }
    let tasks: Vec<Task> = serde_json::from_str(&data)?;
    Ok(tasks.into_iter().map(|task| (task.id.clone(), task)).collect())
}

fn save_tasks(path: &Path, tasks: &BTreeMap<String, Task>) -> Result<(), StoreError> {
    let tasks: Vec<&Task> = tasks.values().collect();
    let data = serde_json::to_string_pretty(&tasks)?;
    fs::write(path, data).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
