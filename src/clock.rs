use std::{cell::Cell, rc::Rc};

use chrono::{Local, NaiveDate};

/// Source of the current calendar date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable date. Clones share the same date.
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: Rc<Cell<NaiveDate>>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Rc::new(Cell::new(today)),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.today.set(today);
    }

    pub fn advance(&self, days: u64) {
        let next = self
            .today
            .get()
            .checked_add_days(chrono::Days::new(days))
            .unwrap_or(NaiveDate::MAX);
        self.today.set(next);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}
