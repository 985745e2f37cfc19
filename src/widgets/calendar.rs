//! Calendar events and dated tasks

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Collection, Identified, Priority, split_list};
use crate::Result;
use crate::chat::next_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    Work,
    Personal,
    Meeting,
    Reminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Work,
    Personal,
    Shopping,
    Health,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    /// Minutes
    pub duration: u32,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub priority: Priority,
    pub category: EventCategory,
}

impl Identified for Event {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Editable event fields; `attendees` is a comma-separated list
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub duration: u32,
    pub location: Option<String>,
    pub attendees: String,
    pub priority: Priority,
    pub category: EventCategory,
}

impl EventDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start,
            duration: 60,
            location: None,
            attendees: String::new(),
            priority: Priority::default(),
            category: EventCategory::default(),
        }
    }

    fn into_event(self, id: String) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            start: self.start,
            duration: self.duration,
            location: self.location.filter(|l| !l.trim().is_empty()),
            attendees: split_list(&self.attendees),
            priority: self.priority,
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub priority: Priority,
    pub category: TaskCategory,
}

impl Identified for CalendarTask {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Calendar panel state
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    events: Collection<Event>,
    tasks: Collection<CalendarTask>,
}

impl Calendar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn events(&self) -> &Collection<Event> {
        &self.events
    }

    #[must_use]
    pub const fn tasks(&self) -> &Collection<CalendarTask> {
        &self.tasks
    }

    pub fn add_event(&mut self, draft: EventDraft) -> Event {
        let event = draft.into_event(next_id());
        self.events.insert(event.clone());
        event
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn update_event(&mut self, id: &str, draft: EventDraft) -> Result<()> {
        self.events.replace(draft.into_event(id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn delete_event(&mut self, id: &str) -> Result<Event> {
        self.events.remove(id)
    }

    pub fn add_task(
        &mut self,
        title: impl Into<String>,
        due_date: NaiveDate,
        priority: Priority,
        category: TaskCategory,
    ) -> CalendarTask {
        let task = CalendarTask {
            id: next_id(),
            title: title.into(),
            description: String::new(),
            due_date,
            completed: false,
            priority,
            category,
        };
        self.tasks.insert(task.clone());
        task
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn toggle_task(&mut self, id: &str) -> Result<&CalendarTask> {
        self.tasks.update(id, |task| task.completed = !task.completed)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn delete_task(&mut self, id: &str) -> Result<CalendarTask> {
        self.tasks.remove(id)
    }

    /// Events starting on `day`, earliest first
    #[must_use]
    pub fn events_on(&self, day: NaiveDate) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.start.date() == day)
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    /// Tasks due on `day`
    #[must_use]
    pub fn tasks_on(&self, day: NaiveDate) -> Vec<&CalendarTask> {
        self.tasks.iter().filter(|t| t.due_date == day).collect()
    }

    /// Whether anything is scheduled on `day`
    #[must_use]
    pub fn is_busy(&self, day: NaiveDate) -> bool {
        self.events.iter().any(|e| e.start.date() == day)
            || self.tasks.iter().any(|t| t.due_date == day)
    }
}
