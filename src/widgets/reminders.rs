//! Reminders
//!
//! Due times are local wall-clock times; views that compare against "now"
//! take it as an argument.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Identified, Priority, SortOrder, matches_query};
use crate::Result;
use crate::chat::next_id;

/// Upcoming view length
pub const UPCOMING_LIMIT: usize = 5;

/// Overdue view length
pub const OVERDUE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderCategory {
    Work,
    #[default]
    Personal,
    Health,
    Shopping,
    Bills,
    Appointments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    pub email: bool,
    pub push: bool,
    pub sound: bool,
    /// Minutes before the due time
    pub early: u32,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sound: true,
            early: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due: NaiveDateTime,
    pub priority: Priority,
    pub category: ReminderCategory,
    pub repeat: Repeat,
    pub notifications: Notifications,
    pub is_completed: bool,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Identified for Reminder {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct ReminderDraft {
    pub title: String,
    pub description: String,
    pub due: NaiveDateTime,
    pub priority: Priority,
    pub category: ReminderCategory,
    pub repeat: Repeat,
    pub notifications: Notifications,
}

impl ReminderDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, due: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due,
            priority: Priority::default(),
            category: ReminderCategory::default(),
            repeat: Repeat::default(),
            notifications: Notifications::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderSort {
    #[default]
    Date,
    Priority,
    Title,
}

/// View over the reminder list; archived reminders are never shown
#[derive(Debug, Clone, Default)]
pub struct ReminderFilter {
    pub category: Option<ReminderCategory>,
    pub priority: Option<Priority>,
    pub show_completed: bool,
    pub query: String,
    pub sort: ReminderSort,
    pub order: SortOrder,
}

/// Reminders panel state
#[derive(Debug, Clone, Default)]
pub struct Reminders {
    items: Collection<Reminder>,
}

impl Reminders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn items(&self) -> &Collection<Reminder> {
        &self.items
    }

    pub fn add(&mut self, draft: ReminderDraft) -> Reminder {
        let reminder = Reminder {
            id: next_id(),
            title: draft.title,
            description: draft.description,
            due: draft.due,
            priority: draft.priority,
            category: draft.category,
            repeat: draft.repeat,
            notifications: draft.notifications,
            is_completed: false,
            is_pinned: false,
            is_archived: false,
            created_at: Utc::now(),
        };
        tracing::debug!(id = %reminder.id, due = %reminder.due, "reminder added");
        self.items.insert(reminder.clone());
        reminder
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn update(&mut self, id: &str, draft: ReminderDraft) -> Result<&Reminder> {
        self.items.update(id, |r| {
            r.title = draft.title;
            r.description = draft.description;
            r.due = draft.due;
            r.priority = draft.priority;
            r.category = draft.category;
            r.repeat = draft.repeat;
            r.notifications = draft.notifications;
        })
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn delete(&mut self, id: &str) -> Result<Reminder> {
        self.items.remove(id)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn toggle_complete(&mut self, id: &str) -> Result<&Reminder> {
        self.items.update(id, |r| r.is_completed = !r.is_completed)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn toggle_pin(&mut self, id: &str) -> Result<&Reminder> {
        self.items.update(id, |r| r.is_pinned = !r.is_pinned)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn archive(&mut self, id: &str) -> Result<&Reminder> {
        self.items.update(id, |r| r.is_archived = true)
    }

    /// Visible reminders, filtered and sorted
    #[must_use]
    pub fn filter(&self, filter: &ReminderFilter) -> Vec<&Reminder> {
        let mut reminders: Vec<&Reminder> = self
            .items
            .iter()
            .filter(|r| !r.is_archived)
            .filter(|r| filter.show_completed || !r.is_completed)
            .filter(|r| filter.category.is_none_or(|c| r.category == c))
            .filter(|r| filter.priority.is_none_or(|p| r.priority == p))
            .filter(|r| matches_query(&filter.query, [r.title.as_str(), r.description.as_str()]))
            .collect();

        reminders.sort_by(|a, b| {
            let ordering = match filter.sort {
                ReminderSort::Date => a.due.cmp(&b.due),
                ReminderSort::Priority => a.priority.cmp(&b.priority),
                ReminderSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            };
            filter.order.apply(ordering)
        });
        reminders
    }

    /// Open reminders due after `now`, in filter order
    #[must_use]
    pub fn upcoming(&self, filter: &ReminderFilter, now: NaiveDateTime) -> Vec<&Reminder> {
        self.filter(filter)
            .into_iter()
            .filter(|r| !r.is_completed && r.due > now)
            .take(UPCOMING_LIMIT)
            .collect()
    }

    /// Open reminders already past due, in filter order
    #[must_use]
    pub fn overdue(&self, filter: &ReminderFilter, now: NaiveDateTime) -> Vec<&Reminder> {
        self.filter(filter)
            .into_iter()
            .filter(|r| !r.is_completed && r.due < now)
            .take(OVERDUE_LIMIT)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn draft(title: &str, hours: i64, priority: Priority) -> ReminderDraft {
        ReminderDraft {
            priority,
            ..ReminderDraft::new(title, base() + Duration::hours(hours))
        }
    }

    #[test]
    fn default_view_hides_completed_and_archived() {
        let mut reminders = Reminders::new();
        let done = reminders.add(draft("done", 1, Priority::Low));
        let archived = reminders.add(draft("archived", 2, Priority::Low));
        reminders.add(draft("open", 3, Priority::Low));

        reminders.toggle_complete(&done.id).unwrap();
        reminders.archive(&archived.id).unwrap();

        let titles: Vec<&str> = reminders
            .filter(&ReminderFilter::default())
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(titles, ["open"]);

        let with_done = ReminderFilter {
            show_completed: true,
            ..ReminderFilter::default()
        };
        assert_eq!(reminders.filter(&with_done).len(), 2);
    }

    #[test]
    fn sorts_by_date_then_priority() {
        let mut reminders = Reminders::new();
        reminders.add(draft("later", 5, Priority::Urgent));
        reminders.add(draft("sooner", 1, Priority::Low));
        reminders.add(draft("middle", 3, Priority::High));

        let by_date: Vec<&str> = reminders
            .filter(&ReminderFilter::default())
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(by_date, ["sooner", "middle", "later"]);

        let by_priority = ReminderFilter {
            sort: ReminderSort::Priority,
            order: SortOrder::Desc,
            ..ReminderFilter::default()
        };
        assert_eq!(reminders.filter(&by_priority)[0].priority, Priority::Urgent);
    }

    #[test]
    fn filter_by_category_and_priority() {
        let mut reminders = Reminders::new();
        reminders.add(ReminderDraft {
            category: ReminderCategory::Bills,
            ..draft("rent", 1, Priority::High)
        });
        reminders.add(draft("walk", 1, Priority::Low));

        let bills = ReminderFilter {
            category: Some(ReminderCategory::Bills),
            ..ReminderFilter::default()
        };
        assert_eq!(reminders.filter(&bills)[0].title, "rent");

        let low = ReminderFilter {
            priority: Some(Priority::Low),
            ..ReminderFilter::default()
        };
        assert_eq!(reminders.filter(&low)[0].title, "walk");
    }

    #[test]
    fn upcoming_and_overdue_are_capped() {
        let mut reminders = Reminders::new();
        for hour in 1..=7 {
            reminders.add(draft(&format!("future {hour}"), hour, Priority::Medium));
            reminders.add(draft(&format!("past {hour}"), -hour, Priority::Medium));
        }

        let filter = ReminderFilter::default();
        let upcoming = reminders.upcoming(&filter, base());
        assert_eq!(upcoming.len(), UPCOMING_LIMIT);
        assert_eq!(upcoming[0].title, "future 1");

        let overdue = reminders.overdue(&filter, base());
        assert_eq!(overdue.len(), OVERDUE_LIMIT);
        assert_eq!(overdue[0].title, "past 7");
    }

    #[test]
    fn pin_update_delete() {
        let mut reminders = Reminders::new();
        let created = reminders.add(draft("call", 1, Priority::Low));
        assert!(reminders.toggle_pin(&created.id).unwrap().is_pinned);

        let updated = reminders
            .update(&created.id, draft("call mom", 2, Priority::High))
            .unwrap();
        assert_eq!(updated.title, "call mom");
        assert!(updated.is_pinned);

        reminders.delete(&created.id).unwrap();
        assert!(reminders.items().is_empty());
    }
}
