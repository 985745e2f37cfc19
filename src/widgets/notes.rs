//! Notes and tasks

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Identified, Priority, SortOrder, matches_query, split_list};
use crate::Result;
use crate::chat::next_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub color: Option<String>,
}

impl Identified for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Editable note fields; `tags` is a comma-separated list
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteSort {
    #[default]
    Date,
    Title,
}

/// View over the notes list; archived notes are never shown
#[derive(Debug, Clone)]
pub struct NoteFilter {
    /// `None` shows every category
    pub category: Option<String>,
    pub query: String,
    pub sort: NoteSort,
    pub order: SortOrder,
}

impl Default for NoteFilter {
    /// Newest first
    fn default() -> Self {
        Self {
            category: None,
            query: String::new(),
            sort: NoteSort::Date,
            order: SortOrder::Desc,
        }
    }
}

/// View over the task list
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub category: Option<String>,
    pub query: String,
    /// Sort by priority in this direction; `None` keeps insertion order
    pub priority_order: Option<SortOrder>,
}

/// Notes panel state
#[derive(Debug, Clone, Default)]
pub struct Notebook {
    notes: Collection<Note>,
    tasks: Collection<Task>,
}

impl Notebook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn notes(&self) -> &Collection<Note> {
        &self.notes
    }

    #[must_use]
    pub const fn tasks(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub fn add_note(&mut self, draft: NoteDraft) -> Note {
        let now = Utc::now();
        let note = Note {
            id: next_id(),
            title: draft.title,
            content: draft.content,
            category: draft.category,
            tags: split_list(&draft.tags),
            created_at: now,
            updated_at: now,
            is_pinned: false,
            is_archived: false,
            color: draft.color,
        };
        self.notes.insert(note.clone());
        note
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn update_note(&mut self, id: &str, draft: NoteDraft) -> Result<&Note> {
        self.notes.update(id, |note| {
            note.title = draft.title;
            note.content = draft.content;
            note.category = draft.category;
            note.tags = split_list(&draft.tags);
            note.color = draft.color;
            note.updated_at = Utc::now();
        })
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn delete_note(&mut self, id: &str) -> Result<Note> {
        self.notes.remove(id)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn toggle_pin(&mut self, id: &str) -> Result<&Note> {
        self.notes.update(id, |note| note.is_pinned = !note.is_pinned)
    }

    /// Hide a note from every view
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn archive(&mut self, id: &str) -> Result<&Note> {
        self.notes.update(id, |note| note.is_archived = true)
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Task {
        let task = Task {
            id: next_id(),
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority,
            due_date: draft.due_date,
            category: draft.category,
            created_at: Utc::now(),
        };
        self.tasks.insert(task.clone());
        task
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn toggle_task(&mut self, id: &str) -> Result<&Task> {
        self.tasks.update(id, |task| task.completed = !task.completed)
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        self.tasks.remove(id)
    }

    /// Visible notes, filtered and sorted
    #[must_use]
    pub fn filter_notes(&self, filter: &NoteFilter) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| !n.is_archived)
            .filter(|n| filter.category.as_ref().is_none_or(|c| &n.category == c))
            .filter(|n| {
                matches_query(
                    &filter.query,
                    [n.title.as_str(), n.content.as_str()]
                        .into_iter()
                        .chain(n.tags.iter().map(String::as_str)),
                )
            })
            .collect();

        notes.sort_by(|a, b| {
            let ordering = match filter.sort {
                NoteSort::Date => a.updated_at.cmp(&b.updated_at),
                NoteSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            };
            filter.order.apply(ordering)
        });
        notes
    }

    /// Tasks, filtered and optionally sorted by priority
    #[must_use]
    pub fn filter_tasks(&self, filter: &TaskFilter) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| filter.category.as_ref().is_none_or(|c| &t.category == c))
            .filter(|t| matches_query(&filter.query, [t.title.as_str(), t.description.as_str()]))
            .collect();

        if let Some(order) = filter.priority_order {
            tasks.sort_by(|a, b| order.apply(a.priority.cmp(&b.priority)));
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, category: &str, tags: &str) -> NoteDraft {
        NoteDraft {
            title: title.to_string(),
            content: format!("{title} body"),
            category: category.to_string(),
            tags: tags.to_string(),
            color: None,
        }
    }

    fn task(title: &str, priority: Priority) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            priority,
            category: "work".to_string(),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn add_note_splits_tags_and_prepends() {
        let mut book = Notebook::new();
        book.add_note(note("First", "work", ""));
        let second = book.add_note(note("Second", "ideas", "a, b ,"));
        assert_eq!(second.tags, vec!["a", "b"]);
        assert_eq!(book.notes().items()[0].id, second.id);
    }

    #[test]
    fn archived_notes_are_hidden() {
        let mut book = Notebook::new();
        let kept = book.add_note(note("Kept", "work", ""));
        let gone = book.add_note(note("Gone", "work", ""));
        book.archive(&gone.id).unwrap();

        let visible = book.filter_notes(&NoteFilter::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);
    }

    #[test]
    fn filter_by_category_and_tag_search() {
        let mut book = Notebook::new();
        book.add_note(note("Groceries", "personal", "shopping"));
        book.add_note(note("Roadmap", "work", "planning, q4"));

        let filter = NoteFilter {
            query: "Q4".to_string(),
            ..NoteFilter::default()
        };
        let found = book.filter_notes(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Roadmap");

        let filter = NoteFilter {
            category: Some("personal".to_string()),
            ..NoteFilter::default()
        };
        assert_eq!(book.filter_notes(&filter)[0].title, "Groceries");
    }

    #[test]
    fn sort_by_title() {
        let mut book = Notebook::new();
        book.add_note(note("beta", "work", ""));
        book.add_note(note("Alpha", "work", ""));
        book.add_note(note("gamma", "work", ""));

        let filter = NoteFilter {
            sort: NoteSort::Title,
            order: SortOrder::Asc,
            ..NoteFilter::default()
        };
        let titles: Vec<&str> = book.filter_notes(&filter).iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn update_and_pin_note() {
        let mut book = Notebook::new();
        let created = book.add_note(note("Draft", "work", ""));
        book.update_note(&created.id, note("Final", "work", "done")).unwrap();
        let pinned = book.toggle_pin(&created.id).unwrap();
        assert!(pinned.is_pinned);
        assert_eq!(pinned.title, "Final");
        assert!(pinned.updated_at >= created.updated_at);
        assert!(book.toggle_pin("missing").is_err());
    }

    #[test]
    fn tasks_toggle_and_sort_by_priority() {
        let mut book = Notebook::new();
        let low = book.add_task(task("low", Priority::Low));
        book.add_task(task("high", Priority::High));
        book.add_task(task("medium", Priority::Medium));

        assert!(book.toggle_task(&low.id).unwrap().completed);
        assert!(!book.toggle_task(&low.id).unwrap().completed);

        let filter = TaskFilter {
            priority_order: Some(SortOrder::Desc),
            ..TaskFilter::default()
        };
        let order: Vec<&str> = book.filter_tasks(&filter).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(order, ["high", "medium", "low"]);

        book.delete_task(&low.id).unwrap();
        assert_eq!(book.tasks().len(), 2);
    }
}
