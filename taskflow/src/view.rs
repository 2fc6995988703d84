//! Presentation helpers: search, status filter, sort, drag-reorder and
//! dashboard counters. Everything here is pure and works on slices.

use taskflow_proto::todo::{Todo, TodoId};

/// Which todos to show by completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFilter {
    /// Everything.
    #[default]
    All,
    /// Not completed.
    Active,
    /// Completed.
    Completed,
}

impl StatusFilter {
    /// Whether `todo` passes this filter.
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// Sort key for the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortBy {
    /// Newest first by creation time.
    #[default]
    Date,
    /// Highest priority first.
    Priority,
}

/// Search text, status filter and sort key, as chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub search: String,
    pub status: StatusFilter,
    pub sort: SortBy,
}

/// Case-insensitive substring match against title or description.
///
/// An empty query matches everything.
#[must_use]
pub fn matches_search(todo: &Todo, query: &str) -> bool {
    let query = query.to_lowercase();
    todo.title.to_lowercase().contains(&query)
        || todo
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
}

/// Filters and sorts `todos` for display.
///
/// The sort is stable, so ties keep the order of the input.
#[must_use]
pub fn apply(todos: &[Todo], options: &ViewOptions) -> Vec<Todo> {
    let mut shown: Vec<Todo> = todos
        .iter()
        .filter(|t| matches_search(t, &options.search) && options.status.matches(t))
        .cloned()
        .collect();

    match options.sort {
        SortBy::Date => shown.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortBy::Priority => shown.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank())),
    }
    shown
}

/// Moves `active` to the index currently held by `over`.
///
/// Returns `None` when the ids are equal or either is missing, in which
/// case no reorder should be submitted.
#[must_use]
pub fn move_item(todos: &[Todo], active: &TodoId, over: &TodoId) -> Option<Vec<Todo>> {
    if active == over {
        return None;
    }
    let from = todos.iter().position(|t| t.id == *active)?;
    let to = todos.iter().position(|t| t.id == *over)?;

    let mut reordered = todos.to_vec();
    let item = reordered.remove(from);
    reordered.insert(to, item);
    Some(reordered)
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Stats {
    /// Counts `todos`.
    #[must_use]
    pub fn of(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total: todos.len(),
            active: todos.len() - completed,
            completed,
        }
    }
}
