// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Client-side task state, scoped to the signed-in identity.
//!
//! The store owns everything a client caches about tasks (current page, filters,
//! pagination, stats). All of it belongs to exactly one identity: switching
//! identity wipes it, and responses fetched for a previous identity are
//! refused.

use crate::{Pagination, Task, TaskListResponse, TaskPriority, TaskStats, TaskStatus};

/// Page size used by the task list view.
pub const CLIENT_PAGE_SIZE: i64 = 8;

/// Filters selected in the task list view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub is_urgent: Option<bool>,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientTaskStore {
    owner: Option<String>,
    filters: TaskFilters,
    page: i64,
    page_size: i64,
    tasks: Vec<Task>,
    pagination: Option<Pagination>,
    stats: Option<TaskStats>,
    stale: bool,
}

impl Default for ClientTaskStore {
    fn default() -> Self {
        Self::new(CLIENT_PAGE_SIZE)
    }
}

impl ClientTaskStore {
    pub fn new(page_size: i64) -> Self {
        Self {
            owner: None,
            filters: TaskFilters::default(),
            page: 1,
            page_size: page_size.max(1),
            tasks: Vec::new(),
            pagination: None,
            stats: None,
            stale: true,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn stats(&self) -> Option<&TaskStats> {
        self.stats.as_ref()
    }

    /// Whether the cached list no longer reflects the server and should be refetched.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Sets the signed-in identity (`None` on logout).
    ///
    /// Returns `true` when the identity changed, in which case every cached
    /// value has been dropped.
    pub fn switch_identity(&mut self, user_id: Option<&str>) -> bool {
        if self.owner.as_deref() == user_id {
            return false;
        }
        let page_size = self.page_size;
        *self = Self::new(page_size);
        self.owner = user_id.map(str::to_string);
        true
    }

    /// Replaces the filters and goes back to the first page.
    pub fn set_filters(&mut self, filters: TaskFilters) {
        if self.filters != filters {
            self.filters = filters;
            self.page = 1;
            self.stale = true;
        }
    }

    /// Moves to `page`, bounded by the last known page count.
    pub fn go_to_page(&mut self, page: i64) {
        let last = self.pagination.map(|p| p.pages.max(1)).unwrap_or(1);
        let page = page.clamp(1, last);
        if page != self.page {
            self.page = page;
            self.stale = true;
        }
    }

    /// Query pairs for `GET /api/tasks` reflecting the current page and filters.
    pub fn list_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        if let Some(status) = self.filters.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.filters.priority {
            query.push(("priority", priority.as_str().to_string()));
        }
        if let Some(is_urgent) = self.filters.is_urgent {
            query.push(("isUrgent", is_urgent.to_string()));
        }
        let search = self.filters.search.trim();
        if !search.is_empty() {
            query.push(("search", search.to_string()));
        }
        query
    }

    /// Stores a list response fetched on behalf of `owner`.
    ///
    /// Returns `false` (and changes nothing) if `owner` is not the current identity.
    pub fn apply_list(&mut self, owner: &str, response: TaskListResponse) -> bool {
        if !self.is_current(owner) {
            return false;
        }
        self.tasks = response.tasks;
        self.page = response.pagination.current;
        self.pagination = Some(response.pagination);
        self.stale = false;
        true
    }

    pub fn apply_stats(&mut self, owner: &str, stats: TaskStats) -> bool {
        if !self.is_current(owner) {
            return false;
        }
        self.stats = Some(stats);
        true
    }

    /// Reflects a created or updated task locally. The list and stats become stale.
    pub fn upsert_task(&mut self, owner: &str, task: Task) -> bool {
        if !self.is_current(owner) || task.user_id != owner {
            return false;
        }
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.insert(0, task),
        }
        self.stats = None;
        self.stale = true;
        true
    }

    /// Reflects a deleted task locally. The list and stats become stale.
    pub fn remove_task(&mut self, owner: &str, task_id: &str) -> bool {
        if !self.is_current(owner) {
            return false;
        }
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        self.stats = None;
        self.stale = true;
        true
    }

    fn is_current(&self, owner: &str) -> bool {
        self.owner.as_deref() == Some(owner)
    }
}
