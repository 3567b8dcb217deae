// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Largest page number accepted; keeps `(page - 1) * limit` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Raw query string of `GET /api/tasks`, exactly as the client sent it.
///
/// Everything is a string: numbers and booleans are parsed leniently by
/// [`TaskQuery::from_params`] so that a bad `page` falls back to a default
/// instead of rejecting the request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub is_urgent: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Columns a task list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Description,
    Status,
    Priority,
    IsUrgent,
    EstimatedHours,
    ActualHours,
    EfficiencyScore,
    DueDate,
}

impl SortField {
    /// Maps a wire field name (`"estimatedHours"`) to a sort field.
    pub fn from_wire(name: &str) -> Option<Self> {
        let field = match name {
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "description" => SortField::Description,
            "status" => SortField::Status,
            "priority" => SortField::Priority,
            "isUrgent" => SortField::IsUrgent,
            "estimatedHours" => SortField::EstimatedHours,
            "actualHours" => SortField::ActualHours,
            "efficiencyScore" => SortField::EfficiencyScore,
            "dueDate" => SortField::DueDate,
            _ => return None,
        };
        Some(field)
    }

    /// The `tasks` column backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Description => "description",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::IsUrgent => "is_urgent",
            SortField::EstimatedHours => "estimated_hours",
            SortField::ActualHours => "actual_hours",
            SortField::EfficiencyScore => "efficiency_score",
            SortField::DueDate => "due_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter, sort and page of a task list request, already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub is_urgent: Option<bool>,
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            is_urgent: None,
            search: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TaskQuery {
    pub fn from_params(params: &TaskListParams) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let positive = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 1)
        };

        let sort = non_empty(&params.sort)
            .and_then(|name| SortField::from_wire(&name))
            .unwrap_or_default();
        // Only an explicit "asc" sorts ascending.
        let order = match params.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        Self {
            status: non_empty(&params.status),
            priority: non_empty(&params.priority),
            is_urgent: non_empty(&params.is_urgent).map(|v| v == "true"),
            search: non_empty(&params.search),
            sort,
            order,
            page: positive(&params.page).unwrap_or(1).min(MAX_PAGE),
            limit: positive(&params.limit)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    /// Number of rows to skip for offset pagination.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Page metadata returned alongside a task list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            current,
            pages,
            total,
            has_next: current < pages,
            has_prev: current > 1,
        }
    }
}
