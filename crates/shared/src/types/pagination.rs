//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (0-indexed, matching the report pagination contract).
    #[serde(default)]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_size() -> u64 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_size(),
        }
    }
}

impl PageRequest {
    /// Calculates the offset for database queries.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page * self.size
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.size
    }

    /// Clamps nonsensical values to usable defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: self.page,
            size: if self.size == 0 { default_size() } else { self.size },
        }
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number (0-indexed).
    pub page: u64,
    /// Items per page.
    pub size: u64,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, page: u64, size: u64, total: u64) -> Self {
        let total_pages = if total == 0 { 0 } else { total.div_ceil(size.max(1)) };

        Self {
            data,
            meta: PageMeta {
                page,
                size,
                total,
                total_pages,
            },
        }
    }
}
