//! Common API utilities and shared types

use crate::models::ListParams;
use serde::Deserialize;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_per_page() -> u32 {
    10
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    /// Clamp into repository list parameters
    pub fn to_params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let query: PaginationQuery = serde_json::from_str("{}").expect("parse");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
    }

    #[test]
    fn test_to_params_clamps() {
        let query = PaginationQuery {
            page: 0,
            per_page: 5000,
        };
        let params = query.to_params();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }
}
