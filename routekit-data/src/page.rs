use crate::storage::Row;
use serde::Serialize;
use serde_json::Value;

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Row offset of the page, or `None` when it does not fit a signed
    /// 64-bit SQL integer.
    pub fn checked_offset(&self) -> Option<u64> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.per_page)
            .filter(|offset| *offset <= i64::MAX as u64)
    }

    /// Like [`checked_offset`](Self::checked_offset), clamped to `i64::MAX`.
    pub fn offset(&self) -> u64 {
        self.checked_offset().unwrap_or(i64::MAX as u64)
    }

    /// Highest page whose offset is addressable at `per_page` rows per page.
    pub fn max_page(per_page: u64) -> u64 {
        (i64::MAX as u64 / per_page.max(1)).saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultInfo {
    pub page: u64,
    pub per_page: u64,
    pub count: u64,
    pub total_count: u64,
}

/// The list response body:
/// `{ success, result, result_info: { page, per_page, count, total_count } }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult<T = Row> {
    pub success: bool,
    pub result: Vec<T>,
    pub result_info: ResultInfo,
}

impl<T> ListResult<T> {
    pub fn new(result: Vec<T>, pagination: Pagination, total_count: u64) -> Self {
        Self {
            success: true,
            result_info: ResultInfo {
                page: pagination.page,
                per_page: pagination.per_page,
                count: result.len() as u64,
                total_count,
            },
            result,
        }
    }

    pub fn total_pages(&self) -> u64 {
        let per_page = self.result_info.per_page;
        if per_page == 0 {
            0
        } else {
            self.result_info.total_count.div_ceil(per_page)
        }
    }
}

impl<T: Serialize> ListResult<T> {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offset_is_one_based() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 10).offset(), 20);
        assert_eq!(Pagination::new(u64::MAX, 10).checked_offset(), None);
        assert_eq!(Pagination::new(u64::MAX, 10).offset(), i64::MAX as u64);
        let last = Pagination::max_page(10);
        assert!(Pagination::new(last, 10).checked_offset().is_some());
        assert!(Pagination::new(last + 1, 10).checked_offset().is_none());
    }

    #[test]
    fn list_shape() {
        let list = ListResult::new(vec![json!({ "id": 1 })], Pagination::new(2, 1), 3);
        assert_eq!(
            list.to_value(),
            json!({
                "success": true,
                "result": [{ "id": 1 }],
                "result_info": { "page": 2, "per_page": 1, "count": 1, "total_count": 3 }
            })
        );
        assert_eq!(list.total_pages(), 3);
    }
}
