use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Envelope shared by every JSON response, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Raw pagination parameters. Kept as strings so that garbage values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page size, 1..=100
    pub limit: Option<String>,
    /// Rows to skip, >= 0
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const MAX_LIMIT: i64 = 100;
    pub const CONVERSATIONS_DEFAULT: i64 = 20;
    pub const MESSAGES_DEFAULT: i64 = 50;
    pub const NOTIFICATIONS_DEFAULT: i64 = 20;

    pub fn new(limit: i64, offset: i64, default_limit: i64) -> Self {
        let limit = if limit <= 0 || limit > Self::MAX_LIMIT {
            default_limit
        } else {
            limit
        };

        Self {
            limit,
            offset: offset.max(0),
        }
    }

    pub fn from_query(query: &PageQuery, default_limit: i64) -> Self {
        let limit = query
            .limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default_limit);
        let offset = query
            .offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Self::new(limit, offset, default_limit)
    }

    /// One extra row tells us whether another page exists.
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PageMeta {
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub next_offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with `request.fetch_limit()`.
    pub fn from_overfetch(mut rows: Vec<T>, request: PageRequest) -> Self {
        let has_more = rows.len() as i64 > request.limit;
        if has_more {
            rows.truncate(request.limit as usize);
        }

        Self {
            items: rows,
            meta: PageMeta {
                limit: request.limit,
                offset: request.offset,
                has_more,
                next_offset: has_more.then(|| request.offset.saturating_add(request.limit)),
            },
        }
    }

    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>) -> PageQuery {
        PageQuery {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
        }
    }

    #[test]
    fn test_limit_falls_back_to_default_when_out_of_range() {
        let req = PageRequest::from_query(&query(Some("0"), None), 20);
        assert_eq!(req.limit, 20);

        let req = PageRequest::from_query(&query(Some("101"), None), 50);
        assert_eq!(req.limit, 50);

        let req = PageRequest::from_query(&query(Some("-3"), None), 20);
        assert_eq!(req.limit, 20);

        let req = PageRequest::from_query(&query(Some("100"), None), 20);
        assert_eq!(req.limit, 100);
    }

    #[test]
    fn test_unparsable_values_use_defaults() {
        let req = PageRequest::from_query(&query(Some("lots"), Some("soon")), 50);
        assert_eq!(req, PageRequest { limit: 50, offset: 0 });
    }

    #[test]
    fn test_negative_offset_is_clamped() {
        let req = PageRequest::from_query(&query(Some("10"), Some("-5")), 20);
        assert_eq!(req, PageRequest { limit: 10, offset: 0 });
    }

    #[test]
    fn test_exact_page_has_no_more() {
        let req = PageRequest::new(2, 0, 50);
        let page = Page::from_overfetch(vec![1, 2], req);
        assert_eq!(page.items, vec![1, 2]);
        assert!(!page.meta.has_more);
        assert_eq!(page.meta.next_offset, None);
    }

    #[test]
    fn test_overfetched_row_is_trimmed() {
        let req = PageRequest::new(2, 4, 50);
        let page = Page::from_overfetch(vec![1, 2, 3], req);
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.meta.has_more);
        assert_eq!(page.meta.next_offset, Some(6));
    }

    #[test]
    fn test_huge_offset_does_not_overflow() {
        let req = PageRequest::from_query(&query(Some("20"), Some("9223372036854775807")), 20);
        assert_eq!(req.offset, i64::MAX);

        let page = Page::<i32>::from_overfetch(vec![], req);
        assert!(!page.meta.has_more);

        let req = PageRequest::new(2, i64::MAX, 20);
        let page = Page::from_overfetch(vec![1, 2, 3], req);
        assert!(page.meta.has_more);
        assert_eq!(page.meta.next_offset, Some(i64::MAX));
    }

    #[test]
    fn test_success_envelope_serializes_data() {
        let json = serde_json::to_value(ApiResponse::success("ok", vec![1])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0], 1);

        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert!(json.get("data").is_none());
    }
}
