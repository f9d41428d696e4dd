// src/api/pagination.rs
//! Cursor pagination over Notion list endpoints.

use super::responses::PaginatedResponse;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;

/// Follows `next_cursor` until the endpoint reports no more results.
///
/// `fetch_fn` receives the page size and the cursor of the page to load.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_fn: F) -> Result<Vec<T>, AppError>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut all_items = Vec::new();
    let mut cursor = None;
    let mut pages_fetched = 0u32;

    loop {
        let response = fetch_fn(NOTION_API_PAGE_SIZE, cursor).await?;
        pages_fetched += 1;

        cursor = response.next_cursor;
        all_items.extend(response.results);

        if !response.has_more || cursor.is_none() {
            break;
        }
    }

    log::debug!(
        "fetched {} items over {} pages",
        all_items.len(),
        pages_fetched
    );
    Ok(all_items)
}

/// Query parameters for a paginated GET.
pub fn page_query(page_size: usize, cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![("page_size", page_size.to_string())];
    if let Some(cursor) = cursor {
        query.push(("start_cursor", cursor.to_string()));
    }
    query
}

/// JSON body for a paginated POST.
pub fn page_body(page_size: usize, cursor: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({ "page_size": page_size });
    if let Some(cursor) = cursor {
        body["start_cursor"] = serde_json::json!(cursor);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let calls = AtomicUsize::new(0);
        let items = fetch_all_pages(|page_size, cursor| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(page_size, 100);
                let (results, next) = match (call, cursor.as_deref()) {
                    (0, None) => (vec![1, 2], Some("c1".to_string())),
                    (1, Some("c1")) => (vec![3], None),
                    other => panic!("unexpected call {:?}", other),
                };
                Ok(PaginatedResponse {
                    object: "list".into(),
                    results,
                    has_more: next.is_some(),
                    next_cursor: next,
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn query_carries_cursor_only_when_present() {
        assert_eq!(page_query(100, None), vec![("page_size", "100".to_string())]);
        assert_eq!(page_body(50, Some("abc"))["start_cursor"], "abc");
    }
}
