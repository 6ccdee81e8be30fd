//! Sequential page pulls over the API's search endpoints.
//!
//! A `Paginator` owns a zero-based cursor and a `PageSource`. Each
//! `next_page` asks the source for the page under the cursor and advances
//! the cursor once the fetch has succeeded, so a failed fetch is retried at
//! the same page by the next call. Past the last page the API answers with
//! an empty `data` list, which comes back as an empty `Vec`.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::Params;
use crate::error::ApiResult;

/// Which page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageQuery {
    pub page: u32,
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// Wire parameters: `page` and, when set, `per_page`.
    pub fn to_params(self) -> Params {
        let mut params = Params::new();
        params.insert("page".to_string(), Value::from(self.page));
        if let Some(per_page) = self.per_page {
            params.insert("per_page".to_string(), Value::from(per_page));
        }
        params
    }
}

/// One page of a paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "page")]
    pub page_number: u32,
    pub per_page: u32,
    #[serde(rename = "pages")]
    pub total_pages: u32,
    #[serde(rename = "results")]
    pub total_results: u32,
    #[serde(rename = "data")]
    pub items: Vec<T>,
}

/// Something that can fetch a numbered page.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, query: PageQuery) -> ApiResult<Page<Self::Item>>;
}

/// Adapts an async closure into a `PageSource`.
pub struct FnSource<F>(F);

#[async_trait]
impl<F, Fut, T> PageSource for FnSource<F>
where
    F: Fn(PageQuery) -> Fut + Send + Sync,
    Fut: Future<Output = ApiResult<Page<T>>> + Send,
    T: Send,
{
    type Item = T;

    async fn fetch_page(&self, query: PageQuery) -> ApiResult<Page<T>> {
        (self.0)(query).await
    }
}

/// Lazily walks pages of a `PageSource`, starting at page 0.
#[derive(Debug)]
pub struct Paginator<S> {
    source: S,
    cursor: u32,
    per_page: Option<u32>,
}

impl<F> Paginator<FnSource<F>> {
    pub fn from_fn<Fut, T>(fetch: F) -> Self
    where
        F: Fn(PageQuery) -> Fut + Send + Sync,
        Fut: Future<Output = ApiResult<Page<T>>> + Send,
        T: Send,
    {
        Self::new(FnSource(fetch))
    }
}

impl<S> Paginator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cursor: 0,
            per_page: None,
        }
    }

    /// Ask for `per_page` items per page instead of the server default.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// The page the next `next_page` call will request.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Start again from page 0.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: PageSource> Paginator<S> {
    /// Fetch the page under the cursor and return its items.
    pub async fn next_page(&mut self) -> ApiResult<Vec<S::Item>> {
        let query = PageQuery {
            page: self.cursor,
            per_page: self.per_page,
        };
        debug!(page = query.page, per_page = ?query.per_page, "fetching page");
        let page = self.source.fetch_page(query).await?;
        self.cursor += 1;
        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ApiError;

    fn page(number: u32, items: Vec<&'static str>) -> Page<&'static str> {
        Page {
            page_number: number,
            per_page: 2,
            total_pages: 1,
            total_results: 2,
            items,
        }
    }

    #[tokio::test]
    async fn walks_pages_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let mut paginator = Paginator::from_fn(move |query: PageQuery| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(query);
                Ok(match query.page {
                    0 => page(0, vec!["a", "b"]),
                    n => page(n, vec![]),
                })
            }
        });

        assert_eq!(paginator.cursor(), 0);
        assert_eq!(paginator.next_page().await.unwrap(), vec!["a", "b"]);
        assert_eq!(paginator.cursor(), 1);
        assert!(paginator.next_page().await.unwrap().is_empty());
        assert_eq!(paginator.cursor(), 2);

        let pages: Vec<u32> = calls.lock().unwrap().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![0, 1]);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_cursor() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let seen = attempts.clone();
        let mut paginator = Paginator::from_fn(move |query: PageQuery| {
            let seen = seen.clone();
            async move {
                let attempt = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(query.page);
                    seen.len()
                };
                if attempt == 2 {
                    Err(ApiError::Server { code: 503 })
                } else {
                    Ok(page(query.page, vec!["x"]))
                }
            }
        });

        paginator.next_page().await.unwrap();
        let err = paginator.next_page().await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(paginator.cursor(), 1);
        paginator.next_page().await.unwrap();
        assert_eq!(paginator.cursor(), 2);

        assert_eq!(*attempts.lock().unwrap(), vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn per_page_and_reset() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let mut paginator = Paginator::from_fn(move |query: PageQuery| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(query);
                Ok(page(query.page, vec![]))
            }
        })
        .with_per_page(5);

        paginator.next_page().await.unwrap();
        paginator.reset();
        paginator.next_page().await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], PageQuery { page: 0, per_page: Some(5) });
        assert_eq!(calls[1], PageQuery { page: 0, per_page: Some(5) });
    }

    #[test]
    fn page_query_params() {
        let params = PageQuery { page: 3, per_page: None }.to_params();
        assert_eq!(Value::Object(params), serde_json::json!({"page": 3}));

        let params = PageQuery { page: 0, per_page: Some(10) }.to_params();
        assert_eq!(
            Value::Object(params),
            serde_json::json!({"page": 0, "per_page": 10})
        );
    }

    #[test]
    fn page_uses_wire_names() {
        let page: Page<u32> = serde_json::from_str(
            r#"{"page":1,"per_page":20,"pages":4,"results":70,"data":[7,8]}"#,
        )
        .unwrap();
        assert_eq!(page.page_number, 1);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.total_results, 70);
        assert_eq!(page.items, vec![7, 8]);
    }
}
