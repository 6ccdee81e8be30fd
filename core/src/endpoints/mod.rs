//! Endpoint wrappers, one module per resource.
//!
//! | Module | Paths |
//! |--------|-------|
//! | `accounts` | `/account/{id}`, `/accounts/*`, `/account/{id}/award/{award}` |
//! | `teams` | `/team/{id}`, `/teams/*` |
//! | `awards` | `/award/{id}`, `/awards/new` |
//! | `auth` | `/auth/*` |
//!
//! Each module adds methods to [`Client`]; the search endpoints hand back a
//! [`Paginator`] over a [`SearchPages`] source.

mod accounts;
mod auth;
mod awards;
mod teams;

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::client::{Client, Params};
use crate::error::ApiResult;
use crate::http::HttpMethod;
use crate::paginator::{Page, PageQuery, PageSource, Paginator};
use crate::transport::Transport;

/// Page source for a search endpoint: fixed filters plus the page query.
pub struct SearchPages<'a, T, I> {
    client: &'a Client<T>,
    path: &'static str,
    filters: Params,
    _item: PhantomData<fn() -> I>,
}

impl<'a, T, I> SearchPages<'a, T, I> {
    pub(crate) fn new(client: &'a Client<T>, path: &'static str, filters: Params) -> Self {
        Self {
            client,
            path,
            filters,
            _item: PhantomData,
        }
    }

    pub fn filters(&self) -> &Params {
        &self.filters
    }
}

#[async_trait]
impl<'a, T, I> PageSource for SearchPages<'a, T, I>
where
    T: Transport,
    I: DeserializeOwned + Send,
{
    type Item = I;

    async fn fetch_page(&self, query: PageQuery) -> ApiResult<Page<I>> {
        let mut params = self.filters.clone();
        params.extend(query.to_params());
        self.client.request(HttpMethod::Get, self.path, params).await
    }
}

/// Paginator over one of the search endpoints.
pub type SearchPaginator<'a, T, I> = Paginator<SearchPages<'a, T, I>>;
