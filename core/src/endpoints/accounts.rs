//! Account endpoints.

use serde::Deserialize;

use super::{SearchPages, SearchPaginator};
use crate::client::{to_params, Client, Params};
use crate::error::ApiResult;
use crate::http::HttpMethod;
use crate::paginator::Paginator;
use crate::transport::Transport;
use crate::types::{Account, AccountSearch, AccountUpdate, NewAccount};

#[derive(Deserialize)]
struct SignupStatus {
    signups_open: bool,
}

impl<T: Transport> Client<T> {
    /// Get an account by Discord id.
    pub async fn get_account(&self, id: u64) -> ApiResult<Account> {
        self.request(HttpMethod::Get, &format!("/account/{id}"), Params::new())
            .await
    }

    /// Page through accounts matching `search`.
    pub fn list_accounts(&self, search: &AccountSearch) -> ApiResult<SearchPaginator<'_, T, Account>> {
        let filters = to_params(search)?;
        Ok(Paginator::new(SearchPages::new(
            self,
            "/accounts/search",
            filters,
        )))
    }

    /// Check whether new accounts can currently sign up.
    pub async fn check_signups(&self) -> ApiResult<bool> {
        let status: SignupStatus = self
            .request(HttpMethod::Get, "/accounts/signups", Params::new())
            .await?;
        Ok(status.signups_open)
    }

    pub async fn create_account(&self, account: &NewAccount) -> ApiResult<Account> {
        self.request(HttpMethod::Post, "/accounts/new", to_params(account)?)
            .await
    }

    pub async fn update_account(&self, id: u64, update: &AccountUpdate) -> ApiResult<Account> {
        self.request(
            HttpMethod::Patch,
            &format!("/account/{id}"),
            to_params(update)?,
        )
        .await
    }

    pub async fn delete_account(&self, id: u64) -> ApiResult<()> {
        self.request_empty(HttpMethod::Delete, &format!("/account/{id}"), Params::new())
            .await
    }

    /// Give an existing award to an account.
    pub async fn give_award(&self, award_id: u64, account_id: u64) -> ApiResult<()> {
        self.request_empty(
            HttpMethod::Put,
            &format!("/account/{account_id}/award/{award_id}"),
            Params::new(),
        )
        .await
    }

    /// Take an award back from an account.
    pub async fn take_award(&self, award_id: u64, account_id: u64) -> ApiResult<()> {
        self.request_empty(
            HttpMethod::Delete,
            &format!("/account/{account_id}/award/{award_id}"),
            Params::new(),
        )
        .await
    }
}
