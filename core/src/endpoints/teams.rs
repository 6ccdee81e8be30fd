//! Team endpoints.

use super::{SearchPages, SearchPaginator};
use crate::client::{to_params, Client, Params};
use crate::error::ApiResult;
use crate::http::HttpMethod;
use crate::paginator::Paginator;
use crate::transport::Transport;
use crate::types::{NewTeam, Team, TeamSearch, TeamUpdate};

impl<T: Transport> Client<T> {
    pub async fn get_team(&self, id: u64) -> ApiResult<Team> {
        self.request(HttpMethod::Get, &format!("/team/{id}"), Params::new())
            .await
    }

    /// Page through teams matching `search`.
    pub fn list_teams(&self, search: &TeamSearch) -> ApiResult<SearchPaginator<'_, T, Team>> {
        let filters = to_params(search)?;
        Ok(Paginator::new(SearchPages::new(self, "/teams/search", filters)))
    }

    pub async fn create_team(&self, name: &str) -> ApiResult<Team> {
        let team = NewTeam {
            name: name.to_string(),
        };
        self.request(HttpMethod::Post, "/teams/new", to_params(&team)?)
            .await
    }

    pub async fn update_team(&self, id: u64, update: &TeamUpdate) -> ApiResult<Team> {
        self.request(HttpMethod::Patch, &format!("/team/{id}"), to_params(update)?)
            .await
    }

    pub async fn delete_team(&self, id: u64) -> ApiResult<()> {
        self.request_empty(HttpMethod::Delete, &format!("/team/{id}"), Params::new())
            .await
    }
}
