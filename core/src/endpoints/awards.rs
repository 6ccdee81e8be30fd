//! Award endpoints. Giving and taking awards lives with the account
//! endpoints since those paths hang off `/account/{id}`.

use crate::client::{to_params, Client, Params};
use crate::error::ApiResult;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::{Award, AwardUpdate, ExtendedAward, NewAward};

impl<T: Transport> Client<T> {
    /// Get an award along with the accounts holding it.
    pub async fn get_award(&self, id: u64) -> ApiResult<ExtendedAward> {
        self.request(HttpMethod::Get, &format!("/award/{id}"), Params::new())
            .await
    }

    pub async fn create_award(&self, award: &NewAward) -> ApiResult<Award> {
        self.request(HttpMethod::Post, "/awards/new", to_params(award)?)
            .await
    }

    pub async fn update_award(&self, id: u64, update: &AwardUpdate) -> ApiResult<Award> {
        self.request(HttpMethod::Patch, &format!("/award/{id}"), to_params(update)?)
            .await
    }

    pub async fn delete_award(&self, id: u64) -> ApiResult<()> {
        self.request_empty(HttpMethod::Delete, &format!("/award/{id}"), Params::new())
            .await
    }
}
