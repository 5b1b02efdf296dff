use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use streckcore::model::{CheckoutResponse, LeaderboardEntry, ScanResult, ScannedCode, TransactionRecord};
use streckcore::prelude::{ServiceError, ServiceResult, StreckService};

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    product_id: i64,
    user_id: &'a str,
    amount: u32,
}

/// Talks to a remote balance/stock service over JSON.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

fn transport(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Transport(format!("unexpected status {}", status)));
        }
        response.json::<T>().await.map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }
}

#[async_trait]
impl StreckService for HttpBackend {
    async fn resolve_scan(&self, code: &ScannedCode) -> ServiceResult<Option<ScanResult>> {
        let response = self
            .client
            .get(self.url(&format!("/scan/{}", code)))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("code {} not in directory", code);
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn checkout(
        &self,
        product_id: i64,
        user_id: &str,
        quantity: u32,
    ) -> ServiceResult<CheckoutResponse> {
        let response = self
            .client
            .post(self.url("/checkout"))
            .json(&CheckoutRequest {
                product_id,
                user_id,
                amount: quantity,
            })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    async fn fetch_latest_transactions(&self) -> ServiceResult<Vec<TransactionRecord>> {
        self.get("/transactions/latest").await
    }

    async fn fetch_leaderboard(&self) -> ServiceResult<Vec<LeaderboardEntry>> {
        self.get("/transactions/leaderboard").await
    }
}
