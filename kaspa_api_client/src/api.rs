use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;

use crate::{
    config::KaspaApiConfig,
    data_objects::{AddressBalance, TransactionDetail, TransactionPage},
    KaspaApiError,
};

const USER_AGENT: &str = concat!("kaspa-payment-gateway/", env!("CARGO_PKG_VERSION"));

/// Read-only client for a Kaspa REST indexer.
///
/// The indexer requires the `kaspa:` prefix on the address path parameter; callers are expected
/// to pass normalized addresses (the engine's `KaspaAddress` type guarantees this).
#[derive(Clone)]
pub struct KaspaApi {
    config: KaspaApiConfig,
    client: Arc<Client>,
}

impl KaspaApi {
    pub fn new(config: KaspaApiConfig) -> Result<Self, KaspaApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| KaspaApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn get_query<T: DeserializeOwned>(&self, path: &str) -> Result<T, KaspaApiError> {
        let url = self.url(path);
        trace!("📡️ Sending indexer query: {url}");
        let response = self.client.get(url).send().await.map_err(|e| KaspaApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("📡️ Indexer query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| KaspaApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| KaspaApiError::RequestError(e.to_string()))?;
            Err(KaspaApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch the current total balance of an address, in sompi.
    pub async fn address_balance(&self, address: &str) -> Result<AddressBalance, KaspaApiError> {
        let path = format!("/addresses/{address}/balance");
        debug!("📡️ Fetching balance for {address}");
        let result = self.get_query::<AddressBalance>(&path).await?;
        debug!("📡️ Balance for {address}: {}", result.balance);
        Ok(result)
    }

    /// Fetch the full transaction history of an address.
    pub async fn address_transactions(&self, address: &str) -> Result<Vec<TransactionDetail>, KaspaApiError> {
        let path = format!("/addresses/{address}/full-transactions");
        debug!("📡️ Fetching transactions for {address}");
        let page = self.get_query::<TransactionPage>(&path).await?;
        let txs = page.into_transactions();
        debug!("📡️ {} transactions returned for {address}", txs.len());
        Ok(txs)
    }
}
