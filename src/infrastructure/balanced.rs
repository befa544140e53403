use crate::config::Config;
use crate::domain::ports::PaymentGateway;
use crate::domain::remote::{
    Marketplace, NewRemoteAccount, NewRemoteBankAccount, NewRemoteCredit, NewRemoteDebit,
    NewRemoteRefund, RemoteAccount, RemoteBankAccount, RemoteCard, RemoteCredit, RemoteDebit,
    RemoteRefund,
};
use crate::domain::resource::ResourceUri;
use crate::error::{RemoteError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use surf::http::Method;

const MARKETPLACES_URI: &str = "/v1/marketplaces";
const BANK_ACCOUNTS_URI: &str = "/v1/bank_accounts";

/// One page of a collection.
#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    next_uri: Option<String>,
}

/// Collection URIs advertised by the marketplace resource.
#[derive(Debug, Deserialize)]
struct MarketplaceLinks {
    #[serde(flatten)]
    marketplace: Marketplace,
    accounts_uri: String,
    bank_accounts_uri: String,
    cards_uri: String,
    credits_uri: String,
    debits_uri: String,
}

#[derive(Debug, Deserialize)]
struct BankAccountLinks {
    credits_uri: String,
}

#[derive(Debug, Deserialize)]
struct AccountLinks {
    debits_uri: String,
}

#[derive(Debug, Deserialize)]
struct DebitLinks {
    refunds_uri: String,
}

#[derive(Debug, Serialize)]
struct AddCard<'a> {
    card_uri: &'a ResourceUri,
}

#[derive(Debug, Serialize)]
struct Invalidate {
    is_valid: bool,
}

/// HTTP client for the hosted payments API.
///
/// Authenticates with the API key as the Basic-auth username. Resources are
/// addressed by the URIs the API hands out; collection URIs are discovered
/// from the marketplace and parent resources.
#[derive(Clone)]
pub struct BalancedClient {
    client: surf::Client,
    api_url: String,
    authorization: Option<String>,
}

impl BalancedClient {
    pub fn new(config: &Config) -> Self {
        let authorization = config
            .api_key
            .as_ref()
            .map(|key| format!("Basic {}", STANDARD.encode(format!("{}:", key))));
        Self {
            client: surf::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            authorization,
        }
    }

    fn url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}{}", self.api_url, uri)
        }
    }

    async fn send<T, B>(&self, method: Method, uri: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync,
    {
        let url = self.url(uri);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url.as_str())
            .header("Accept", "application/json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization.as_str());
        }
        if let Some(body) = body {
            request = request.body_json(body).map_err(transport_error)?;
        }

        let mut response = request.await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.body_string().await.unwrap_or_default();
            let error = serde_json::from_str::<RemoteError>(&text).unwrap_or_else(|_| {
                RemoteError::new(u16::from(status), "http", status.canonical_reason())
            });
            return Err(error.into());
        }
        if status == surf::StatusCode::NoContent {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(response.body_json::<T>().await.map_err(transport_error)?)
    }

    async fn get<T: DeserializeOwned + Send>(&self, uri: &str) -> Result<T> {
        self.send::<T, ()>(Method::Get, uri, None).await
    }

    async fn post<T: DeserializeOwned + Send, B: Serialize + Sync>(&self, uri: &str, body: &B) -> Result<T> {
        self.send(Method::Post, uri, Some(body)).await
    }

    async fn put<T: DeserializeOwned + Send, B: Serialize + Sync>(&self, uri: &str, body: &B) -> Result<T> {
        self.send(Method::Put, uri, Some(body)).await
    }

    /// Follows `next_uri` until the collection is exhausted.
    async fn list<T: DeserializeOwned + Send>(&self, uri: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(uri.to_string());
        while let Some(uri) = next {
            let page: Page<T> = self.get(&uri).await?;
            items.extend(page.items);
            next = page.next_uri;
        }
        Ok(items)
    }

    async fn marketplace_links(&self) -> Result<MarketplaceLinks> {
        let page: Page<MarketplaceLinks> = self.get(MARKETPLACES_URI).await?;
        page.items.into_iter().next().ok_or_else(|| {
            RemoteError::new(404, "marketplace-not-found", "No marketplace is owned by this API key").into()
        })
    }
}

fn transport_error(err: surf::Error) -> RemoteError {
    RemoteError::new(u16::from(err.status()), "transport", err.to_string())
}

#[async_trait]
impl PaymentGateway for BalancedClient {
    async fn marketplace(&self) -> Result<Marketplace> {
        Ok(self.marketplace_links().await?.marketplace)
    }

    async fn create_account(&self, account: NewRemoteAccount) -> Result<RemoteAccount> {
        let links = self.marketplace_links().await?;
        self.post(&links.accounts_uri, &account).await
    }

    async fn fetch_account(&self, uri: &ResourceUri) -> Result<RemoteAccount> {
        self.get(uri.as_str()).await
    }

    async fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        let links = self.marketplace_links().await?;
        self.list(&links.accounts_uri).await
    }

    async fn add_card(&self, account: &ResourceUri, card: &ResourceUri) -> Result<RemoteAccount> {
        self.put(account.as_str(), &AddCard { card_uri: card }).await
    }

    async fn create_bank_account(&self, bank_account: NewRemoteBankAccount) -> Result<RemoteBankAccount> {
        self.post(BANK_ACCOUNTS_URI, &bank_account).await
    }

    async fn fetch_bank_account(&self, uri: &ResourceUri) -> Result<RemoteBankAccount> {
        self.get(uri.as_str()).await
    }

    async fn list_bank_accounts(&self) -> Result<Vec<RemoteBankAccount>> {
        let links = self.marketplace_links().await?;
        self.list(&links.bank_accounts_uri).await
    }

    async fn delete_bank_account(&self, uri: &ResourceUri) -> Result<()> {
        let _: Option<serde_json::Value> = self.send::<_, ()>(Method::Delete, uri.as_str(), None).await?;
        Ok(())
    }

    async fn fetch_card(&self, uri: &ResourceUri) -> Result<RemoteCard> {
        self.get(uri.as_str()).await
    }

    async fn list_cards(&self) -> Result<Vec<RemoteCard>> {
        let links = self.marketplace_links().await?;
        self.list(&links.cards_uri).await
    }

    async fn invalidate_card(&self, uri: &ResourceUri) -> Result<RemoteCard> {
        self.put(uri.as_str(), &Invalidate { is_valid: false }).await
    }

    async fn create_credit(&self, bank_account: &ResourceUri, credit: NewRemoteCredit) -> Result<RemoteCredit> {
        let links: BankAccountLinks = self.get(bank_account.as_str()).await?;
        self.post(&links.credits_uri, &credit).await
    }

    async fn fetch_credit(&self, uri: &ResourceUri) -> Result<RemoteCredit> {
        self.get(uri.as_str()).await
    }

    async fn list_credits(&self) -> Result<Vec<RemoteCredit>> {
        let links = self.marketplace_links().await?;
        self.list(&links.credits_uri).await
    }

    async fn create_debit(&self, account: &ResourceUri, debit: NewRemoteDebit) -> Result<RemoteDebit> {
        let links: AccountLinks = self.get(account.as_str()).await?;
        self.post(&links.debits_uri, &debit).await
    }

    async fn fetch_debit(&self, uri: &ResourceUri) -> Result<RemoteDebit> {
        self.get(uri.as_str()).await
    }

    async fn list_debits(&self) -> Result<Vec<RemoteDebit>> {
        let links = self.marketplace_links().await?;
        self.list(&links.debits_uri).await
    }

    async fn refund_debit(&self, debit: &ResourceUri, refund: NewRemoteRefund) -> Result<RemoteRefund> {
        let links: DebitLinks = self.get(debit.as_str()).await?;
        self.post(&links.refunds_uri, &refund).await
    }
}
