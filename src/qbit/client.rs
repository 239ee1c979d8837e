// qBittorrent Web API v2 client. Cookie auth: login yields an SID cookie
// that every later request carries; a 403 triggers one re-login and retry.

use crate::config::QbitConfig;
use crate::qbit::{QbitError, Torrent, TorrentFile, TorrentGateway};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct QbitClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    sid: RwLock<Option<String>>,
}

impl QbitClient {
    pub fn new(config: &QbitConfig) -> Self {
        QbitClient {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            sid: RwLock::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, path)
    }

    async fn login(&self) -> Result<(), QbitError> {
        info!(url = %self.base_url, username = %self.username, "Logging in to qBittorrent");

        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QbitError::AuthFailed);
        }

        let sid = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .find(|pair| pair.trim_start().starts_with("SID="))
            .map(|pair| pair.trim().to_string());

        let body = response.text().await?;
        if body.trim() != "Ok." || sid.is_none() {
            warn!(body = %body, "qBittorrent rejected login");
            return Err(QbitError::AuthFailed);
        }

        *self.sid.write().await = sid;

        Ok(())
    }

    async fn sid_cookie(&self) -> Result<String, QbitError> {
        if self.sid.read().await.is_none() {
            self.login().await?;
        }

        // The login above populated it or failed
        Ok(self.sid.read().await.clone().unwrap_or_default())
    }

    /// Send a request, re-authenticating once on a 403
    async fn send_authenticated<F>(&self, build: F) -> Result<Response, QbitError>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let cookie = self.sid_cookie().await?;
        let response = build(&self.client, &cookie).send().await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!("qBittorrent session expired, re-authenticating");
            self.login().await?;
            let cookie = self.sid_cookie().await?;
            return Ok(build(&self.client, &cookie).send().await?);
        }

        Ok(response)
    }

    async fn check_status(response: Response) -> Result<Response, QbitError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(QbitError::UnexpectedStatus { status, body })
    }
}

#[async_trait]
impl TorrentGateway for QbitClient {
    async fn list_by_category(&self, category: &str) -> Result<Vec<Torrent>, QbitError> {
        let url = self.endpoint("torrents/info");
        let category = category.to_string();

        let response = self
            .send_authenticated(|client, cookie| {
                let mut request = client.get(&url).header("Cookie", cookie);
                if !category.is_empty() {
                    request = request.query(&[("category", category.as_str())]);
                }
                request
            })
            .await?;

        let torrents = Self::check_status(response).await?.json().await?;

        Ok(torrents)
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, QbitError> {
        let url = self.endpoint("torrents/files");

        let response = self
            .send_authenticated(|client, cookie| {
                client
                    .get(&url)
                    .header("Cookie", cookie)
                    .query(&[("hash", hash)])
            })
            .await?;

        let files = Self::check_status(response).await?.json().await?;

        Ok(files)
    }

    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError> {
        let url = self.endpoint("torrents/addTags");
        let hashes = hashes.join("|");

        let response = self
            .send_authenticated(|client, cookie| {
                client
                    .post(&url)
                    .header("Cookie", cookie)
                    .form(&[("hashes", hashes.as_str()), ("tags", tag)])
            })
            .await?;

        Self::check_status(response).await?;

        Ok(())
    }

    async fn remove_tags(&self, hashes: &[String], tag: &str) -> Result<(), QbitError> {
        let url = self.endpoint("torrents/removeTags");
        let hashes = hashes.join("|");

        let response = self
            .send_authenticated(|client, cookie| {
                client
                    .post(&url)
                    .header("Cookie", cookie)
                    .form(&[("hashes", hashes.as_str()), ("tags", tag)])
            })
            .await?;

        Self::check_status(response).await?;

        Ok(())
    }

    async fn set_category(&self, hashes: &[String], category: &str) -> Result<(), QbitError> {
        let url = self.endpoint("torrents/setCategory");
        let hashes = hashes.join("|");

        let response = self
            .send_authenticated(|client, cookie| {
                client
                    .post(&url)
                    .header("Cookie", cookie)
                    .form(&[("hashes", hashes.as_str()), ("category", category)])
            })
            .await?;

        Self::check_status(response).await?;

        Ok(())
    }
}
