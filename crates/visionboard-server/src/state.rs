//! Shared application state.

use crate::api::is_public_target;
use crate::config::ServerConfig;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use visionboard_core::remote::{BoardRepository, RepositoryLimits};
use visionboard_core::unfurl::UNFURL_USER_AGENT;

/// Redirects followed when fetching a page for a link preview.
const MAX_REDIRECTS: usize = 5;

pub struct AppState {
    /// Board repositories keyed by account id.
    accounts: DashMap<String, BoardRepository>,
    limits: RepositoryLimits,
    /// Client used to fetch pages for link previews.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(UNFURL_USER_AGENT)
            .timeout(config.unfurl_timeout)
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else if is_public_target(attempt.url()) {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()?;
        Ok(Self {
            accounts: DashMap::new(),
            limits: config.limits,
            http,
        })
    }

    pub fn limits(&self) -> RepositoryLimits {
        self.limits
    }

    /// The account's repository, created empty on first use.
    pub fn repository(&self, account: &str) -> RefMut<'_, String, BoardRepository> {
        self.accounts
            .entry(account.to_string())
            .or_insert_with(|| BoardRepository::new(self.limits))
    }
}
