use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::FilterConfig;
use crate::types::{Bid, JobRef, NewBid, RawProject};
use crate::{API_BASE, AUTH_HEADER};

/// HTTP client pre-configured with the marketplace base URL and auth header.
///
/// Cheap to clone; the underlying `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

/// Every endpoint wraps its payload in `{"status": ..., "result": ...}`.
#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ProjectsResult {
    #[serde(default)]
    projects: Vec<RawProject>,
}

#[derive(Deserialize)]
struct BidsResult {
    #[serde(default)]
    bids: Vec<Bid>,
}

impl ApiClient {
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_base(access_token, API_BASE)
    }

    pub fn with_base(access_token: &str, base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTH_HEADER,
            HeaderValue::from_str(access_token).context("access token is not a valid header value")?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.to_string(),
        })
    }

    /// Resolve skill names to job ids via the jobs metadata endpoint.
    pub async fn resolve_job_ids(&self, names: &[String]) -> Result<Vec<u64>> {
        let query: Vec<(&str, &str)> = names
            .iter()
            .map(|name| ("job_names[]", name.as_str()))
            .collect();
        let jobs: Vec<JobRef> = self.get("/projects/0.1/jobs/", &query).await?;
        debug!("Resolved {} skill name(s) to {} job id(s)", names.len(), jobs.len());
        Ok(jobs.iter().map(|j| j.id).collect())
    }

    /// Fetch active projects matching the configured filters, with full
    /// descriptions and job details.
    pub async fn active_projects(
        &self,
        filters: &FilterConfig,
        job_ids: &[u64],
    ) -> Result<Vec<RawProject>> {
        let limit = filters.limit.to_string();
        let mut query: Vec<(&str, String)> = vec![
            ("limit", limit),
            ("full_description", "true".into()),
            ("job_details", "true".into()),
            ("compact", "false".into()),
        ];
        for ptype in &filters.project_types {
            query.push(("project_types[]", ptype.clone()));
        }
        for id in job_ids {
            query.push(("jobs[]", id.to_string()));
        }
        if let Some(text) = &filters.query {
            if !text.is_empty() {
                query.push(("query", text.clone()));
            }
        }
        let result: ProjectsResult = self.get("/projects/0.1/projects/active/", &query).await?;
        debug!("Fetched {} active project(s)", result.projects.len());
        Ok(result.projects)
    }

    /// Fetch the given bidder's existing bids, restricted to a project set.
    pub async fn bids_for_projects(&self, project_ids: &[u64], bidder: u64) -> Result<Vec<Bid>> {
        let mut query: Vec<(&str, String)> = project_ids
            .iter()
            .map(|id| ("projects[]", id.to_string()))
            .collect();
        query.push(("bidders[]", bidder.to_string()));
        let result: BidsResult = self.get("/projects/0.1/bids/", &query).await?;
        debug!("Fetched {} existing bid(s)", result.bids.len());
        Ok(result.bids)
    }

    /// Place a bid. One POST, no retry; the next poll cycle picks up the
    /// result through the bids listing.
    pub async fn place_bid(&self, bid: &NewBid) -> Result<()> {
        let url = format!("{}/projects/0.1/bids/", self.base);
        let resp = self.http.post(&url).json(bid).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("bid creation failed (status {status}): {body}");
        }
        Ok(())
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base, path);
        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} failed (status {status}): {body}");
        }
        let envelope: Envelope<T> = resp
            .json()
            .await
            .with_context(|| format!("GET {path}: unexpected response shape"))?;
        Ok(envelope.result)
    }
}
