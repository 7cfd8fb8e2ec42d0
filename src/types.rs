use serde::{Deserialize, Serialize};

/// Fixed milestone percentage sent with every bid.
pub const MILESTONE_PERCENTAGE: u32 = 100;

/// Fixed delivery period in days sent with every bid.
pub const BID_PERIOD_DAYS: u32 = 7;

/// A skill/category entry from the jobs endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Currency {
    pub code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Budget {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BidStats {
    pub bid_count: Option<u64>,
    pub bid_avg: Option<f64>,
}

/// An existing bid from the bids listing. Only the fields the dashboard
/// needs; the endpoint returns many more.
#[derive(Debug, Clone, Deserialize)]
pub struct Bid {
    pub id: u64,
    pub project_id: u64,
    pub bidder_id: u64,
    pub amount: Option<f64>,
}

/// A project as returned by the active-projects endpoint. Most fields are
/// optional: presence depends on the full_description/job_details request
/// flags and on what the poster filled in.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProject {
    pub id: u64,
    pub status: Option<String>,
    pub title: Option<String>,
    pub seo_url: Option<String>,
    pub description: Option<String>,
    pub preview_description: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobRef>,
    pub currency: Option<Currency>,
    pub budget: Option<Budget>,
    pub bid_stats: Option<BidStats>,
    pub submitdate: Option<i64>,
}

/// The flat per-project record published to the view. Rebuilt from scratch
/// on every poll cycle; the previous cycle's rows are discarded.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub id: u64,
    pub status: String,
    pub title: String,
    pub seo_url: String,
    pub description: String,
    pub preview_description: String,
    pub skills: Vec<String>,
    pub currency_code: String,
    pub currency_country: String,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub bid_count: u64,
    pub bid_avg: Option<f64>,
    pub submitdate: Option<i64>,
    /// True iff the configured user already has a bid on this project.
    pub bidded: bool,
}

impl ProjectRow {
    pub fn from_project(project: &RawProject, bidded: bool) -> Self {
        Self {
            id: project.id,
            status: project.status.clone().unwrap_or_default(),
            title: project.title.clone().unwrap_or_default(),
            seo_url: project.seo_url.clone().unwrap_or_default(),
            description: project.description.clone().unwrap_or_default(),
            preview_description: project.preview_description.clone().unwrap_or_default(),
            skills: project.jobs.iter().map(|j| j.name.clone()).collect(),
            currency_code: project
                .currency
                .as_ref()
                .and_then(|c| c.code.clone())
                .unwrap_or_default(),
            currency_country: project
                .currency
                .as_ref()
                .and_then(|c| c.country.clone())
                .unwrap_or_default(),
            budget_min: project.budget.as_ref().and_then(|b| b.minimum),
            budget_max: project.budget.as_ref().and_then(|b| b.maximum),
            bid_count: project
                .bid_stats
                .as_ref()
                .and_then(|s| s.bid_count)
                .unwrap_or(0),
            bid_avg: project.bid_stats.as_ref().and_then(|s| s.bid_avg),
            submitdate: project.submitdate,
            bidded,
        }
    }

    /// Public listing URL for this project.
    pub fn listing_url(&self) -> String {
        format!("{}/{}", crate::PROJECT_URL_BASE, self.seo_url)
    }
}

/// Payload for the bid-creation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NewBid {
    pub project_id: u64,
    pub amount: f64,
    pub description: String,
    pub bidder_id: u64,
    pub milestone_percentage: u32,
    pub period: u32,
}

impl NewBid {
    pub fn new(project_id: u64, amount: f64, bidder_id: u64, proposal: &str) -> Self {
        Self {
            project_id,
            amount,
            description: proposal.to_string(),
            bidder_id,
            milestone_percentage: MILESTONE_PERCENTAGE,
            period: BID_PERIOD_DAYS,
        }
    }
}
