pub mod api;
pub mod config;
pub mod flatten;
pub mod poller;
pub mod reporter;
pub mod tui;
pub mod types;

/// Freelancer REST API base path (all endpoints live under /projects/0.1/)
pub const API_BASE: &str = "https://www.freelancer.com/api";

/// OAuth access-token header expected by the marketplace API
pub const AUTH_HEADER: &str = "freelancer-oauth-v1";

/// Public listing URL prefix — append the project's seo_url
pub const PROJECT_URL_BASE: &str = "https://www.freelancer.com/projects";
