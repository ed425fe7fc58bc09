pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod http_client;
pub mod job;
pub mod job_poller;
pub mod match_stats;
pub mod pitch;
pub mod provider;
pub mod report_export;
pub mod routes;
pub mod session;
pub mod state;
pub mod urls;
