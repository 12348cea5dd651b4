use clap::Parser;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "event-board-gateway")]
#[command(about = "Rate limiting gateway in front of the campus event board backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Managed backend base url
    // Example: "https://project.supabase.co" or "localhost:54321"
    #[arg(short, long, env = "BACKEND_URL", default_value = "localhost:54321")]
    pub backend_url: String,

    // Public (anon) api key sent with every backend call
    #[arg(long, env = "BACKEND_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    // Event joins allowed per user per window
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub join_limit: u32,

    // Join window in seconds
    #[arg(long, default_value_t = 86_400, value_parser = clap::value_parser!(u64).range(1..))]
    pub join_window: u64,

    // Event creations allowed per user per window
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub create_limit: u32,

    // Creation window in seconds
    #[arg(long, default_value_t = 86_400, value_parser = clap::value_parser!(u64).range(1..))]
    pub create_window: u64,

    // Apply the creation limit to POST /api/events (off for the MVP)
    #[arg(long, default_value_t = false)]
    pub enforce_create_limit: bool,

    // Seconds between sweeps of expired rate limit records
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // How long an expired record is kept before a sweep drops it, in seconds
    #[arg(long, default_value_t = 0)]
    pub sweep_grace: u64,

    // Health check interval
    #[arg(long, default_value_t = 30)]
    pub health_interval: u64,

    // Log as JSON lines instead of text
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

impl Args {
    pub fn join_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.join_limit, Duration::from_secs(self.join_window))
    }

    pub fn create_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.create_limit, Duration::from_secs(self.create_window))
    }
}
