use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Tunables for the scheduling engine.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// How long a booking waits for the per-doctor critical section before failing as busy.
    pub lock_wait: Duration,
    /// Upper bound for a consultation offering's session length.
    pub max_session_minutes: i64,
    /// Capacity of the outbound appointment event channel.
    pub event_buffer: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(2000),
            max_session_minutes: 480,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub bind_addr: String,
    pub scheduling: SchedulingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            bind_addr: "0.0.0.0:3000".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingConfig::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using in-memory stores");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            bind_addr: env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            scheduling: SchedulingConfig {
                lock_wait: Duration::from_millis(
                    parse_var("SCHEDULING_LOCK_WAIT_MS", defaults.lock_wait.as_millis() as u64),
                ),
                max_session_minutes: parse_var(
                    "SCHEDULING_MAX_SESSION_MINUTES",
                    defaults.max_session_minutes,
                ),
                event_buffer: parse_var("SCHEDULING_EVENT_BUFFER", defaults.event_buffer),
            },
        };

        if !config.is_configured() {
            warn!("Supabase not configured - appointments and availability live in process memory");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
