//! Politeness: robots.txt compliance and per-engine fetch pacing
//!
//! One [`PolitenessGate`] is owned by each crawl engine. It is not a
//! process-global limiter: two engines crawling in one process pace their
//! fetches independently.

mod robots;

pub use robots::RobotsPolicy;

use crate::config::CrawlConfig;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Robots compliance plus delay pacing for one crawl run
///
/// Uses interior mutability throughout so the concurrent backend's workers
/// can share a single gate behind an `Arc`.
pub struct PolitenessGate {
    respect_robots: bool,
    delay: Duration,
    delay_randomize: bool,
    user_agent: String,
    client: Client,
    /// Robots policy per host, fetched at most once per host per run
    robots: Mutex<HashMap<String, RobotsPolicy>>,
    /// Earliest instant the next fetch may be issued
    next_slot: Mutex<Option<Instant>>,
}

impl PolitenessGate {
    /// Creates a gate from the crawl configuration
    pub fn new(client: Client, config: &CrawlConfig) -> Self {
        Self {
            respect_robots: config.respect_robots_txt,
            delay: Duration::from_secs_f64(config.delay),
            delay_randomize: config.delay_randomize,
            user_agent: config.user_agent_string(),
            client,
            robots: Mutex::new(HashMap::new()),
            next_slot: Mutex::new(None),
        }
    }

    /// Checks whether robots.txt allows fetching this URL
    ///
    /// The policy for a host is fetched lazily on first use and cached for
    /// the rest of the run. A missing or unreachable robots.txt never blocks
    /// crawling: any fetch failure degrades to allow-all.
    pub async fn allows(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }

        let Some(host) = url.host_str() else {
            return true;
        };

        let mut robots = self.robots.lock().await;
        if !robots.contains_key(host) {
            let policy = self.fetch_robots(url).await;
            robots.insert(host.to_string(), policy);
        }

        robots[host].is_allowed(url.as_str(), &self.user_agent)
    }

    /// Waits until the next fetch slot and reserves the one after it
    ///
    /// The first call returns immediately; each subsequent call waits out the
    /// configured delay (sampled per-gap when randomization is on). Callers
    /// invoke this once per fetch, directly before issuing the request.
    pub async fn acquire_slot(&self) {
        if self.delay.is_zero() {
            return;
        }

        let wait_until = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let ready = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(ready + self.sample_delay());
            ready
        };

        tokio::time::sleep_until(wait_until).await;
    }

    fn sample_delay(&self) -> Duration {
        if self.delay_randomize {
            // Uniform in [0.5, 1.5) times the configured delay
            self.delay.mul_f64(0.5 + fastrand::f64())
        } else {
            self.delay
        }
    }

    async fn fetch_robots(&self, url: &Url) -> RobotsPolicy {
        let mut robots_url = url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        tracing::debug!("Fetching robots.txt from {}", robots_url);

        let response = match self.client.get(robots_url.as_str()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed ({}), allowing all", e);
                return RobotsPolicy::allow_all();
            }
        };

        if !response.status().is_success() {
            return RobotsPolicy::allow_all();
        }

        match response.text().await {
            Ok(body) => RobotsPolicy::from_content(&body),
            Err(_) => RobotsPolicy::allow_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;

    fn gate_with(delay: f64, randomize: bool) -> PolitenessGate {
        let mut config = CrawlConfig::new("https://example.com/");
        config.delay = delay;
        config.delay_randomize = randomize;
        PolitenessGate::new(Client::new(), &config)
    }

    #[test]
    fn test_fixed_delay_sample() {
        let gate = gate_with(2.0, false);
        assert_eq!(gate.sample_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_randomized_delay_stays_in_band() {
        let gate = gate_with(1.0, true);
        for _ in 0..100 {
            let d = gate.sample_delay();
            assert!(d >= Duration::from_millis(500), "delay too short: {:?}", d);
            assert!(d < Duration::from_millis(1500), "delay too long: {:?}", d);
        }
    }

    #[tokio::test]
    async fn test_first_slot_is_immediate() {
        let gate = gate_with(5.0, false);
        let start = std::time::Instant::now();
        gate.acquire_slot().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_second_slot_waits() {
        tokio::time::pause();
        let gate = gate_with(1.0, false);

        gate.acquire_slot().await;
        let before = Instant::now();
        gate.acquire_slot().await;
        assert!(Instant::now() - before >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_delay_never_waits() {
        let gate = gate_with(0.0, false);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            gate.acquire_slot().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_robots_disabled_allows_everything() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.respect_robots_txt = false;
        let gate = PolitenessGate::new(Client::new(), &config);

        let url = Url::parse("https://example.com/private/x").unwrap();
        assert!(gate.allows(&url).await);
    }
}
