//! Fingerprint profiles handed to the renderer and the asset fetcher.

use crate::result::Viewport;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.6045.159 Safari/537.36 Edg/119.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 OPR/103.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36 Brave/116.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36 Vivaldi/6.1.0.0",
];

const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1536, 864),
    (1280, 720),
    (1440, 900),
    (2560, 1440),
];

// Empty string means "no referer".
const REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://www.reddit.com/",
    "https://news.ycombinator.com/",
    "https://www.wikipedia.org/",
    "https://github.com/",
    "",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_agent: String,
    pub viewport: Viewport,
    pub referer: Option<String>,
}

impl Profile {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

/// Chooses a fingerprint profile. Implementations must be pure: the same
/// seed always yields the same profile.
pub trait ProfileSelector: Send + Sync {
    fn choose(&self, seed: u64) -> Profile;
}

/// Picks from built-in desktop browser tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProfiles;

impl ProfileSelector for DefaultProfiles {
    fn choose(&self, seed: u64) -> Profile {
        let mut rng = StdRng::seed_from_u64(seed);
        let user_agent = USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0]);
        let (width, height) = *VIEWPORTS.choose(&mut rng).unwrap_or(&VIEWPORTS[0]);
        let referer = REFERERS.choose(&mut rng).copied().unwrap_or_default();

        Profile {
            user_agent: user_agent.to_string(),
            viewport: Viewport { width, height },
            referer: (!referer.is_empty()).then(|| referer.to_string()),
        }
    }
}

/// Always returns the same profile, whatever the seed.
#[derive(Debug, Clone)]
pub struct FixedProfile(pub Profile);

impl ProfileSelector for FixedProfile {
    fn choose(&self, _seed: u64) -> Profile {
        self.0.clone()
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
pub fn parse_viewport(value: &str) -> Option<Viewport> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse().ok()?;
    let height = height.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Viewport { width, height })
}
