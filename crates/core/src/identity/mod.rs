//! Client identity and egress rotation.
//!
//! Every fetch picks a User-Agent and, optionally, a proxy at random from the
//! configured pools. Both pickers are total: an empty pool yields the
//! fallback identity or direct egress.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-Agent sent when the identity pool is empty.
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.2; WOW64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/66.0.3359.387 Safari/537.36";

/// A client identity presented on the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub user_agent: String,
}

impl IdentityProfile {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// The identity used when no pool is configured.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_USER_AGENT)
    }

    /// Header map for this identity.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![("User-Agent".to_string(), self.user_agent.clone())]
    }
}

/// A proxy endpoint for outbound requests.
///
/// Entries may be bare `host:port` pairs or full proxy URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EgressRoute(String);

impl EgressRoute {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    pub fn endpoint(&self) -> &str {
        &self.0
    }

    /// Proxy URL with an `http://` scheme added to bare `host:port` entries.
    pub fn proxy_url(&self) -> String {
        if self.0.contains("://") {
            self.0.clone()
        } else {
            format!("http://{}", self.0)
        }
    }
}

impl fmt::Display for EgressRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pool of User-Agent strings.
#[derive(Debug, Clone, Default)]
pub struct IdentityPool {
    profiles: Vec<IdentityProfile>,
}

impl IdentityPool {
    pub fn new<I, S>(user_agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            profiles: user_agents.into_iter().map(IdentityProfile::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, profile: &IdentityProfile) -> bool {
        self.profiles.contains(profile)
    }
}

/// Pool of proxy endpoints.
#[derive(Debug, Clone, Default)]
pub struct EgressPool {
    routes: Vec<EgressRoute>,
}

impl EgressPool {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: endpoints.into_iter().map(EgressRoute::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, route: &EgressRoute) -> bool {
        self.routes.contains(route)
    }
}

/// Pick an identity uniformly at random, or the fallback if the pool is empty.
pub fn pick_identity(pool: &IdentityPool) -> IdentityProfile {
    pick_identity_with(pool, &mut rand::rng())
}

/// Pick an egress route uniformly at random, or `None` for direct egress.
pub fn pick_egress(pool: &EgressPool) -> Option<EgressRoute> {
    pick_egress_with(pool, &mut rand::rng())
}

/// [`pick_identity`] with an explicit randomness source.
pub fn pick_identity_with<R: Rng + ?Sized>(pool: &IdentityPool, rng: &mut R) -> IdentityProfile {
    pool.profiles
        .choose(rng)
        .cloned()
        .unwrap_or_else(IdentityProfile::fallback)
}

/// [`pick_egress`] with an explicit randomness source.
pub fn pick_egress_with<R: Rng + ?Sized>(pool: &EgressPool, rng: &mut R) -> Option<EgressRoute> {
    pool.routes.choose(rng).cloned()
}
