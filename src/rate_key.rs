use std::fmt;
use std::net::IpAddr;

// Opaque throttling key - "{route}:{user}" or "{route}:ip:{addr}"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey(String);

impl RateKey {
    pub fn for_user(route_id: &str, user_id: &str) -> Self {
        Self(format!("{}:{}", route_id, user_id))
    }

    pub fn for_ip(route_id: &str, addr: IpAddr) -> Self {
        Self(format!("{}:ip:{}", route_id, addr))
    }

    /// Authenticated callers are throttled per user, everyone else per source address.
    pub fn derive(route_id: &str, user_id: Option<&str>, addr: Option<IpAddr>) -> Self {
        match (user_id, addr) {
            (Some(user), _) => Self::for_user(route_id, user),
            (None, Some(addr)) => Self::for_ip(route_id, addr),
            (None, None) => Self(format!("{}:ip:unknown", route_id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
