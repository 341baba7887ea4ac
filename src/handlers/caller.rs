use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::rate_key::RateKey;
use crate::state::AppState;

const USER_HEADER: &str = "x-user-id";
const FORWARDED_HEADER: &str = "x-forwarded-for";

// Who is making the request. The user id is set by the session layer in front
// of this service; the address is the peer or the first forwarded hop.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: Option<String>,
    pub addr: Option<IpAddr>,
}

impl Caller {
    pub fn rate_key(&self, route_id: &str) -> RateKey {
        RateKey::derive(route_id, self.user_id.as_deref(), self.addr)
    }
}

// Behind a trusted proxy the forwarded hop names the client, otherwise the peer does
fn client_addr(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded: bool) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());

    if trust_forwarded {
        forwarded.or(peer)
    } else {
        peer.or(forwarded)
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let addr = client_addr(&parts.headers, peer, state.trust_forwarded);

        Ok(Self { user_id, addr })
    }
}
