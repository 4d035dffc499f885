//! Request-scoped context
//!
//! Bundles the authenticated user with the network metadata recorded in the
//! activity log, so services receive both explicitly.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::{headers::UserAgent, TypedHeader};

use super::auth::{AuthUser, CurrentUser};
use crate::error::AppError;
use crate::services::activity_log::Actor;

const MAX_USER_AGENT_LEN: usize = 500;

/// Where a request came from
#[derive(Clone, Debug, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Authenticated user plus client metadata for one request
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user: AuthUser,
    pub client: ClientMeta,
}

impl RequestContext {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: Some(self.user.user_id),
            ip_address: self.client.ip_address.clone(),
            user_agent: self.client.user_agent.clone(),
        }
    }

    pub fn require(&self, resource: &str, action: &str) -> Result<(), AppError> {
        self.user.require(resource, action)
    }
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket
pub fn client_ip(headers: &HeaderMap, socket: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(|ip| ip.chars().take(45).collect())
        .or_else(|| socket.map(|addr| addr.ip().to_string()))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let user_agent = TypedHeader::<UserAgent>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(ua)| ua.as_str().chars().take(MAX_USER_AGENT_LEN).collect());

        Ok(ClientMeta {
            ip_address: client_ip(&parts.headers, socket),
            user_agent,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let client = match ClientMeta::from_request_parts(parts, state).await {
            Ok(client) => client,
            Err(never) => match never {},
        };

        Ok(RequestContext { user, client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers, None).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_falls_back_to_real_ip_then_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers, None).as_deref(), Some("10.0.0.9"));

        let socket: SocketAddr = "192.168.1.20:51000".parse().unwrap();
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(socket)).as_deref(),
            Some("192.168.1.20")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
