//! Caller identity from trusted gateway headers
//!
//! Authentication happens upstream; the admin backend forwards the caller
//! as `x-admin-*` headers. Mutating routes refuse requests that carry no
//! `x-admin-id`, so every write is attributable.

use hyper::HeaderMap;
use vestry_core::domain::{Actor, ActorKind};

/// Identity of the administrative caller as asserted by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl CallerIdentity {
    /// Reads the identity headers. Returns `None` when `x-admin-id` is
    /// absent or empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = header_value(headers, "x-admin-id")?;
        Some(Self {
            id,
            name: header_value(headers, "x-admin-name"),
            email: header_value(headers, "x-admin-email"),
            role: header_value(headers, "x-admin-role"),
            source_ip: header_value(headers, "x-forwarded-for")
                .map(|chain| {
                    chain
                        .split(',')
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                })
                .filter(|ip| !ip.is_empty()),
            user_agent: header_value(headers, "user-agent"),
        })
    }

    /// Builds the audit actor for this caller.
    pub fn actor(&self) -> Actor {
        let mut actor = Actor::new(ActorKind::Admin, self.id.as_str());
        if let Some(name) = &self.name {
            actor = actor.with_name(name.as_str());
        }
        if let Some(email) = &self.email {
            actor = actor.with_email(email.as_str());
        }
        if let Some(role) = &self.role {
            actor = actor.with_role(role.as_str());
        }
        if let Some(ip) = &self.source_ip {
            actor = actor.with_source_ip(ip.as_str());
        }
        if let Some(agent) = &self.user_agent {
            actor = actor.with_user_agent(agent.as_str());
        }
        actor
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}
