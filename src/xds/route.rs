//! Catch-all routing for traffic that matches no known service
//!
//! Unmatched traffic is either forwarded to its original destination
//! (`allow_any`, via the passthrough cluster or an explicit egress cluster)
//! or rejected with a static 502 (`block_all`). It is never dropped silently.

use envoy_types::pb::envoy::config::route::v3::{
    route::Action, route_action::ClusterSpecifier, route_match::PathSpecifier,
    DirectResponseAction, Route, RouteAction, RouteMatch, VirtualHost,
};
use envoy_types::pb::google::protobuf::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cluster receiving traffic from routes whose cluster cannot be resolved
pub const BLACK_HOLE_CLUSTER: &str = "BlackHoleCluster";
/// Virtual host and route name used to block all unmatched traffic
pub const BLACK_HOLE: &str = "block_all";
/// Cluster forwarding traffic to the original destination
pub const PASSTHROUGH_CLUSTER: &str = "PassthroughCluster";
/// Virtual host and route name used to forward unmatched traffic
pub const PASSTHROUGH: &str = "allow_any";

/// Status returned by the `block_all` route
pub const BLACK_HOLE_STATUS: u32 = 502;

const CATCH_ALL_DOMAIN: &str = "*";
const CATCH_ALL_PREFIX: &str = "/";

/// Build the virtual host that handles traffic no other virtual host matched.
///
/// With `allow_any_outbound` the route proxies to `destination`, or to
/// [`PASSTHROUGH_CLUSTER`] when `destination` is empty, with route and gRPC
/// timeouts disabled. Otherwise every request gets a direct 502 response.
#[allow(deprecated)]
pub fn build_catch_all_virtual_host(allow_any_outbound: bool, destination: &str) -> VirtualHost {
    let (name, action) = if allow_any_outbound {
        let cluster = if destination.is_empty() { PASSTHROUGH_CLUSTER } else { destination };
        let no_timeout = Duration { seconds: 0, nanos: 0 };

        let route_action = RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(cluster.to_string())),
            // Zero disables the timeout; the upstream's own policy applies.
            timeout: Some(no_timeout.clone()),
            max_grpc_timeout: Some(no_timeout),
            ..Default::default()
        };

        (PASSTHROUGH, Action::Route(route_action))
    } else {
        (
            BLACK_HOLE,
            Action::DirectResponse(DirectResponseAction {
                status: BLACK_HOLE_STATUS,
                ..Default::default()
            }),
        )
    };

    VirtualHost {
        name: name.to_string(),
        domains: vec![CATCH_ALL_DOMAIN.to_string()],
        routes: vec![Route {
            name: name.to_string(),
            r#match: Some(RouteMatch {
                path_specifier: Some(PathSpecifier::Prefix(CATCH_ALL_PREFIX.to_string())),
                ..Default::default()
            }),
            action: Some(action),
            ..Default::default()
        }],
        include_request_attempt_count: true,
        ..Default::default()
    }
}

/// How the mesh treats outbound traffic to unknown destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundTrafficMode {
    #[default]
    AllowAny,
    RegistryOnly,
}

impl OutboundTrafficMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundTrafficMode::AllowAny => "ALLOW_ANY",
            OutboundTrafficMode::RegistryOnly => "REGISTRY_ONLY",
        }
    }
}

impl fmt::Display for OutboundTrafficMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboundTrafficMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ALLOW_ANY" => Ok(OutboundTrafficMode::AllowAny),
            "REGISTRY_ONLY" => Ok(OutboundTrafficMode::RegistryOnly),
            _ => Err(crate::Error::config(format!(
                "Invalid outbound traffic policy '{}': expected ALLOW_ANY or REGISTRY_ONLY",
                s
            ))),
        }
    }
}

/// Outbound traffic policy of a sidecar
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundTrafficPolicy {
    pub mode: OutboundTrafficMode,
    /// Cluster receiving unmatched traffic instead of the passthrough cluster
    pub egress_destination: Option<String>,
}

impl OutboundTrafficPolicy {
    pub fn allows_any(&self) -> bool {
        self.mode == OutboundTrafficMode::AllowAny
    }

    /// Catch-all virtual host for this policy
    pub fn catch_all_virtual_host(&self) -> VirtualHost {
        build_catch_all_virtual_host(
            self.allows_any(),
            self.egress_destination.as_deref().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;

    fn route_action(vh: &VirtualHost) -> &RouteAction {
        match vh.routes[0].action.as_ref() {
            Some(Action::Route(action)) => action,
            other => panic!("expected route action, got {:?}", other),
        }
    }

    fn assert_catch_all_match(vh: &VirtualHost) {
        assert_eq!(vh.domains, vec!["*".to_string()]);
        assert_eq!(vh.routes.len(), 1);
        let route_match = vh.routes[0].r#match.as_ref().expect("route match");
        assert_eq!(route_match.path_specifier, Some(PathSpecifier::Prefix("/".to_string())));
        assert!(vh.include_request_attempt_count);
    }

    #[test]
    fn block_all_returns_502() {
        let vh = build_catch_all_virtual_host(false, "");
        assert_eq!(vh.name, BLACK_HOLE);
        assert_eq!(vh.routes[0].name, BLACK_HOLE);
        assert_catch_all_match(&vh);

        match vh.routes[0].action.as_ref() {
            Some(Action::DirectResponse(response)) => {
                assert_eq!(response.status, 502);
                assert!(response.body.is_none());
            }
            other => panic!("expected direct response, got {:?}", other),
        }
    }

    #[test]
    fn block_all_ignores_destination() {
        assert_eq!(
            build_catch_all_virtual_host(false, "egress-gateway"),
            build_catch_all_virtual_host(false, "")
        );
    }

    #[test]
    fn allow_any_routes_to_passthrough() {
        let vh = build_catch_all_virtual_host(true, "");
        assert_eq!(vh.name, PASSTHROUGH);
        assert_eq!(vh.routes[0].name, PASSTHROUGH);
        assert_catch_all_match(&vh);

        let action = route_action(&vh);
        assert_eq!(
            action.cluster_specifier,
            Some(ClusterSpecifier::Cluster(PASSTHROUGH_CLUSTER.to_string()))
        );
        assert_eq!(action.timeout, Some(Duration { seconds: 0, nanos: 0 }));
        assert_eq!(action.max_grpc_timeout, Some(Duration { seconds: 0, nanos: 0 }));
        assert!(action.retry_policy.is_none());
    }

    #[test]
    fn allow_any_uses_explicit_destination() {
        let passthrough = build_catch_all_virtual_host(true, "");
        let vh = build_catch_all_virtual_host(true, "my-cluster");

        assert_eq!(
            route_action(&vh).cluster_specifier,
            Some(ClusterSpecifier::Cluster("my-cluster".to_string()))
        );

        // Everything except the cluster is identical to the passthrough shape.
        let mut rewritten = vh.clone();
        if let Some(Action::Route(action)) = rewritten.routes[0].action.as_mut() {
            action.cluster_specifier =
                Some(ClusterSpecifier::Cluster(PASSTHROUGH_CLUSTER.to_string()));
        }
        assert_eq!(rewritten, passthrough);
    }

    #[test]
    fn policy_delegates_to_builder() {
        let policy = OutboundTrafficPolicy {
            mode: OutboundTrafficMode::AllowAny,
            egress_destination: Some("egress".to_string()),
        };
        assert_eq!(policy.catch_all_virtual_host(), build_catch_all_virtual_host(true, "egress"));

        let registry_only = OutboundTrafficPolicy {
            mode: OutboundTrafficMode::RegistryOnly,
            egress_destination: Some("egress".to_string()),
        };
        assert_eq!(registry_only.catch_all_virtual_host().name, BLACK_HOLE);
    }

    #[test]
    fn parse_outbound_mode() {
        assert_eq!("allow_any".parse::<OutboundTrafficMode>().unwrap(), OutboundTrafficMode::AllowAny);
        assert_eq!(
            "REGISTRY-ONLY".parse::<OutboundTrafficMode>().unwrap(),
            OutboundTrafficMode::RegistryOnly
        );
        assert!("deny".parse::<OutboundTrafficMode>().is_err());
        assert_eq!(OutboundTrafficMode::RegistryOnly.to_string(), "REGISTRY_ONLY");
    }
}
