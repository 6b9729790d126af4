//! Filter chain model and the mutable listener build context
//!
//! A listener is built in a single pass. The pass owns a [`MutableObjects`]
//! and hands it, in a fixed order, to each [`ListenerContributor`]. Filter
//! chains may only be appended: contributors can rely on the position of
//! chains added before them.

use envoy_types::pb::envoy::config::core::v3::{
    transport_socket::ConfigType as TransportSocketConfigType, TransportSocket,
};
use envoy_types::pb::envoy::config::listener::v3::{
    Filter, FilterChain as EnvoyFilterChain, FilterChainMatch, Listener, ListenerFilter,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::HttpFilter;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::DownstreamTlsContext;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::xds::packing::PayloadPacker;
use crate::xds::protocol::ListenerProtocol;
use crate::xds::telemetry::ListenerClass;
use crate::xds::transport::TransportProtocol;
use crate::xds::tunnel::TunnelAbility;
use crate::{Error, Result};

/// Name of envoy's TLS transport socket
pub const TLS_TRANSPORT_SOCKET_NAME: &str = "envoy.transport_sockets.tls";

/// A set of filters (HTTP or TCP) sharing one match and TLS context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    /// Match used to select this chain; owned by the generation pipeline
    pub filter_chain_match: Option<FilterChainMatch>,
    /// Present only when the chain terminates TLS
    pub tls_context: Option<DownstreamTlsContext>,
    /// Filters needed by the whole listener rather than this chain
    pub listener_filters: Vec<ListenerFilter>,
    /// HTTP chains may still carry network filters
    pub listener_protocol: ListenerProtocol,
    pub transport_protocol: TransportProtocol,
    /// Set for gateway servers terminating mutual TLS with the mesh's own
    /// certificates, so authentication filters are added downstream
    pub mutual_tls_gateway: bool,
    /// Tunnel types this chain can carry
    pub tunnel_ability: TunnelAbility,
    pub http_filters: Vec<HttpFilter>,
    pub tcp_filters: Vec<Filter>,
    pub is_fallthrough: bool,
}

impl FilterChain {
    /// An HTTP chain with the given HTTP filters
    pub fn http(http_filters: Vec<HttpFilter>) -> Self {
        Self { listener_protocol: ListenerProtocol::Http, http_filters, ..Default::default() }
    }

    /// A TCP chain with the given network filters
    pub fn tcp(tcp_filters: Vec<Filter>) -> Self {
        Self { listener_protocol: ListenerProtocol::Tcp, tcp_filters, ..Default::default() }
    }

    /// The chain taken by traffic no other chain matched
    pub fn fallthrough(tcp_filters: Vec<Filter>) -> Self {
        Self { is_fallthrough: true, ..Self::tcp(tcp_filters) }
    }

    pub fn with_match(mut self, filter_chain_match: FilterChainMatch) -> Self {
        self.filter_chain_match = Some(filter_chain_match);
        self
    }

    pub fn with_tls_context(mut self, tls_context: DownstreamTlsContext) -> Self {
        self.tls_context = Some(tls_context);
        self
    }

    pub fn with_transport(mut self, transport_protocol: TransportProtocol) -> Self {
        self.transport_protocol = transport_protocol;
        self
    }

    pub fn with_tunnel_ability(mut self, tunnel_ability: TunnelAbility) -> Self {
        self.tunnel_ability = tunnel_ability;
        self
    }

    pub fn has_http_filters(&self) -> bool {
        !self.http_filters.is_empty()
    }

    pub fn has_tcp_filters(&self) -> bool {
        !self.tcp_filters.is_empty()
    }

    /// Check that the chain carries HTTP filters, TCP filters or both.
    ///
    /// Only fallthrough chains may carry neither.
    pub fn validate(&self) -> Result<()> {
        if self.is_fallthrough || self.has_http_filters() || self.has_tcp_filters() {
            return Ok(());
        }

        Err(Error::validation_field(
            "Filter chain must carry HTTP filters, TCP filters, or both",
            "filters",
        ))
    }

    /// TLS transport socket for this chain, if it terminates TLS
    pub fn transport_socket(&self, packer: &PayloadPacker) -> Result<Option<TransportSocket>> {
        let Some(tls_context) = &self.tls_context else {
            return Ok(None);
        };

        Ok(Some(TransportSocket {
            name: TLS_TRANSPORT_SOCKET_NAME.to_string(),
            config_type: Some(TransportSocketConfigType::TypedConfig(packer.pack(tls_context)?)),
        }))
    }

    /// Partial envoy filter chain: match, network filters and transport
    /// socket. The HTTP connection manager wrapping `http_filters` is added
    /// by the route generation stage.
    pub fn to_envoy_filter_chain(&self, packer: &PayloadPacker) -> Result<EnvoyFilterChain> {
        Ok(EnvoyFilterChain {
            filter_chain_match: self.filter_chain_match.clone(),
            filters: self.tcp_filters.clone(),
            transport_socket: self.transport_socket(packer)?,
            ..Default::default()
        })
    }
}

/// The listener being built and the filter chains that will be attached to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutableObjects {
    listener: Listener,
    filter_chains: Vec<FilterChain>,
}

impl MutableObjects {
    pub fn new(listener: Listener) -> Self {
        Self { listener, filter_chains: Vec::new() }
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Mutable access to the listener itself.
    ///
    /// Later contributors observe these changes; keep them to fields no
    /// other contributor owns.
    pub fn listener_mut(&mut self) -> &mut Listener {
        &mut self.listener
    }

    pub fn filter_chains(&self) -> &[FilterChain] {
        &self.filter_chains
    }

    /// Append a filter chain after every existing one
    pub fn push_filter_chain(&mut self, chain: FilterChain) {
        self.filter_chains.push(chain);
    }

    /// Mutate one existing chain in place
    pub fn filter_chain_mut(&mut self, index: usize) -> Option<&mut FilterChain> {
        self.filter_chains.get_mut(index)
    }

    /// Listener filters of every chain, first occurrence of each name kept
    pub fn listener_filters(&self) -> Vec<ListenerFilter> {
        let mut seen = HashSet::new();
        self.filter_chains
            .iter()
            .flat_map(|chain| chain.listener_filters.iter())
            .filter(|filter| seen.insert(filter.name.clone()))
            .cloned()
            .collect()
    }

    pub fn into_parts(self) -> (Listener, Vec<FilterChain>) {
        (self.listener, self.filter_chains)
    }
}

/// One step of a listener build pass
pub trait ListenerContributor {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Inspect and extend the listener under construction
    fn contribute(&self, class: ListenerClass, objects: &mut MutableObjects) -> Result<()>;
}

impl<F> ListenerContributor for F
where
    F: Fn(ListenerClass, &mut MutableObjects) -> Result<()>,
{
    fn name(&self) -> &str {
        "anonymous"
    }

    fn contribute(&self, class: ListenerClass, objects: &mut MutableObjects) -> Result<()> {
        self(class, objects)
    }
}

/// A single listener build pass.
///
/// Contributors run sequentially against one context; separate passes share
/// nothing and may run in parallel.
#[derive(Debug)]
pub struct ListenerBuild {
    class: ListenerClass,
    objects: MutableObjects,
}

impl ListenerBuild {
    pub fn new(listener: Listener, class: ListenerClass) -> Self {
        Self { class, objects: MutableObjects::new(listener) }
    }

    pub fn class(&self) -> ListenerClass {
        self.class
    }

    /// Run every contributor in order.
    ///
    /// After each contributor the chain list must not have shrunk and every
    /// chain must still validate. The first error abandons the pass.
    pub fn run(mut self, contributors: &[&dyn ListenerContributor]) -> Result<MutableObjects> {
        let span = crate::xds_span!(
            "build_listener",
            self.objects.listener.name,
            class = ?self.class
        );
        let _enter = span.enter();

        for contributor in contributors {
            let before = self.objects.filter_chains.len();

            if let Err(err) = contributor.contribute(self.class, &mut self.objects) {
                warn!(contributor = contributor.name(), error = %err, "Listener contributor failed");
                return Err(err);
            }

            if self.objects.filter_chains.len() < before {
                warn!(contributor = contributor.name(), "Listener contributor removed filter chains");
                return Err(Error::validation_field(
                    "contributor removed filter chains",
                    "filter_chains",
                ));
            }

            // Earlier chains may have been mutated in place, so check them all.
            for chain in &self.objects.filter_chains {
                chain.validate()?;
            }

            debug!(
                contributor = contributor.name(),
                added_filter_chains = self.objects.filter_chains.len() - before,
                "Listener contributor applied"
            );
        }

        Ok(self.objects)
    }
}
