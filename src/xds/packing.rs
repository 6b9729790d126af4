//! Packing of structured configuration into typed `Any` payloads
//!
//! Envoy carries filter, transport socket and extension configuration as
//! `google.protobuf.Any`: a type URL plus the encoded message. Two tiers are
//! provided. [`PayloadPacker::pack`] surfaces encoding failures to the caller,
//! while [`PayloadPacker::pack_or_empty`] logs them and yields `None` so a
//! single bad sub-configuration cannot abort a listener build.
//!
//! prost encodes fields in tag order, so packing equal messages yields
//! byte-identical payloads.

use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::envoy::config::route::v3::{RouteConfiguration, VirtualHost};
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::HttpConnectionManager;
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::TcpProxy;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::DownstreamTlsContext;
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use std::fmt::Debug;

use crate::config::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::{Error, Result};

/// Prefix of every type URL produced by the packer
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// A protobuf message with a canonical, fully-qualified type name
pub trait TypedMessage: Message + Debug {
    /// Fully-qualified protobuf name, e.g. `envoy.config.route.v3.VirtualHost`
    const TYPE_NAME: &'static str;

    fn type_url() -> String {
        format!("{}{}", TYPE_URL_PREFIX, Self::TYPE_NAME)
    }
}

macro_rules! typed_message {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl TypedMessage for $ty {
                const TYPE_NAME: &'static str = $name;
            }
        )*
    };
}

typed_message! {
    Listener => "envoy.config.listener.v3.Listener",
    RouteConfiguration => "envoy.config.route.v3.RouteConfiguration",
    VirtualHost => "envoy.config.route.v3.VirtualHost",
    HttpConnectionManager => "envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager",
    TcpProxy => "envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy",
    Router => "envoy.extensions.filters.http.router.v3.Router",
    DownstreamTlsContext => "envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext",
}

/// Encodes typed messages into `Any` payloads no larger than a configured limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadPacker {
    max_payload_bytes: usize,
}

impl Default for PayloadPacker {
    fn default() -> Self {
        Self { max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES }
    }
}

impl PayloadPacker {
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    pub fn from_config(config: &crate::config::NetworkingConfig) -> Self {
        Self::new(config.max_payload_bytes)
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Encode `msg` and tag it with its type URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] when the encoder rejects the message,
    /// which happens when its encoded form does not fit the payload limit.
    pub fn pack<M: TypedMessage>(&self, msg: &M) -> Result<Any> {
        let required = msg.encoded_len();
        let mut value = vec![0u8; required.min(self.max_payload_bytes)];

        // A slice buffer cannot grow, so prost reports oversized messages.
        let mut buf = value.as_mut_slice();
        msg.encode(&mut buf).map_err(|source| Error::serialization(M::type_url(), source))?;

        Ok(Any { type_url: M::type_url(), value })
    }

    /// Like [`pack`](Self::pack), but never fails: errors are logged and an
    /// empty payload (`None`) is returned.
    pub fn pack_or_empty<M: TypedMessage>(&self, msg: &M) -> Option<Any> {
        match self.pack(msg) {
            Ok(any) => Some(any),
            Err(err) => {
                tracing::error!(type_url = %M::type_url(), "error marshaling Any {:?}: {}", msg, err);
                None
            }
        }
    }
}

/// Pack with the default payload limit, surfacing encoding errors.
///
/// The default limit is [`DEFAULT_MAX_PAYLOAD_BYTES`] (4 MiB), so a valid
/// but larger message, such as a big `Listener` or `RouteConfiguration`,
/// fails with [`Error::Serialization`]. Use a [`PayloadPacker`] with a
/// higher limit for those.
pub fn message_to_any_with_error<M: TypedMessage>(msg: &M) -> Result<Any> {
    PayloadPacker::default().pack(msg)
}

/// Pack with the default payload limit, logging encoding errors
pub fn message_to_any<M: TypedMessage>(msg: &M) -> Option<Any> {
    PayloadPacker::default().pack_or_empty(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xds::route::build_catch_all_virtual_host;
    use prost::Message;
    use tracing_test::traced_test;

    #[derive(Clone, PartialEq, Message)]
    struct TestMessage {
        #[prost(string, tag = "1")]
        field: String,
        #[prost(uint32, tag = "2")]
        count: u32,
    }

    impl TypedMessage for TestMessage {
        const TYPE_NAME: &'static str = "meshplane.test.TestMessage";
    }

    #[test]
    fn pack_tags_with_type_url() {
        let msg = TestMessage { field: "hello".into(), count: 3 };
        let any = message_to_any_with_error(&msg).unwrap();
        assert_eq!(any.type_url, "type.googleapis.com/meshplane.test.TestMessage");
        assert_eq!(TestMessage::decode(any.value.as_slice()).unwrap(), msg);
    }

    #[test]
    fn pack_is_deterministic() {
        let first = message_to_any_with_error(&build_catch_all_virtual_host(true, "egress")).unwrap();
        let second =
            message_to_any_with_error(&build_catch_all_virtual_host(true, "egress")).unwrap();
        assert_eq!(first.type_url, "type.googleapis.com/envoy.config.route.v3.VirtualHost");
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn pack_matches_prost_encoding() {
        let vh = build_catch_all_virtual_host(false, "");
        let any = message_to_any_with_error(&vh).unwrap();
        assert_eq!(any.value, vh.encode_to_vec());
    }

    #[test]
    fn oversized_message_is_a_serialization_error() {
        let packer = PayloadPacker::new(4);
        let msg = TestMessage { field: "far too long for four bytes".into(), count: 1 };

        let err = packer.pack(&msg).unwrap_err();
        assert!(err.is_serialization());
        match err {
            Error::Serialization { type_url, .. } => {
                assert_eq!(type_url, "type.googleapis.com/meshplane.test.TestMessage")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_limit_rejects_larger_messages() {
        let msg = TestMessage { field: "x".repeat(DEFAULT_MAX_PAYLOAD_BYTES), count: 0 };
        assert!(message_to_any_with_error(&msg).unwrap_err().is_serialization());

        let roomy = PayloadPacker::new(2 * DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(roomy.pack(&msg).unwrap().value.len(), msg.encoded_len());
    }

    #[test]
    fn empty_message_packs_to_empty_value() {
        let any = PayloadPacker::new(1).pack(&TestMessage::default()).unwrap();
        assert!(any.value.is_empty());
    }

    #[traced_test]
    #[test]
    fn pack_or_empty_swallows_and_logs() {
        let packer = PayloadPacker::new(4);
        let msg = TestMessage { field: "far too long for four bytes".into(), count: 1 };

        assert!(packer.pack_or_empty(&msg).is_none());
        assert!(logs_contain("error marshaling Any"));
        assert!(logs_contain("far too long for four bytes"));
    }

    #[test]
    fn pack_or_empty_returns_payload_on_success() {
        let msg = TestMessage { field: "ok".into(), count: 0 };
        let any = message_to_any(&msg).expect("payload");
        assert_eq!(any, message_to_any_with_error(&msg).unwrap());
    }
}
