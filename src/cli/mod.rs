//! # Command Line Interface
//!
//! Inspect how meshplane resolves listener protocols, transports, tunnels,
//! telemetry modes and catch-all routes for a given configuration.

pub mod output;

use crate::config::AppConfig;
use crate::observability::init_logging;
use crate::xds::{
    ListenerClass, ListenerProtocol, OutboundTrafficPolicy, PayloadPacker, Protocol,
    SniffingPolicy, TelemetryMode, TrafficDirection, TransportProtocol, TunnelAbility, TunnelType,
};
use clap::{Parser, Subcommand, ValueEnum};
use envoy_types::pb::envoy::config::route::v3::{route::Action, route_action::ClusterSpecifier};
use output::{print_output, OutputFormat};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meshplane")]
#[command(about = "Inspect meshplane listener protocol and fallback routing decisions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the listener protocol for a declared protocol and direction
    Classify {
        /// Declared service protocol (HTTP, GRPC, TCP, ...); unknown names are unsupported
        #[arg(short, long, default_value = "")]
        protocol: String,

        /// Traffic direction
        #[arg(short, long, value_enum, default_value_t = DirectionArg::Outbound)]
        direction: DirectionArg,
    },

    /// Show the catch-all virtual host for unmatched outbound traffic
    CatchAll {
        /// Override the configured outbound traffic policy with ALLOW_ANY
        #[arg(long, conflicts_with = "registry_only")]
        allow_any: bool,

        /// Override the configured outbound traffic policy with REGISTRY_ONLY
        #[arg(long)]
        registry_only: bool,

        /// Cluster receiving unmatched traffic instead of PassthroughCluster
        #[arg(long)]
        destination: Option<String>,
    },

    /// Show the telemetry mode of a listener class
    Telemetry {
        #[arg(value_enum)]
        class: ClassArg,
    },

    /// Show the socket protocol of a transport
    Transport {
        #[arg(value_enum)]
        transport: TransportArg,
    },

    /// Compose a tunnel ability from tunnel types
    Tunnel {
        #[arg(value_enum)]
        types: Vec<TunnelArg>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Inbound,
    Outbound,
    Unspecified,
}

impl From<DirectionArg> for TrafficDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Inbound => TrafficDirection::Inbound,
            DirectionArg::Outbound => TrafficDirection::Outbound,
            DirectionArg::Unspecified => TrafficDirection::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassArg {
    Undefined,
    SidecarInbound,
    SidecarOutbound,
    Gateway,
}

impl From<ClassArg> for ListenerClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Undefined => ListenerClass::Undefined,
            ClassArg::SidecarInbound => ListenerClass::SidecarInbound,
            ClassArg::SidecarOutbound => ListenerClass::SidecarOutbound,
            ClassArg::Gateway => ListenerClass::Gateway,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Tcp,
    Quic,
}

impl From<TransportArg> for TransportProtocol {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => TransportProtocol::Tcp,
            TransportArg::Quic => TransportProtocol::Quic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TunnelArg {
    None,
    H2,
}

impl From<TunnelArg> for TunnelType {
    fn from(arg: TunnelArg) -> Self {
        match arg {
            TunnelArg::None => TunnelType::NO_TUNNEL,
            TunnelArg::H2 => TunnelType::H2_TUNNEL,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    pub declared_protocol: String,
    pub direction: String,
    pub sniffing: SniffingPolicy,
    pub listener_protocol: ListenerProtocol,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatchAllAction {
    Cluster { name: String },
    DirectResponse { status: u32 },
}

#[derive(Debug, Serialize)]
pub struct CatchAllReport {
    pub virtual_host: String,
    pub domains: Vec<String>,
    pub route: String,
    pub action: Option<CatchAllAction>,
    pub include_request_attempt_count: bool,
    pub type_url: Option<String>,
    pub payload_bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TelemetryReport {
    pub class: ListenerClass,
    pub direction: String,
    pub telemetry_mode: TelemetryMode,
}

#[derive(Debug, Serialize)]
pub struct TransportReport {
    pub transport: TransportProtocol,
    pub socket_protocol: String,
}

#[derive(Debug, Serialize)]
pub struct TunnelReport {
    pub types: Vec<String>,
    pub bits: u32,
    pub supports_h2_tunnel: bool,
}

/// Run CLI commands
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;
    crate::observability::log_config_info(&config);

    match cli.command {
        Commands::Classify { protocol, direction } => {
            print_output(&classify(&config, &protocol, direction.into()), cli.output)?
        }
        Commands::CatchAll { allow_any, registry_only, destination } => {
            let mut policy = config.networking.outbound_policy();
            if allow_any {
                policy.mode = crate::xds::OutboundTrafficMode::AllowAny;
            }
            if registry_only {
                policy.mode = crate::xds::OutboundTrafficMode::RegistryOnly;
            }
            if destination.is_some() {
                policy.egress_destination = destination;
            }
            let packer = PayloadPacker::from_config(&config.networking);
            print_output(&catch_all(&policy, &packer), cli.output)?
        }
        Commands::Telemetry { class } => print_output(&telemetry(class.into()), cli.output)?,
        Commands::Transport { transport } => {
            print_output(&transport_report(transport.into()), cli.output)?
        }
        Commands::Tunnel { types } => {
            let types: Vec<TunnelType> = types.into_iter().map(TunnelType::from).collect();
            print_output(&tunnel(&types), cli.output)?
        }
    }

    Ok(())
}

/// Resolve the listener protocol under the configured sniffing flags
pub fn classify(config: &AppConfig, protocol: &str, direction: TrafficDirection) -> ClassifyReport {
    let declared = Protocol::parse(protocol);
    let sniffing = config.networking.sniffing();

    ClassifyReport {
        declared_protocol: declared.to_string(),
        direction: direction.as_str_name().to_string(),
        sniffing,
        listener_protocol: ListenerProtocol::resolve(declared, direction, &sniffing),
    }
}

/// Summarize the catch-all virtual host of a policy
pub fn catch_all(policy: &OutboundTrafficPolicy, packer: &PayloadPacker) -> CatchAllReport {
    let vh = policy.catch_all_virtual_host();
    let packed = packer.pack_or_empty(&vh);

    let route = vh.routes.first();
    let action = route.and_then(|r| r.action.as_ref()).and_then(|action| match action {
        Action::Route(route_action) => match &route_action.cluster_specifier {
            Some(ClusterSpecifier::Cluster(name)) => {
                Some(CatchAllAction::Cluster { name: name.clone() })
            }
            _ => None,
        },
        Action::DirectResponse(response) => {
            Some(CatchAllAction::DirectResponse { status: response.status })
        }
        _ => None,
    });

    CatchAllReport {
        virtual_host: vh.name.clone(),
        domains: vh.domains.clone(),
        route: route.map(|r| r.name.clone()).unwrap_or_default(),
        action,
        include_request_attempt_count: vh.include_request_attempt_count,
        type_url: packed.as_ref().map(|any| any.type_url.clone()),
        payload_bytes: packed.as_ref().map(|any| any.value.len()),
    }
}

pub fn telemetry(class: ListenerClass) -> TelemetryReport {
    TelemetryReport {
        class,
        direction: class.traffic_direction().as_str_name().to_string(),
        telemetry_mode: class.telemetry_mode(),
    }
}

pub fn transport_report(transport: TransportProtocol) -> TransportReport {
    TransportReport {
        transport,
        socket_protocol: transport.to_socket_protocol().as_str_name().to_string(),
    }
}

pub fn tunnel(types: &[TunnelType]) -> TunnelReport {
    let ability = TunnelAbility::new(types);
    TunnelReport {
        types: types.iter().map(|t| t.name().to_string()).collect(),
        bits: ability.bits(),
        supports_h2_tunnel: ability.supports_h2_tunnel(),
    }
}
