//! Network service fabric: listening sockets, outbound connectors, per-client
//! send queues and the wire framers/encoders that sit between raw sockets
//! and the decode layer (spec.md §4.7/§4.8, §6.1).

pub mod client;
pub mod connector;
pub mod encode;
pub mod framing;
pub mod service;

pub use client::{Client, ClientError};
pub use connector::{Connector, ConnectorState};
pub use framing::{BeastFrame, FramingMode, Framer};
pub use service::Service;
