//! Named SNMP management queries.
//!
//! Queries are connectionless and independent of the device command path.
//! Each query reads one scalar object from the device's SNMP agent.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use dci_config::Config;
use dci_protocol::snmp::{self, ObjectIdentifier, SnmpError};
use thiserror::Error;
use tracing::{debug, warn};

/// Tracing target for management queries.
pub const MANAGEMENT_TARGET: &str = "dci_cli::management";

/// Pseudo-name that runs every registered query.
pub const ALL_QUERIES: &str = "All";

const MAX_DATAGRAM: usize = 65_507;

/// A named management object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementQuery {
    /// Operator-facing name.
    pub name: &'static str,
    /// Dotted object identifier.
    pub oid: &'static str,
}

impl ManagementQuery {
    /// Declares a query.
    #[must_use]
    pub const fn new(name: &'static str, oid: &'static str) -> Self {
        Self { name, oid }
    }
}

/// MIB-II system group objects.
pub const BUILTIN_QUERIES: &[ManagementQuery] = &[
    ManagementQuery::new("Description", "1.3.6.1.2.1.1.1.0"),
    ManagementQuery::new("ObjectId", "1.3.6.1.2.1.1.2.0"),
    ManagementQuery::new("Uptime", "1.3.6.1.2.1.1.3.0"),
    ManagementQuery::new("Contact", "1.3.6.1.2.1.1.4.0"),
    ManagementQuery::new("Name", "1.3.6.1.2.1.1.5.0"),
    ManagementQuery::new("Location", "1.3.6.1.2.1.1.6.0"),
];

/// Management query failures.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No query is registered under the name.
    #[error("unknown query '{0}'")]
    UnknownQuery(String),
    /// The name is already registered.
    #[error("query '{0}' is already registered")]
    DuplicateQuery(String),
    /// The address could not be resolved.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        /// Address as given.
        address: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Sending or receiving the datagram failed or timed out.
    #[error("SNMP exchange with {address} failed: {source}")]
    Exchange {
        /// Agent address.
        address: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// The request or response could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] SnmpError),
    /// The agent reported an error status.
    #[error("agent returned error status {status} (index {index})")]
    Agent {
        /// SNMP error-status.
        status: i64,
        /// SNMP error-index.
        index: i64,
    },
    /// The agent has no value for the object.
    #[error("{oid}: {reason}")]
    NoValue {
        /// Object identifier.
        oid: String,
        /// Exception text from the agent.
        reason: String,
    },
}

/// Performs a single-object read against an agent.
pub trait ManagementProtocol {
    /// Reads `oid` from the agent at `address` and renders the value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for transport, codec, or agent failures.
    fn get(&self, address: &str, oid: &ObjectIdentifier) -> Result<String, QueryError>;
}

/// SNMPv2c `GetRequest` over UDP.
#[derive(Debug)]
pub struct SnmpClient {
    port: u16,
    community: String,
    timeout: Duration,
    request_ids: AtomicI32,
}

impl SnmpClient {
    /// Builds a client for agents on `port`.
    pub fn new(port: u16, community: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port,
            community: community.into(),
            timeout,
            request_ids: AtomicI32::new(0),
        }
    }

    /// Builds a client from the SNMP settings in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.snmp_port(),
            config.snmp_community(),
            config.snmp_timeout(),
        )
    }

    fn next_request_id(&self) -> i32 {
        self.request_ids.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & i32::MAX
    }

    fn exchange(&self, target: SocketAddr, request: &[u8]) -> io::Result<Vec<u8>> {
        let bind: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0_u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        socket.connect(target)?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.set_write_timeout(Some(self.timeout))?;
        socket.send(request)?;
        let mut buffer = vec![0_u8; MAX_DATAGRAM];
        let received = socket.recv(&mut buffer)?;
        buffer.truncate(received);
        Ok(buffer)
    }
}

impl ManagementProtocol for SnmpClient {
    fn get(&self, address: &str, oid: &ObjectIdentifier) -> Result<String, QueryError> {
        let target = (address, self.port)
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
                })
            })
            .map_err(|source| QueryError::Resolve {
                address: address.to_owned(),
                source,
            })?;
        let request_id = self.next_request_id();
        let request = snmp::encode_get_request(&self.community, request_id, oid)?;
        debug!(target: MANAGEMENT_TARGET, %target, %oid, request_id, "sending SNMP get");

        let bytes = self
            .exchange(target, &request)
            .map_err(|source| QueryError::Exchange {
                address: target.to_string(),
                source,
            })?;
        let response = snmp::decode_get_response(&bytes)?;
        if response.request_id != request_id {
            warn!(
                target: MANAGEMENT_TARGET,
                sent = request_id,
                received = response.request_id,
                "SNMP response carries a different request id"
            );
        }
        if response.error_status != 0 {
            return Err(QueryError::Agent {
                status: response.error_status,
                index: response.error_index,
            });
        }
        if response.value.is_exception() {
            return Err(QueryError::NoValue {
                oid: response.oid.to_string(),
                reason: response.value.to_string(),
            });
        }
        Ok(response.value.to_string())
    }
}

/// Registry of named queries bound to a protocol implementation.
#[derive(Debug)]
pub struct ManagementQueryClient<P: ManagementProtocol> {
    queries: Vec<ManagementQuery>,
    protocol: P,
}

impl<P: ManagementProtocol> ManagementQueryClient<P> {
    /// Creates an empty registry.
    pub const fn new(protocol: P) -> Self {
        Self {
            queries: Vec::new(),
            protocol,
        }
    }

    /// Creates a registry holding [`BUILTIN_QUERIES`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicateQuery`] if the built-in table repeats a
    /// name.
    pub fn builtin(protocol: P) -> Result<Self, QueryError> {
        let mut client = Self::new(protocol);
        for query in BUILTIN_QUERIES {
            client.register(*query)?;
        }
        Ok(client)
    }

    /// Adds a query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicateQuery`] when the name is taken.
    pub fn register(&mut self, query: ManagementQuery) -> Result<(), QueryError> {
        if self.queries.iter().any(|existing| existing.name == query.name) {
            return Err(QueryError::DuplicateQuery(query.name.to_owned()));
        }
        self.queries.push(query);
        Ok(())
    }

    /// Registered queries in registration order.
    pub fn queries(&self) -> &[ManagementQuery] {
        &self.queries
    }

    /// Runs the query called `name` against `address`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownQuery`] for unregistered names, otherwise
    /// whatever the protocol reports.
    pub fn query(&self, name: &str, address: &str) -> Result<String, QueryError> {
        let query = self
            .queries
            .iter()
            .find(|query| query.name == name)
            .ok_or_else(|| QueryError::UnknownQuery(name.to_owned()))?;
        self.run(query, address)
    }

    /// Runs every query in registration order. A failing query never stops
    /// the others.
    pub fn query_all(&self, address: &str) -> Vec<(&'static str, Result<String, QueryError>)> {
        self.queries
            .iter()
            .map(|query| (query.name, self.run(query, address)))
            .collect()
    }

    fn run(&self, query: &ManagementQuery, address: &str) -> Result<String, QueryError> {
        let oid: ObjectIdentifier = query.oid.parse()?;
        let outcome = self.protocol.get(address, &oid);
        if let Err(error) = &outcome {
            debug!(
                target: MANAGEMENT_TARGET,
                query = query.name,
                %error,
                "management query failed"
            );
        }
        outcome
    }
}
