//! Anju Network Library
//!
//! TCP-based collaborator access to a selection host.
//!
//! # Architecture
//!
//! - **Server**: Run by the selection host, answers requests
//! - **Client**: A collaborator station's connection to the host
//! - **Protocol**: Length-prefixed JSON request/response messages
//! - **Gateway**: The trait the hosting application implements to put
//!   its dataset behind the server
//!
//! # Usage
//!
//! ```ignore
//! // Host starts a server over its gateway
//! let server = Server::start(DEFAULT_PORT, gateway).await?;
//!
//! // A collaborator connects and logs in
//! let mut client = Client::connect(addr).await?;
//! let (token, _name) = client.login("operator", "password").await?;
//! let units = client.available_units(&token, "西区_3").await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod gateway;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayError, GatewayResult, LoginInfo};
pub use protocol::{
    AdminFields, AssignmentInfo, BuildingTally, CandidateInfo, CoordRecord, ErrorKind,
    InventoryUnit, Message, SelectionRound, SessionInfo, SessionPhase, SummaryInfo, UnitInfo,
};
pub use server::Server;

/// Default port for Anju selection hosts
pub const DEFAULT_PORT: u16 = 7341;
