//! TCP server for the selection host
//!
//! Collaborator stations connect here. The protocol is strict
//! request/response: each incoming frame produces exactly one reply
//! frame on the same connection. Token checks happen before any
//! request touches the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::gateway::{Gateway, GatewayError};
use crate::protocol::{CoordRecord, ErrorKind, Message};

/// Selection host server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Start a new server on the given port
    pub async fn start<G: Gateway>(port: u16, gateway: Arc<G>) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Selection host server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, gateway, shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop<G: Gateway>(
    listener: TcpListener,
    gateway: Arc<G>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let gateway = gateway.clone();
                        tokio::spawn(handle_connection(stream, addr, gateway));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single collaborator connection
async fn handle_connection<G: Gateway>(stream: TcpStream, addr: SocketAddr, gateway: Arc<G>) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        let request = match read_frame(&mut reader).await {
            Ok(msg) => msg,
            Err(Error::ConnectionClosed) => {
                debug!(addr = %addr, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Read error");
                break;
            }
        };

        let reply = dispatch(request, gateway.as_ref());
        if let Err(e) = write_frame(&mut writer, &reply).await {
            warn!(addr = %addr, error = %e, "Write failed");
            break;
        }
    }
}

/// Route one request through the gateway
fn dispatch<G: Gateway>(request: Message, gateway: &G) -> Message {
    // Token gate first; login and ping are the only ways in without one
    if let Some(token) = request.token() {
        if let Err(e) = gateway.authorize(token) {
            return failure(e);
        }
    }

    match request {
        Message::Ping => Message::Pong,

        Message::Login { username, password } => {
            match gateway.login(&username, &password) {
                Ok(info) => Message::LoginOk {
                    token: info.token,
                    display_name: info.display_name,
                },
                Err(e) => failure(e),
            }
        }

        Message::LookupCandidate { round, code, .. } => {
            match gateway.lookup_candidate(round, &code) {
                Ok(candidate) => Message::CandidateFound {
                    candidate: Box::new(candidate),
                },
                Err(e) => failure(e),
            }
        }

        Message::SearchCandidates { round, query, .. } => {
            match gateway.search_candidates(round, &query) {
                Ok(candidates) => Message::CandidateList { candidates },
                Err(e) => failure(e),
            }
        }

        Message::ListCandidates {
            round,
            only_unselected,
            ..
        } => match gateway.list_candidates(round, only_unselected) {
            Ok(candidates) => Message::CandidateList { candidates },
            Err(e) => failure(e),
        },

        Message::UpdateCandidate {
            candidate_id,
            fields,
            ..
        } => match gateway.update_candidate(candidate_id, fields) {
            Ok(()) => Message::Ack,
            Err(e) => failure(e),
        },

        Message::DeleteCandidates { ids, .. } => match gateway.delete_candidates(&ids) {
            Ok(count) => Message::Deleted { count },
            Err(e) => failure(e),
        },

        Message::AvailableInventory { .. } => match gateway.available_inventory() {
            Ok(units) => Message::InventoryList { units },
            Err(e) => failure(e),
        },

        Message::AvailableUnits { building, .. } => match gateway.available_units(&building) {
            Ok(units) => Message::UnitList { building, units },
            Err(e) => failure(e),
        },

        Message::BuildingStats { .. } => match gateway.building_stats() {
            Ok(tallies) => Message::BuildingStatsList { tallies },
            Err(e) => failure(e),
        },

        Message::GetBuildingCoords { .. } => match gateway.coords() {
            Ok(coords) => Message::BuildingCoords { coords },
            Err(e) => failure(e),
        },

        Message::PutBuildingCoords { coords, .. } => match normalize_batch(coords) {
            Ok(coords) => match gateway.replace_coords(coords) {
                Ok(()) => Message::Ack,
                Err(e) => failure(e),
            },
            Err(message) => Message::Failure {
                kind: ErrorKind::Validation,
                message,
            },
        },

        Message::BeginSession {
            candidate_id, round, ..
        } => match gateway.begin_session(candidate_id, round) {
            Ok(()) => Message::Ack,
            Err(e) => failure(e),
        },

        Message::ResetSession { .. } => match gateway.reset_session() {
            Ok(()) => Message::Ack,
            Err(e) => failure(e),
        },

        Message::SessionStatus { .. } => match gateway.session_status() {
            Ok(session) => Message::SessionState { session },
            Err(e) => failure(e),
        },

        Message::CommitSelection {
            candidate_id,
            round,
            building,
            room_code,
            ..
        } => match gateway.commit_selection(candidate_id, round, &building, &room_code) {
            Ok(assignment) => Message::SelectionCommitted {
                assignment: Box::new(assignment),
            },
            Err(e) => failure(e),
        },

        Message::Stats { .. } => match gateway.stats() {
            Ok(summary) => Message::StatsInfo { summary },
            Err(e) => failure(e),
        },

        other => {
            warn!(?other, "Unexpected message from collaborator");
            Message::Failure {
                kind: ErrorKind::Validation,
                message: "unexpected message".into(),
            }
        }
    }
}

/// Normalize a coordinate batch; any bad entry rejects the whole batch
fn normalize_batch(coords: Vec<CoordRecord>) -> std::result::Result<Vec<CoordRecord>, String> {
    coords.into_iter().map(CoordRecord::normalized).collect()
}

fn failure(e: GatewayError) -> Message {
    Message::Failure {
        kind: e.kind,
        message: e.message,
    }
}
