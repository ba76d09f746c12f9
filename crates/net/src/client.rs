//! TCP client for a collaborator station
//!
//! Strict request/response over one connection: every send awaits one
//! reply frame. A `Failure` reply surfaces as `Error::Rejected`.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{
    AdminFields, AssignmentInfo, BuildingTally, CandidateInfo, CoordRecord, InventoryUnit,
    Message, SelectionRound, SessionInfo, SummaryInfo, UnitInfo,
};

/// Client handle for a connection to the selection host
pub struct Client {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Client {
    /// Connect to a selection host
    #[instrument]
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(addr = %addr, "Connected to selection host");
        Ok(Self { stream, addr })
    }

    /// The host address this client is connected to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one request and await its reply
    pub async fn request(&mut self, msg: &Message) -> Result<Message> {
        let (mut reader, mut writer) = self.stream.split();
        write_frame(&mut writer, msg).await?;
        let reply = read_frame(&mut reader).await?;
        if let Message::Failure { kind, message } = reply {
            return Err(Error::Rejected(format!("{kind:?}: {message}")));
        }
        Ok(reply)
    }

    /// Log in; returns the bearer token and the operator's display name
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(String, String)> {
        let reply = self
            .request(&Message::Login {
                username: username.into(),
                password: password.into(),
            })
            .await?;
        match reply {
            Message::LoginOk {
                token,
                display_name,
            } => Ok((token, display_name)),
            other => Err(unexpected(other)),
        }
    }

    /// Exact candidate lookup
    pub async fn lookup_candidate(
        &mut self,
        token: &str,
        round: SelectionRound,
        code: &str,
    ) -> Result<CandidateInfo> {
        let reply = self
            .request(&Message::LookupCandidate {
                token: token.into(),
                round,
                code: code.into(),
            })
            .await?;
        match reply {
            Message::CandidateFound { candidate } => Ok(*candidate),
            other => Err(unexpected(other)),
        }
    }

    /// Fuzzy candidate search
    pub async fn search_candidates(
        &mut self,
        token: &str,
        round: SelectionRound,
        query: &str,
    ) -> Result<Vec<CandidateInfo>> {
        let reply = self
            .request(&Message::SearchCandidates {
                token: token.into(),
                round,
                query: query.into(),
            })
            .await?;
        match reply {
            Message::CandidateList { candidates } => Ok(candidates),
            other => Err(unexpected(other)),
        }
    }

    /// Round pool listing, optionally only the still-unselected
    pub async fn list_candidates(
        &mut self,
        token: &str,
        round: SelectionRound,
        only_unselected: bool,
    ) -> Result<Vec<CandidateInfo>> {
        let reply = self
            .request(&Message::ListCandidates {
                token: token.into(),
                round,
                only_unselected,
            })
            .await?;
        match reply {
            Message::CandidateList { candidates } => Ok(candidates),
            other => Err(unexpected(other)),
        }
    }

    /// Back-office edit of administrative columns
    pub async fn update_candidate(
        &mut self,
        token: &str,
        candidate_id: Uuid,
        fields: AdminFields,
    ) -> Result<()> {
        let reply = self
            .request(&Message::UpdateCandidate {
                token: token.into(),
                candidate_id,
                fields,
            })
            .await?;
        match reply {
            Message::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Bulk delete by explicit id list
    pub async fn delete_candidates(&mut self, token: &str, ids: Vec<Uuid>) -> Result<u64> {
        let reply = self
            .request(&Message::DeleteCandidates {
                token: token.into(),
                ids,
            })
            .await?;
        match reply {
            Message::Deleted { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Every available unit across all registered buildings
    pub async fn available_inventory(&mut self, token: &str) -> Result<Vec<InventoryUnit>> {
        let reply = self
            .request(&Message::AvailableInventory {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::InventoryList { units } => Ok(units),
            other => Err(unexpected(other)),
        }
    }

    /// Availability grid for one building
    pub async fn available_units(
        &mut self,
        token: &str,
        building: &str,
    ) -> Result<Vec<UnitInfo>> {
        let reply = self
            .request(&Message::AvailableUnits {
                token: token.into(),
                building: building.into(),
            })
            .await?;
        match reply {
            Message::UnitList { units, .. } => Ok(units),
            other => Err(unexpected(other)),
        }
    }

    /// Occupancy tallies for the map overview
    pub async fn building_stats(&mut self, token: &str) -> Result<Vec<BuildingTally>> {
        let reply = self
            .request(&Message::BuildingStats {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::BuildingStatsList { tallies } => Ok(tallies),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch the building marker registry
    pub async fn building_coords(&mut self, token: &str) -> Result<Vec<CoordRecord>> {
        let reply = self
            .request(&Message::GetBuildingCoords {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::BuildingCoords { coords } => Ok(coords),
            other => Err(unexpected(other)),
        }
    }

    /// Replace the marker registry wholesale
    pub async fn put_building_coords(
        &mut self,
        token: &str,
        coords: Vec<CoordRecord>,
    ) -> Result<()> {
        let reply = self
            .request(&Message::PutBuildingCoords {
                token: token.into(),
                coords,
            })
            .await?;
        match reply {
            Message::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Open a selection window for a candidate
    pub async fn begin_session(
        &mut self,
        token: &str,
        candidate_id: Uuid,
        round: SelectionRound,
    ) -> Result<()> {
        let reply = self
            .request(&Message::BeginSession {
                token: token.into(),
                candidate_id,
                round,
            })
            .await?;
        match reply {
            Message::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Abort the current window
    pub async fn reset_session(&mut self, token: &str) -> Result<()> {
        let reply = self
            .request(&Message::ResetSession {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Query the live timer state
    pub async fn session_status(&mut self, token: &str) -> Result<SessionInfo> {
        let reply = self
            .request(&Message::SessionStatus {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::SessionState { session } => Ok(session),
            other => Err(unexpected(other)),
        }
    }

    /// Commit a candidate's unit choice
    pub async fn commit_selection(
        &mut self,
        token: &str,
        candidate_id: Uuid,
        round: SelectionRound,
        building: &str,
        room_code: &str,
    ) -> Result<AssignmentInfo> {
        let reply = self
            .request(&Message::CommitSelection {
                token: token.into(),
                candidate_id,
                round,
                building: building.into(),
                room_code: room_code.into(),
            })
            .await?;
        match reply {
            Message::SelectionCommitted { assignment } => Ok(*assignment),
            other => Err(unexpected(other)),
        }
    }

    /// Dashboard counters
    pub async fn stats(&mut self, token: &str) -> Result<SummaryInfo> {
        let reply = self
            .request(&Message::Stats {
                token: token.into(),
            })
            .await?;
        match reply {
            Message::StatsInfo { summary } => Ok(summary),
            other => Err(unexpected(other)),
        }
    }

    /// Keep-alive probe
    pub async fn ping(&mut self) -> Result<()> {
        match self.request(&Message::Ping).await? {
            Message::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(msg: Message) -> Error {
    Error::Protocol(format!("unexpected reply: {msg:?}"))
}
