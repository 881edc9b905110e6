//! Remote access to a battle server.

use anyhow::anyhow;

use crate::battle::PlayerRef;
use crate::common::{BattleError, Coord};
use crate::protocol::{Message, Request, Response, PROTOCOL_VERSION};
use crate::ship::ShipId;
use crate::snapshot::BattleSnapshot;
use crate::transport::Transport;

/// Outcome of a remote operation: the caller's snapshot or the engine's
/// rejection. Transport failures are reported separately by the outer
/// `anyhow::Result`.
pub type Reply = Result<BattleSnapshot, BattleError>;

pub struct BattleClient<T: Transport> {
    transport: T,
    player: PlayerRef,
    seq: u64,
}

impl<T: Transport> BattleClient<T> {
    /// Perform the handshake for `player` over `transport`.
    pub async fn connect(mut transport: T, player: PlayerRef) -> anyhow::Result<Self> {
        transport
            .send(Message::Hello {
                version: PROTOCOL_VERSION,
                player: player.clone(),
            })
            .await?;
        match transport.recv().await? {
            Message::HelloAck { version } if version == PROTOCOL_VERSION => {}
            Message::HelloAck { version } => {
                return Err(anyhow!("server speaks protocol version {}", version))
            }
            Message::Rejected { reason } => return Err(anyhow!("rejected: {}", reason)),
            other => return Err(anyhow!("unexpected handshake reply {:?}", other)),
        }
        Ok(Self {
            transport,
            player,
            seq: 0,
        })
    }

    pub fn player(&self) -> &PlayerRef {
        &self.player
    }

    async fn call(&mut self, request: Request) -> anyhow::Result<Response> {
        self.seq += 1;
        let seq = self.seq;
        self.transport.send(Message::Request { seq, request }).await?;
        match self.transport.recv().await? {
            Message::Response { seq: got, response } if got == seq => Ok(response),
            Message::Response { seq: got, .. } => {
                Err(anyhow!("response {} does not match request {}", got, seq))
            }
            Message::Rejected { reason } => Err(anyhow!("rejected: {}", reason)),
            other => Err(anyhow!("unexpected message {:?}", other)),
        }
    }

    async fn mutate(&mut self, request: Request) -> anyhow::Result<Reply> {
        match self.call(request).await? {
            Response::Snapshot(snapshot) => Ok(Ok(snapshot)),
            Response::Failed(e) => Ok(Err(e.error)),
            Response::Current(_) => Err(anyhow!("unexpected response")),
        }
    }

    pub async fn current_battle(&mut self) -> anyhow::Result<Option<BattleSnapshot>> {
        match self.call(Request::GetCurrentBattle).await? {
            Response::Current(snapshot) => Ok(snapshot),
            _ => Err(anyhow!("unexpected response")),
        }
    }

    pub async fn start_battle(&mut self, opponent: PlayerRef) -> anyhow::Result<Reply> {
        self.mutate(Request::StartBattle { opponent }).await
    }

    pub async fn place_ship(&mut self, ship_id: ShipId, cells: Vec<Coord>) -> anyhow::Result<Reply> {
        self.mutate(Request::PlaceShip { ship_id, cells }).await
    }

    pub async fn remove_ship(&mut self, ship_id: ShipId) -> anyhow::Result<Reply> {
        self.mutate(Request::RemoveShip { ship_id }).await
    }

    pub async fn auto_arrange(&mut self, seed: Option<u64>) -> anyhow::Result<Reply> {
        self.mutate(Request::AutoArrange { seed }).await
    }

    pub async fn commit(&mut self) -> anyhow::Result<Reply> {
        self.mutate(Request::CommitArrangement).await
    }

    pub async fn fire(&mut self, x: u8, y: u8) -> anyhow::Result<Reply> {
        self.mutate(Request::FireShot { x, y }).await
    }

    pub async fn forfeit(&mut self) -> anyhow::Result<Reply> {
        self.mutate(Request::Forfeit).await
    }
}
