//! Serves battles to remote players over any [`Transport`].

use std::sync::Arc;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::battle::PlayerRef;
use crate::protocol::{Message, Request, Response, PROTOCOL_VERSION};
use crate::session::SessionManager;
use crate::transport::tcp::TcpTransport;
use crate::transport::Transport;

/// Runtime settings of the battle server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Connections silent for this long are dropped, and battles without a
    /// successful move for this long are forfeited by the stalling player.
    pub idle_timeout: Duration,
    /// Forfeit the player's live battle when their connection goes away.
    pub forfeit_on_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".into(),
            idle_timeout: Duration::from_secs(300),
            forfeit_on_disconnect: false,
        }
    }
}

pub struct BattleServer {
    manager: Arc<SessionManager>,
    forfeit_on_disconnect: bool,
}

impl BattleServer {
    pub fn new(manager: Arc<SessionManager>, forfeit_on_disconnect: bool) -> Self {
        Self {
            manager,
            forfeit_on_disconnect,
        }
    }

    /// Execute one request on behalf of `player`.
    pub fn handle(&self, player: &PlayerRef, request: Request) -> Response {
        let id = player.id.as_str();
        let result = match request {
            Request::GetCurrentBattle => {
                return Response::Current(self.manager.get_current_battle(id));
            }
            Request::StartBattle { opponent } => self
                .manager
                .create_or_join(player.clone(), opponent)
                .and_then(|handle| handle.snapshot_for(id)),
            Request::PlaceShip { ship_id, cells } => {
                self.manager.place_ship(id, ship_id, &cells)
            }
            Request::RemoveShip { ship_id } => self.manager.remove_ship(id, ship_id),
            Request::AutoArrange { seed } => self.manager.auto_arrange(id, seed),
            Request::CommitArrangement => self.manager.commit_arrangement(id),
            Request::FireShot { x, y } => self.manager.fire_shot(id, x, y),
            Request::Forfeit => self.manager.forfeit(id),
        };
        match result {
            Ok(snapshot) => Response::Snapshot(snapshot),
            Err(e) => Response::Failed(e.into()),
        }
    }

    /// Serve one connection until the peer goes away. The first frame must
    /// be a `Hello` naming the authenticated player.
    pub async fn serve_connection<T: Transport>(&self, mut transport: T) -> anyhow::Result<()> {
        let player = match transport.recv().await? {
            Message::Hello { version, player } if version == PROTOCOL_VERSION => player,
            Message::Hello { version, .. } => {
                let reason = format!(
                    "unsupported protocol version {} (expected {})",
                    version, PROTOCOL_VERSION
                );
                transport.send(Message::Rejected { reason: reason.clone() }).await?;
                return Err(anyhow!(reason));
            }
            _ => {
                let reason = "expected handshake".to_string();
                transport.send(Message::Rejected { reason: reason.clone() }).await?;
                return Err(anyhow!(reason));
            }
        };
        transport
            .send(Message::HelloAck {
                version: PROTOCOL_VERSION,
            })
            .await?;
        log::info!("player {} connected", player.id);

        loop {
            let msg = match transport.recv().await {
                Ok(msg) => msg,
                Err(e) => {
                    log::info!("player {} disconnected: {}", player.id, e);
                    break;
                }
            };
            let reply = match msg {
                Message::Request { seq, request } => Message::Response {
                    seq,
                    response: self.handle(&player, request),
                },
                other => {
                    log::warn!("player {} sent unexpected frame {:?}", player.id, other);
                    Message::Rejected {
                        reason: "expected a request".into(),
                    }
                }
            };
            if let Err(e) = transport.send(reply).await {
                log::info!("player {} disconnected: {}", player.id, e);
                break;
            }
        }

        if self.forfeit_on_disconnect {
            self.forfeit_abandoned(&player.id);
        }
        Ok(())
    }

    fn forfeit_abandoned(&self, player_id: &str) {
        let Some(handle) = self.manager.find(player_id) else {
            return;
        };
        if handle.is_ended() {
            return;
        }
        match self.manager.forfeit(player_id) {
            Ok(_) => log::info!(
                "battle {}: {} forfeited after disconnect",
                handle.id(),
                player_id
            ),
            Err(e) => log::debug!("battle {}: disconnect forfeit skipped: {}", handle.id(), e),
        }
    }

    /// Accept TCP connections forever, one task per connection.
    pub async fn listen(self: Arc<Self>, listener: TcpListener, idle_timeout: Duration) -> anyhow::Result<()> {
        log::info!("listening on {}", listener.local_addr()?);
        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("connection from {}", addr);
            let server = self.clone();
            tokio::spawn(async move {
                let transport = TcpTransport::with_timeout(stream, idle_timeout);
                if let Err(e) = server.serve_connection(transport).await {
                    log::warn!("connection from {} failed: {}", addr, e);
                }
            });
        }
    }
}

/// Periodically forfeit battles nobody has moved in for `max_idle`.
pub fn spawn_idle_sweeper(manager: Arc<SessionManager>, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 4).max(Duration::from_millis(10));
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            let ended = manager.forfeit_idle(max_idle);
            if !ended.is_empty() {
                log::info!("idle sweep forfeited battles {:?}", ended);
            }
        }
    })
}

/// Bind, start the idle sweeper and serve until the listener fails.
pub async fn run(manager: Arc<SessionManager>, config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    let sweeper = spawn_idle_sweeper(manager.clone(), config.idle_timeout);
    let server = Arc::new(BattleServer::new(manager, config.forfeit_on_disconnect));
    let result = server.listen(listener, config.idle_timeout).await;
    sweeper.abort();
    result
}
