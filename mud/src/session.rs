//! Session Layer: one task per accepted TCP connection, split
//! into a reader that pulls `ClientFrame`s off the socket and a
//! dedicated writer task draining a per-connection channel, so the
//! game-state lock is never held across socket I/O. Everything
//! past `register`/`login` is a thin loop handing `ClientFrame::Command`
//! strings to the dispatcher and the resulting frames to the writer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use mud_core::{MessageType, Username};
use mud_protocol::{codec, ClientFrame, ServerFrame};
use mud_world::{presence, Emissions};

use crate::AppState;

/// Drives one connection end to end: unauthenticated frame exchange,
/// then the authenticated command loop, then disconnect housekeeping.
/// Never panics on a malformed or hostile peer -- any protocol or I/O
/// failure just ends the loop.
pub async fn handle_connection(app: Arc<AppState>, stream: TcpStream, addr: SocketAddr) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<ServerFrame>();
    let writer_handle = tokio::spawn(run_writer(write_half, outbox_rx));

    let (username, mut disconnect_rx) = match authenticate(&app, &mut reader, &outbox_tx, addr).await {
        Some(pair) => pair,
        None => {
            drop(outbox_tx);
            let _ = writer_handle.await;
            return;
        }
    };

    log::info!("{} logged in from {addr}", username.as_str());

    // Only a bare socket loss or protocol error leaves this
    // connection's own disconnect signal unfired -- a self-issued
    // `quit`/`reset-account`/`delete-account` or a displacing login
    // fires it as part of running that command, and housekeeping for
    // those has already run by the time the loop below notices.
    let mut needs_housekeeping = true;

    loop {
        tokio::select! {
            frame = codec::read_client_frame(&mut reader) => {
                match frame {
                    Ok(Some(ClientFrame::Command { command })) => {
                        if run_command(&app, &username, &command).await {
                            needs_housekeeping = false;
                            break;
                        }
                    }
                    Ok(Some(_)) => {
                        // Already authenticated; a stray register/login frame is ignored.
                    }
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!("{} dropped: {e}", username.as_str());
                        break;
                    }
                }
            }
            _ = &mut disconnect_rx => {
                log::info!("{} displaced by a newer login", username.as_str());
                needs_housekeeping = false;
                break;
            }
        }
    }

    if needs_housekeeping {
        let mut world = app.world.lock().await;
        let mut emissions = Emissions::new();
        presence::disconnect_housekeeping(&mut world, &username, &mut emissions);
        crate::bus::deliver(&world, emissions);
    }

    drop(outbox_tx);
    let _ = writer_handle.await;
}

/// Forwards every frame placed on `outbox_rx` to the socket until the
/// channel is closed (connection is ending either way). Runs in its
/// own task so a slow or wedged peer never blocks the game lock.
async fn run_writer(mut writer: tokio::net::tcp::OwnedWriteHalf, mut outbox_rx: mpsc::UnboundedReceiver<ServerFrame>) {
    while let Some(frame) = outbox_rx.recv().await {
        if let Err(e) = codec::write_server_frame(&mut writer, &frame).await {
            log::warn!("write failed, ending writer task: {e}");
            break;
        }
    }
}

/// Handles `register`/`login` frames until one succeeds or the
/// connection gives up. On success, displaces any existing connection
/// for the same username, attaches the new player record, and returns
/// both the username and the `oneshot::Receiver` the command loop
/// selects on to notice a future displacement.
async fn authenticate(
    app: &Arc<AppState>,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    outbox_tx: &mpsc::UnboundedSender<ServerFrame>,
    addr: SocketAddr,
) -> Option<(Username, oneshot::Receiver<()>)> {
    let client_ip = addr.ip().to_string();

    loop {
        let frame = match codec::read_client_frame(reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("auth read failed from {addr}: {e}");
                return None;
            }
        };

        let (username_raw, password_raw, is_register) = match frame {
            ClientFrame::Register { username, password } => (username, password, true),
            ClientFrame::Login { username, password } => (username, password, false),
            ClientFrame::Command { .. } => {
                let _ = outbox_tx.send(ServerFrame::error("log in or register first"));
                continue;
            }
        };

        let mut world = app.world.lock().await;
        let result = if is_register {
            mud_world::auth::register(&mut world, app.cfg, &client_ip, &username_raw, &password_raw)
        } else {
            mud_world::auth::login(&mut world, app.cfg, &client_ip, &username_raw, &password_raw)
        };

        let player = match result {
            Ok(player) => player,
            Err(e) => {
                drop(world);
                let _ = outbox_tx.send(ServerFrame::error(e.to_string()));
                continue;
            }
        };

        let username = player.username.clone();
        let mut emissions = Emissions::new();

        if world.is_attached(&username) {
            let (_, old_signal) = presence::displace(&mut world, &username, &mut emissions);
            if let Some(signal) = old_signal {
                let _ = signal.send(());
            }
        }

        let (disconnect_tx, disconnect_rx) = oneshot::channel();
        world.attach_player(player.clone(), outbox_tx.clone(), disconnect_tx);

        let payload = serde_json::to_value(&player).ok();
        let _ = outbox_tx.send(ServerFrame::Auth { success: true, player: payload });

        let look_text = mud_world::movement::look(&world, app.cfg, &username).unwrap_or_default();
        emissions.to_player(&username, MessageType::Info, look_text);
        emissions.to_room(&player.location, MessageType::System, format!("{} has connected.", username.as_str()), Some(&username));
        crate::bus::deliver(&world, emissions);
        drop(world);

        return Some((username, disconnect_rx));
    }
}

/// Runs one command under the game lock and delivers its emissions.
/// Returns whether this connection's own read loop should stop: true
/// for a self-issued `quit`/`reset-account`/`delete-account`, whose
/// disconnect housekeeping has already run by the time this returns.
async fn run_command(app: &Arc<AppState>, username: &Username, command: &str) -> bool {
    let mut rng = rand::thread_rng();
    let mut world = app.world.lock().await;
    let (emissions, outcome) = crate::dispatch::dispatch(&mut world, app.cfg, &mut rng, username, command);
    crate::bus::deliver(&world, emissions);

    if let Some(signal) = outcome.fire_signal {
        let _ = signal.send(());
    }
    outcome.self_disconnect
}
