//! Provider thread for the comment widget: owns the service, executes the
//! widget's commands and keeps the live list subscription alive, pushing
//! every change back over the delta channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::comment_service::CommentService;
use crate::comments::{AuthPhase, Delta, WidgetCommand};

const TICK: Duration = Duration::from_millis(50);

/// Handle to a live subscription. Re-initializing a widget must `close`
/// the old handle before spawning a new provider, otherwise two listeners
/// poll the same page.
pub struct Subscription {
    stop: Arc<AtomicBool>,
}

impl Subscription {
    /// Stop the provider loop. Idempotent; the thread exits within a tick.
    pub fn close(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Spawn the provider for one widget instance. Deltas flow through `tx`;
/// the loop ends when the subscription is closed or the command channel
/// disconnects. The list is re-delivered every `poll` interval and
/// immediately after any write, so the UI sees its own changes without
/// waiting out the interval.
pub fn spawn_provider(
    mut service: Box<dyn CommentService>,
    page_key: String,
    poll: Duration,
    tx: Sender<Delta>,
    cmd_rx: Receiver<WidgetCommand>,
) -> Subscription {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    thread::spawn(move || {
        let poll = poll.max(TICK);
        let mut page_key = page_key;
        let mut next_poll = Instant::now();

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }

            let mut refresh_now = false;
            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => {
                        if handle_command(&mut *service, &mut page_key, &tx, cmd) {
                            refresh_now = true;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            if refresh_now || Instant::now() >= next_poll {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                deliver_snapshot(&*service, &page_key, &tx);
                next_poll = Instant::now() + poll;
            }

            thread::sleep(TICK);
        }
    });

    Subscription { stop }
}

/// Execute one widget command. Returns true when the list should be
/// re-delivered right away.
fn handle_command(
    service: &mut dyn CommentService,
    page_key: &mut String,
    tx: &Sender<Delta>,
    cmd: WidgetCommand,
) -> bool {
    match cmd {
        WidgetCommand::SignIn => {
            let _ = tx.send(Delta::AuthChanged(AuthPhase::Authenticating));
            match service.sign_in() {
                Ok(user) => {
                    let _ = tx.send(Delta::Log(format!("[INFO] Sesión iniciada: {}", user.name)));
                    let _ = tx.send(Delta::AuthChanged(AuthPhase::Authenticated(user)));
                }
                Err(err) => {
                    let _ = tx.send(Delta::Log(format!("[WARN] Fallo de autenticación: {err}")));
                    let _ = tx.send(Delta::AuthChanged(AuthPhase::Anonymous));
                }
            }
            false
        }
        WidgetCommand::SignOut => match service.sign_out() {
            Ok(()) => {
                let _ = tx.send(Delta::AuthChanged(AuthPhase::Anonymous));
                false
            }
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Fallo al cerrar sesión: {err}")));
                false
            }
        },
        WidgetCommand::Post { text } => match service.add_comment(page_key, &text) {
            Ok(_) => {
                let _ = tx.send(Delta::PostFinished { error: None });
                true
            }
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Error al publicar: {err}")));
                let _ = tx.send(Delta::PostFinished {
                    error: Some(err.to_string()),
                });
                false
            }
        },
        WidgetCommand::Delete { id } => match service.delete_comment(page_key, &id) {
            Ok(()) => {
                let _ = tx.send(Delta::DeleteFinished { id, error: None });
                true
            }
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Error al borrar: {err}")));
                let _ = tx.send(Delta::DeleteFinished {
                    id,
                    error: Some(err.to_string()),
                });
                false
            }
        },
        WidgetCommand::Resubscribe { page_key: new_key } => {
            *page_key = new_key;
            true
        }
    }
}

fn deliver_snapshot(service: &dyn CommentService, page_key: &str, tx: &Sender<Delta>) {
    match service.list_comments(page_key) {
        Ok(comments) => {
            let _ = tx.send(Delta::SetComments(comments));
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Error de suscripción: {err}")));
            let _ = tx.send(Delta::SubscriptionError(err.to_string()));
        }
    }
}
