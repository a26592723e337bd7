//! # Ingress boundary
//!
//! Accepts TCP connections, reads 3-byte frames, and calls `on_message`;
//! forwards worker-completion notifications to `on_idle`. Grounded on
//! `ros_inet.c`'s `get_bound_socket`/`on_message`/`on_new_connection`, but
//! ported from a single-threaded `poll(2)` loop to one reader thread per
//! accepted connection plus one reader thread on the notify pipe, all
//! funneling events through an `mpsc::Sender` to a single controller
//! thread that owns the `Scheduler` — keeping every scheduler mutation
//! serialized without reimplementing a poll loop Rust's standard library
//! makes unnecessary at this connection count.

use std::io::{ErrorKind, Read};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::RawFd;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use nix::unistd::{pipe, read as nix_read};
use tracing::{debug, info, warn};

use crate::error::ExecError;
use crate::scheduler::Scheduler;

/// One event delivered to the scheduler's controller thread: either a
/// parsed 3-byte request frame, or a worker-completion notification.
enum Event {
    Message { task_id: usize, prio: u8, data: u8 },
    Idle,
}

/// Owns the bound TCP listener and the notify pipe's read end. Construct
/// with [`Listener::bind`], then hand it to [`Listener::serve`] together
/// with the `Scheduler` it should drive.
pub struct Listener {
    tcp: TcpListener,
    notify_read_fd: RawFd,
}

impl Listener {
    /// Binds a `TcpListener` on `port` (matching `get_bound_socket`'s role)
    /// and creates the notify pipe workers write completion bytes to.
    /// Returns the listener plus the write-fd that must be handed to every
    /// forked worker.
    pub fn bind(port: u16) -> Result<(Listener, RawFd), ExecError> {
        let tcp = TcpListener::bind(("0.0.0.0", port)).map_err(|e| ExecError::Bind {
            addr: format!("0.0.0.0:{port}"),
            source: e,
        })?;
        let (read_fd, write_fd) = pipe().map_err(|e| ExecError::Io(e.into()))?;
        let write_raw = std::os::fd::IntoRawFd::into_raw_fd(write_fd);
        let read_raw = std::os::fd::IntoRawFd::into_raw_fd(read_fd);
        Ok((
            Listener {
                tcp,
                notify_read_fd: read_raw,
            },
            write_raw,
        ))
    }

    /// Runs the ingress boundary forever, driving `scheduler`'s
    /// `on_message`/`on_idle` from a single controller thread fed by the
    /// accept loop, per-connection readers, and the notify-pipe reader.
    /// Never returns under normal operation.
    pub fn serve(self, mut scheduler: Scheduler) -> ! {
        let (tx, rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let notify_tx = tx.clone();
        let notify_fd = self.notify_read_fd;
        thread::spawn(move || notify_reader(notify_fd, notify_tx));

        let accept_tx = tx;
        let tcp = self.tcp;
        thread::spawn(move || accept_loop(tcp, accept_tx));

        for event in rx {
            match event {
                Event::Message {
                    task_id,
                    prio,
                    data,
                } => scheduler.on_message(task_id, prio, data),
                Event::Idle => scheduler.on_idle(),
            }
        }

        unreachable!("controller channel closed: all senders dropped")
    }
}

fn accept_loop(tcp: TcpListener, tx: Sender<Event>) {
    for conn in tcp.incoming() {
        match conn {
            Ok(stream) => {
                info!("accepted a new connection");
                let tx = tx.clone();
                thread::spawn(move || connection_reader(stream, tx));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
}

/// Reads 3-byte frames from `stream` in a loop, forwarding each as an
/// `Event::Message`. A short read (fewer than 3 bytes, or a closed
/// connection) ends this thread.
fn connection_reader(mut stream: TcpStream, tx: Sender<Event>) {
    let mut frame = [0u8; 3];
    loop {
        match stream.read_exact(&mut frame) {
            Ok(()) => {
                let event = Event::Message {
                    task_id: frame[0] as usize,
                    prio: frame[1],
                    data: frame[2],
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("connection closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "short read, closing connection");
                return;
            }
        }
    }
}

/// Reads completion bytes from the notify pipe forever, forwarding each as
/// an `Event::Idle`. One byte per worker-finished-a-callback notification;
/// the byte's value (the notifying task_id) is informational only — the
/// scheduler re-evaluates priority over the whole task set either way.
fn notify_reader(fd: RawFd, tx: Sender<Event>) {
    let mut buf = [0u8; 1];
    loop {
        let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
        match nix_read(borrowed, &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                if tx.send(Event::Idle).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "notify pipe read failed");
                return;
            }
        }
    }
}
