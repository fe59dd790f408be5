//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Unix-domain datagram transport. Grounded on `holo-daemon`'s northbound
// gRPC listener in spirit only (own-thread service loop, graceful
// shutdown via a stop flag) but built against `std::os::unix::net`
// instead of tonic/tokio: the core's transport contract
// (`transport_recv`/`transport_send`/`transport_disconnect`) is a
// best-effort unicast datagram exchange, which a blocking socket serves
// just as well as an async one and without pulling in an async runtime
// for a single-socket service.

use std::collections::HashMap;
use std::os::unix::net::{SocketAddr, UnixDatagram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use fci_core::codec::{self, MessageRecord};
use fci_core::dispatch::Endpoint;
use fci_core::transport::Transport;
use fci_types::Errno;
use tracing::{debug, error, warn};

const RECV_BUF_LEN: usize = 512;

/// Maps the abstract sender IDs carried inside command payloads back to
/// the OS-level datagram address they last sent from, so a reply or
/// broadcast can find its way back without the protocol itself carrying
/// socket paths.
pub struct UnixDatagramTransport {
    socket: UnixDatagram,
    peers: Mutex<HashMap<u32, SocketAddr>>,
    stopped: AtomicBool,
}

impl UnixDatagramTransport {
    pub fn bind(path: &str) -> std::io::Result<Self> {
        let _ = std::fs::remove_file(path);
        let socket = UnixDatagram::bind(path)?;
        Ok(Self {
            socket,
            peers: Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })
    }

    fn remember_peer(&self, sender: u32, addr: SocketAddr) {
        self.peers.lock().unwrap().insert(sender, addr);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Runs the blocking receive loop on the calling thread. One thread
    /// per listening socket, matching the "no internal thread pool"
    /// scheduling model: the only concurrency is whichever thread the
    /// transport happens to deliver a message on.
    pub fn serve(&self, endpoint: &Endpoint) {
        let mut buf = [0u8; RECV_BUF_LEN];
        while !self.stopped.load(Ordering::SeqCst) {
            let (n, addr) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "transport recv failed");
                    continue;
                }
            };
            let frame = Bytes::copy_from_slice(&buf[..n]);
            let record = match codec::parse(frame) {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = ?e, "dropping malformed frame");
                    continue;
                }
            };
            if let Some(sender) = sender_of(&record) {
                self.remember_peer(sender, addr);
            }
            if let Some(reply) = endpoint.process(record) {
                let frame = codec::emit(&reply, endpoint.reply_framing());
                if let Err(e) = self.socket.send_to_addr(&frame, &addr) {
                    warn!(error = %e, "reply send failed");
                }
            }
        }
    }
}

fn sender_of(record: &MessageRecord) -> Option<u32> {
    match record {
        MessageRecord::ClientRegister { sender } | MessageRecord::ClientUnregister { sender } => {
            Some(*sender)
        }
        MessageRecord::Cmd(body) | MessageRecord::CoreClientBroadcast(body) => Some(body.sender),
    }
}

impl Transport for UnixDatagramTransport {
    fn send(&self, dest: u32, frame: &[u8]) -> Result<(), Errno> {
        let addr = {
            let peers = self.peers.lock().unwrap();
            peers.get(&dest).cloned()
        };
        let addr = match addr {
            Some(a) => a,
            None => {
                error!(dest, "no known address for sender");
                return Err(Errno::Enotfound);
            }
        };
        self.socket.send_to_addr(frame, &addr).map(|_| ()).map_err(|e| {
            error!(dest, error = %e, "send failed");
            Errno::Efault
        })
    }
}
