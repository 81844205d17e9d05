//! Host shell: wires the synchronous core to real I/O.
//!
//! The core knows nothing about sockets, stdin, stdout, or clocks — it only
//! sees the [`Adapter`] contract and its four entry points.  This module
//! supplies all of that for the command-line binary:
//!
//! - a `tokio::net::UdpSocket` as the unreliable datagram service,
//! - process stdin/stdout as the connection's byte streams,
//! - a `tokio::time::interval` as the tick source,
//! - [`HostAdapter`], buffering in both directions so every core-facing
//!   call stays non-blocking.
//!
//! Everything runs on a current-thread runtime: the `select!` pump delivers
//! one event at a time, so the core's entry points are serialised exactly as
//! its concurrency model requires.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::time::{self, MissedTickBehavior};

use crate::adapter::{Adapter, InputRead};
use crate::config::Config;
use crate::connection::Connection;
use crate::registry::Registry;

/// Theoretical maximum UDP payload; inbound datagram buffer size.
const MAX_DATAGRAM: usize = 65_535;
/// Bytes read from stdin per wakeup.
const STDIN_CHUNK: usize = 2048;
/// Stop reading stdin while this much input is still queued for the core.
const INPUT_HIGH_WATER: usize = 64 * 1024;
/// Stdout staging capacity advertised to the core as `bufspace`.
const OUTPUT_CAP: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// HostAdapter
// ---------------------------------------------------------------------------

/// Buffered [`Adapter`] between the core and the tokio pump.
///
/// The pump feeds stdin bytes into `inbuf` and drains `outbox`/`outbuf` to
/// the socket and stdout after every event, so from the core's point of view
/// all four calls complete instantly.
#[derive(Debug, Default)]
pub struct HostAdapter {
    inbuf: VecDeque<u8>,
    in_eof: bool,
    outbox: VecDeque<Vec<u8>>,
    outbuf: VecDeque<u8>,
    out_eof: bool,
}

impl HostAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes read from stdin.
    pub fn feed_input(&mut self, bytes: &[u8]) {
        self.inbuf.extend(bytes);
    }

    /// Stdin reached end-of-file; `input` reports EOF once drained.
    pub fn close_input(&mut self) {
        self.in_eof = true;
    }

    /// Bytes queued but not yet consumed by the core.
    pub fn input_backlog(&self) -> usize {
        self.inbuf.len()
    }

    /// Datagrams the core produced since the last flush.
    pub fn take_outbox(&mut self) -> Vec<Vec<u8>> {
        self.outbox.drain(..).collect()
    }

    /// Stream bytes the core delivered since the last flush.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.outbuf.drain(..).collect()
    }

    /// Whether the core has written its end-of-stream marker.
    pub fn output_finished(&self) -> bool {
        self.out_eof
    }
}

impl Adapter for HostAdapter {
    fn send_datagram(&mut self, buf: &[u8]) -> usize {
        // The staging queue is unbounded, so a whole datagram is always
        // accepted in one call.
        self.outbox.push_back(buf.to_vec());
        buf.len()
    }

    fn input(&mut self, buf: &mut [u8]) -> InputRead {
        if self.inbuf.is_empty() {
            return if self.in_eof {
                InputRead::Eof
            } else {
                InputRead::WouldBlock
            };
        }
        let n = buf.len().min(self.inbuf.len());
        for (dst, src) in buf[..n].iter_mut().zip(self.inbuf.drain(..n)) {
            *dst = src;
        }
        InputRead::Data(n)
    }

    fn output(&mut self, buf: &[u8]) -> usize {
        if buf.is_empty() {
            self.out_eof = true;
            return 0;
        }
        let n = buf.len().min(self.bufspace());
        self.outbuf.extend(&buf[..n]);
        n
    }

    fn bufspace(&self) -> usize {
        OUTPUT_CAP - self.outbuf.len()
    }
}

// ---------------------------------------------------------------------------
// Event pump
// ---------------------------------------------------------------------------

enum Event {
    Stdin(usize),
    StdinClosed,
    Datagram(usize, SocketAddr),
    Tick,
}

/// Drive one connection over `socket` until it is torn down.
///
/// `peer` is `None` in listen mode; the first datagram's source becomes the
/// peer and datagrams from anyone else are ignored.
pub async fn run(socket: UdpSocket, mut peer: Option<SocketAddr>, config: Config) -> io::Result<()> {
    let mut registry = Registry::new();
    let id = registry.insert(Connection::new(HostAdapter::new(), &config));

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut tick = time::interval(Duration::from_millis(config.timer));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_buf = vec![0u8; STDIN_CHUNK];
    let mut dg_buf = vec![0u8; MAX_DATAGRAM];
    let mut stdin_open = true;
    let mut out_done = false;

    loop {
        let want_stdin = match registry.get_mut(id) {
            Some(conn) => stdin_open && conn.adapter().input_backlog() < INPUT_HIGH_WATER,
            None => break,
        };

        let event = tokio::select! {
            r = stdin.read(&mut in_buf), if want_stdin => match r? {
                0 => Event::StdinClosed,
                n => Event::Stdin(n),
            },
            r = socket.recv_from(&mut dg_buf) => {
                let (n, from) = r?;
                Event::Datagram(n, from)
            }
            _ = tick.tick() => Event::Tick,
        };

        match event {
            Event::Stdin(n) => {
                if let Some(conn) = registry.get_mut(id) {
                    conn.adapter_mut().feed_input(&in_buf[..n]);
                    conn.on_input_ready();
                }
            }
            Event::StdinClosed => {
                stdin_open = false;
                if let Some(conn) = registry.get_mut(id) {
                    conn.adapter_mut().close_input();
                    conn.on_input_ready();
                }
            }
            Event::Datagram(n, from) => {
                if peer.is_none() {
                    log::info!("[host] peer {from} connected");
                    peer = Some(from);
                }
                if peer == Some(from) {
                    if let Some(conn) = registry.get_mut(id) {
                        conn.on_datagram(&dg_buf[..n]);
                    }
                } else {
                    log::debug!("[host] ignoring datagram from stranger {from}");
                }
            }
            Event::Tick => registry.on_tick(),
        }

        flush(&mut registry, id, &socket, peer, &mut stdout, &mut out_done).await?;
        registry.sweep();
        if registry.is_empty() {
            break;
        }
    }

    stdout.flush().await?;
    log::info!("[host] connection finished");
    Ok(())
}

/// Push staged datagrams to the socket and staged stream bytes to stdout,
/// then tell the core about the freed output space.  The core's end-of-stream
/// marker shuts stdout down once, after everything before it has flushed.
async fn flush(
    registry: &mut Registry<HostAdapter>,
    id: crate::registry::ConnId,
    socket: &UdpSocket,
    peer: Option<SocketAddr>,
    stdout: &mut tokio::io::Stdout,
    out_done: &mut bool,
) -> io::Result<()> {
    let Some(conn) = registry.get_mut(id) else {
        return Ok(());
    };

    // Stream bytes first: the freed space lets the core drain more and stage
    // the matching ACKs, which the outbox pass below then carries out.
    let bytes = conn.adapter_mut().take_output();
    if !bytes.is_empty() {
        stdout.write_all(&bytes).await?;
        stdout.flush().await?;
        conn.on_output_space();
    }
    if !*out_done && conn.adapter().output_finished() {
        *out_done = true;
        stdout.shutdown().await?;
    }

    if let Some(p) = peer {
        for dg in conn.adapter_mut().take_outbox() {
            socket.send_to(&dg, p).await?;
        }
    }
    Ok(())
}
