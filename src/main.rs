//! Entry point for `stream-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **listen** or **connect**
//! mode.  All actual protocol work is delegated to library modules; `main.rs`
//! owns only process setup (logging, argument parsing, socket binding).

use std::io;
use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::UdpSocket;

use stream_over_udp::adapter::MAX_SEG_DATA_SIZE;
use stream_over_udp::config::Config;
use stream_over_udp::host;

/// Reliable, in-order, checksum-verified byte stream over UDP, piping stdin
/// to the peer's stdout and vice versa.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Maximum unacknowledged bytes outstanding.
    #[arg(long, default_value_t = MAX_SEG_DATA_SIZE as u16)]
    send_window: u16,

    /// Maximum buffered received bytes.
    #[arg(long, default_value_t = MAX_SEG_DATA_SIZE as u16)]
    recv_window: u16,

    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    rt_timeout: u64,

    /// Timer tick period in milliseconds.
    #[arg(long, default_value_t = 40)]
    tick: u64,
}

#[derive(Subcommand)]
enum Mode {
    /// Wait for a peer to send the first datagram.
    Listen {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: String,
    },
    /// Talk to a listening peer.
    Connect {
        /// Remote peer address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = Config {
        send_window: cli.send_window,
        recv_window: cli.recv_window,
        rt_timeout: cli.rt_timeout,
        timer: cli.tick,
    };
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        std::process::exit(2);
    }

    match cli.mode {
        Mode::Listen { bind } => {
            let socket = UdpSocket::bind(&bind).await?;
            log::info!("[host] listening on {}", socket.local_addr()?);
            host::run(socket, None, config).await
        }
        Mode::Connect { peer } => {
            let peer: SocketAddr = peer
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            log::info!("[host] connecting to {peer}");
            host::run(socket, Some(peer), config).await
        }
    }
}
