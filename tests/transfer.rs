//! Integration tests for in-order data transfer.
//!
//! Each test drives two in-process connections over a simulated datagram
//! link: datagrams collected from one side's adapter are delivered to the
//! other side's `on_datagram`, optionally through the fault-injecting
//! simulator.  Everything is synchronous and deterministic.

use stream_over_udp::{
    config::Config,
    connection::Connection,
    segment::{Segment, SegmentKind, HEADER_SIZE},
    simulator::{MemoryAdapter, Simulator, SimulatorConfig},
};

type Conn = Connection<MemoryAdapter>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pair() -> (Conn, Conn) {
    let config = Config::default();
    (
        Connection::new(MemoryAdapter::new(), &config),
        Connection::new(MemoryAdapter::new(), &config),
    )
}

/// Shuttle datagrams both ways (losslessly) until the link is quiet.
fn pump(a: &mut Conn, b: &mut Conn) {
    loop {
        let from_a = a.adapter_mut().take_sent();
        let from_b = b.adapter_mut().take_sent();
        if from_a.is_empty() && from_b.is_empty() {
            break;
        }
        for dg in from_a {
            b.on_datagram(&dg);
        }
        for dg in from_b {
            a.on_datagram(&dg);
        }
    }
}

fn ticks(conn: &mut Conn, n: u32) {
    for _ in 0..n {
        conn.on_tick();
    }
}

/// `send_window_used` must equal `next_seqno − seqno` after every entry
/// point returns.
fn assert_window_accounting(conn: &Conn) {
    let spread = conn.flow.next_seqno.wrapping_sub(conn.flow.seqno);
    assert_eq!(conn.flow.send_window_used, spread, "window accounting drifted");
}

// ---------------------------------------------------------------------------
// Test 1: single-segment exchange
// ---------------------------------------------------------------------------

#[test]
fn single_segment_exchange() {
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"hello");
    a.on_input_ready();

    let sent = a.adapter_mut().take_sent();
    assert_eq!(sent.len(), 1);
    let seg = Segment::decode(&sent[0]).expect("well-formed segment");
    assert_eq!(seg.seqno, 1);
    assert_eq!(seg.kind(), SegmentKind::Data);
    assert_eq!(sent[0].len(), HEADER_SIZE + 5);
    assert!(a.timer.enabled());

    b.on_datagram(&sent[0]);
    assert_eq!(b.adapter().output, b"hello");

    let acks = b.adapter_mut().take_sent();
    assert_eq!(acks.len(), 1);
    let ack = Segment::decode(&acks[0]).expect("well-formed ACK");
    assert_eq!(ack.kind(), SegmentKind::Ack);
    assert_eq!(ack.ackno, 6);

    a.on_datagram(&acks[0]);
    assert_eq!(a.flow.seqno, 6);
    assert!(a.tx.is_empty());
    assert!(!a.timer.enabled());
    assert_window_accounting(&a);
}

// ---------------------------------------------------------------------------
// Test 2: lost data segment recovered by Go-Back-N replay
// ---------------------------------------------------------------------------

#[test]
fn lost_segment_recovered_by_rto_replay() {
    let config = Config::default();
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"abc");
    a.adapter_mut().feed_input(b"def");
    a.on_input_ready();

    let sent = a.adapter_mut().take_sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(Segment::decode(&sent[0]).unwrap().seqno, 1);
    assert_eq!(Segment::decode(&sent[1]).unwrap().seqno, 4);

    // First segment lost in flight; the second arrives with a gap ahead of
    // it and must be dropped without an ACK.
    b.on_datagram(&sent[1]);
    assert!(b.adapter().output.is_empty());
    assert_eq!(b.flow.ackno, 1);
    assert!(b.adapter_mut().take_sent().is_empty());

    // The RTO expiry replays the entire window.
    ticks(&mut a, config.ticks_per_rto());
    let replay = a.adapter_mut().take_sent();
    assert_eq!(replay.len(), 2);
    for dg in &replay {
        b.on_datagram(dg);
    }
    assert_eq!(b.adapter().output, b"abcdef");

    for ack in b.adapter_mut().take_sent() {
        a.on_datagram(&ack);
    }
    assert_eq!(a.flow.seqno, 7);
    assert!(a.tx.is_empty());
    assert!(!a.timer.enabled());
    assert_window_accounting(&a);
}

// ---------------------------------------------------------------------------
// Test 3: duplicate ACK is a no-op
// ---------------------------------------------------------------------------

#[test]
fn duplicate_ack_changes_nothing() {
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"hello");
    a.on_input_ready();
    let sent = a.adapter_mut().take_sent();
    b.on_datagram(&sent[0]);
    let acks = b.adapter_mut().take_sent();

    a.on_datagram(&acks[0]);
    assert_eq!(a.flow.seqno, 6);

    // The same ACK again: queue already empty, no state change, timer
    // stays disarmed, nothing goes out.
    a.on_datagram(&acks[0]);
    assert_eq!(a.flow.seqno, 6);
    assert!(a.tx.is_empty());
    assert!(!a.timer.enabled());
    assert!(a.adapter_mut().take_sent().is_empty());
}

// ---------------------------------------------------------------------------
// Test 4: duplicate data segment → one re-ACK carrying the old boundary
// ---------------------------------------------------------------------------

#[test]
fn duplicate_data_segment_is_idempotent() {
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"hello");
    a.on_input_ready();
    let sent = a.adapter_mut().take_sent();

    b.on_datagram(&sent[0]);
    assert_eq!(b.adapter().output, b"hello");
    b.adapter_mut().take_sent(); // the genuine ACK

    // Same datagram again: output unchanged, exactly one ACK carrying the
    // previous in-order boundary, nothing buffered twice.
    b.on_datagram(&sent[0]);
    assert_eq!(b.adapter().output, b"hello");
    assert_eq!(b.flow.ackno, 6);
    assert_eq!(b.flow.rcv_window_used, 0);

    let reacks = b.adapter_mut().take_sent();
    assert_eq!(reacks.len(), 1);
    let reack = Segment::decode(&reacks[0]).unwrap();
    assert_eq!(reack.kind(), SegmentKind::Ack);
    assert_eq!(reack.ackno, 1, "re-ACK must carry the previous boundary");
}

// ---------------------------------------------------------------------------
// Test 5: receive-window boundary
// ---------------------------------------------------------------------------

#[test]
fn segment_filling_receive_window_accepted_one_byte_more_dropped() {
    let mut config = Config::default();
    config.recv_window = 8;

    // Output stream blocked so accepted bytes keep occupying the window.
    let mut b = Connection::new(MemoryAdapter::with_output_space(0), &config);

    let exact = Segment {
        seqno: 1,
        ackno: 1,
        flags: 0,
        window: 1440,
        payload: vec![b'a'; 8],
    };
    b.on_datagram(&exact.encode());
    assert_eq!(b.flow.ackno, 9, "segment exactly filling the window accepted");
    assert_eq!(b.flow.rcv_window_used, 8);

    let overflow = Segment {
        seqno: 9,
        ackno: 1,
        flags: 0,
        window: 1440,
        payload: vec![b'b'; 1],
    };
    b.on_datagram(&overflow.encode());
    assert_eq!(b.flow.ackno, 9, "one byte more must be dropped");
    assert_eq!(b.flow.rcv_window_used, 8);
}

// ---------------------------------------------------------------------------
// Test 6: checksum corruption is dropped, retransmission recovers
// ---------------------------------------------------------------------------

#[test]
fn corrupted_segment_dropped_then_recovered() {
    let config = Config::default();
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"payload");
    a.on_input_ready();
    let sent = a.adapter_mut().take_sent();

    // One bit flipped in the payload: silently dropped, no ACK.
    let mut corrupted = sent[0].clone();
    corrupted[HEADER_SIZE + 2] ^= 0x10;
    b.on_datagram(&corrupted);
    assert!(b.adapter().output.is_empty());
    assert!(b.adapter_mut().take_sent().is_empty());

    // The clean copy arrives on the next RTO.
    ticks(&mut a, config.ticks_per_rto());
    let replay = a.adapter_mut().take_sent();
    assert_eq!(replay.len(), 1);
    b.on_datagram(&replay[0]);
    assert_eq!(b.adapter().output, b"payload");
}

// ---------------------------------------------------------------------------
// Test 7: full-duplex exchange
// ---------------------------------------------------------------------------

#[test]
fn full_duplex_exchange() {
    let (mut a, mut b) = pair();

    a.adapter_mut().feed_input(b"ping!");
    b.adapter_mut().feed_input(b"pong!");
    a.on_input_ready();
    b.on_input_ready();
    pump(&mut a, &mut b);

    assert_eq!(a.adapter().output, b"pong!");
    assert_eq!(b.adapter().output, b"ping!");
    assert!(a.tx.is_empty());
    assert!(b.tx.is_empty());
    assert!(!a.timer.enabled());
    assert!(!b.timer.enabled());
}

// ---------------------------------------------------------------------------
// Test 8: partial datagram writes are looped to completion
// ---------------------------------------------------------------------------

#[test]
fn partial_datagram_writes_are_completed() {
    let (mut a, mut b) = pair();
    a.adapter_mut().max_datagram_write = 7;

    a.adapter_mut().feed_input(b"chopped into many little writes");
    a.on_input_ready();

    let sent = a.adapter_mut().take_sent();
    assert_eq!(sent.len(), 1, "adapter must reassemble one whole datagram");
    b.on_datagram(&sent[0]);
    assert_eq!(b.adapter().output, b"chopped into many little writes");
}

// ---------------------------------------------------------------------------
// Test 9: truncated-read sentinel stops the read loop
// ---------------------------------------------------------------------------

#[test]
fn truncate_sentinel_stops_reading() {
    let (mut a, _b) = pair();

    a.adapter_mut().feed_input(b"keep this");
    a.adapter_mut().feed_input(b"###truncate###the rest is noise");
    a.adapter_mut().feed_input(b"never reached");
    a.on_input_ready();

    // Only the chunk before the sentinel is queued and sent.
    assert_eq!(a.tx.queued_bytes(), 9);
    let sent = a.adapter_mut().take_sent();
    assert_eq!(sent.len(), 1);
    let seg = Segment::decode(&sent[0]).unwrap();
    assert_eq!(seg.payload, b"keep this");

    // The sentinel only counts at the start of a chunk.
    let (mut c, _d) = pair();
    c.adapter_mut().feed_input(b"data then ###truncate###");
    c.on_input_ready();
    assert_eq!(c.tx.queued_bytes(), 24);
}

// ---------------------------------------------------------------------------
// Test 10: delivery over a lossy, duplicating, corrupting, reordering link
// ---------------------------------------------------------------------------

#[test]
fn lossy_link_delivers_exact_prefixes_until_complete() {
    let sim_config = SimulatorConfig {
        loss_rate: 0.15,
        duplicate_rate: 0.15,
        corrupt_rate: 0.05,
        reorder_rate: 0.15,
    };
    let mut sim = Simulator::new(sim_config, 42);
    let (mut a, mut b) = pair();

    let message: Vec<u8> = (0..40)
        .flat_map(|i| format!("chunk-{i:03}/").into_bytes())
        .collect();
    for chunk in message.chunks(10) {
        a.adapter_mut().feed_input(chunk);
    }
    a.on_input_ready();

    let mut prev_ackno = b.flow.ackno;
    let mut done = false;
    for _ in 0..20_000 {
        let batch = sim.apply(a.adapter_mut().take_sent());
        for dg in batch {
            b.on_datagram(&dg);
        }
        let batch = sim.apply(b.adapter_mut().take_sent());
        for dg in batch {
            a.on_datagram(&dg);
        }
        a.on_tick();
        b.on_tick();

        // Delivered bytes are always an exact prefix of the bytes read.
        assert!(
            message.starts_with(&b.adapter().output),
            "delivered bytes diverged from the input stream"
        );
        // Cumulative ACK never moves backwards.
        assert!(b.flow.ackno >= prev_ackno, "ackno regressed");
        prev_ackno = b.flow.ackno;
        assert_window_accounting(&a);

        if b.adapter().output == message {
            done = true;
            break;
        }
    }
    assert!(done, "transfer did not complete under the fault model");
}
