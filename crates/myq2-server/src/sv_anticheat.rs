// sv_anticheat.rs -- TCP bridge to the upstream anti-cheat service
//
// The bridge speaks a small length-prefixed protocol (u16 LE length, then a
// frame of that many bytes) over a single non-blocking TCP connection. It
// never blocks: connect, read and write are all polled from the main loop's
// select drain, same as the UDP sockets in net_udp.rs.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Instant;

use myq2_common::common::com_printf;
use socket2::{Domain, Protocol, Socket, Type};

/// Size of the outbound ring buffer. The original shipped with the same
/// figure; once a pending write would exceed it the caller is expected to
/// yield a tick before trying again rather than block.
pub const AC_BUFFSIZE: usize = 131_072;

const DEFAULT_BACKOFF_SECS: u64 = 5;
const MAX_BACKOFF_SECS: u64 = 300;
const QUERY_TIMEOUT_MS: i64 = 5000;

/// Messages sent by us to the anti-cheat server.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Q2ServerByte {
    Bad = 0,
    Version = 1,
    Pref = 2,
    CvarLocks = 3,
    RequestChallenge = 4,
    ClientDisconnect = 5,
    QueryClient = 6,
}

/// Messages received from the anti-cheat server.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcServerByte {
    Bad = 0,
    ClientAck = 1,
    Violation = 2,
    NoAccess = 3,
    FileViolation = 4,
    Ready = 5,
    QueryReply = 6,
}

impl AcServerByte {
    fn from_u8(b: u8) -> Self {
        match b {
            1 => AcServerByte::ClientAck,
            2 => AcServerByte::Violation,
            3 => AcServerByte::NoAccess,
            4 => AcServerByte::FileViolation,
            5 => AcServerByte::Ready,
            6 => AcServerByte::QueryReply,
            _ => AcServerByte::Bad,
        }
    }
}

/// One entry from `anticheat-hashes.txt`: a game-relative path and the SHA1
/// hashes (hex, 40 chars) that are accepted for it. A path may carry more
/// than one hash (patched files, alternate builds); any match is valid.
#[derive(Debug, Clone, Default)]
pub struct FileHash {
    pub quake_path: String,
    pub hash: [u8; 20],
}

/// What the parser did with one received frame, so the caller can fold the
/// side effects back into client session state without this module knowing
/// about `Client`/`ServerContext` directly.
#[derive(Debug, Clone, PartialEq)]
pub enum AcEvent {
    /// Client `index` was flagged; `reason` is the human-readable message.
    Violation { index: i32, reason: String },
    FileViolation { index: i32, reason: String },
    /// The upstream finished validating client `index` and it passed.
    ClientAck { index: i32 },
    /// Reply to a `QueryClient` we sent earlier.
    QueryReply { index: i32, data: Vec<u8> },
    /// The upstream rejected us outright (bad version, banned server, ...).
    /// The caller should disable anti-cheat enforcement for this session.
    NoAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Disconnected,
    Connecting,
    Ready,
}

/// Per-client bookkeeping the bridge needs: when we last asked the upstream
/// about a client, so a non-answering upstream doesn't stall a connect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientQueryState {
    pub query_sent_at: Option<i32>,
    pub valid: bool,
}

impl ClientQueryState {
    pub fn timed_out(&self, curtime: i32) -> bool {
        match self.query_sent_at {
            Some(sent) => !self.valid && (curtime - sent) as i64 >= QUERY_TIMEOUT_MS,
            None => false,
        }
    }
}

pub struct AntiCheatBridge {
    stream: Option<TcpStream>,
    state: ConnState,

    server_address: String,
    hostname: String,
    version_string: String,
    server_port: u16,
    hashes: Vec<FileHash>,

    next_attempt: Option<Instant>,
    backoff_secs: u64,

    send_buf: Vec<u8>,

    recv_len_buf: [u8; 2],
    recv_len_have: usize,
    recv_body: Vec<u8>,
    recv_body_want: usize,
    recv_body_have: usize,

    pub required: bool,
}

impl Default for AntiCheatBridge {
    fn default() -> Self {
        Self {
            stream: None,
            state: ConnState::Disconnected,
            server_address: String::new(),
            hostname: String::new(),
            version_string: String::new(),
            server_port: 0,
            hashes: Vec::new(),
            next_attempt: None,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            send_buf: Vec::new(),
            recv_len_buf: [0; 2],
            recv_len_have: 0,
            recv_body: Vec::new(),
            recv_body_want: 0,
            recv_body_have: 0,
            required: false,
        }
    }
}

impl AntiCheatBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Ready
    }

    pub fn is_pending(&self) -> bool {
        self.state == ConnState::Connecting
    }

    /// The stream, for inclusion in a select()/poll() wait set. None when
    /// there is nothing to wait on.
    pub fn stream(&self) -> Option<&TcpStream> {
        self.stream.as_ref()
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Load `anticheat-hashes.txt`: TSV of `<quake_path>\t<40-hex-sha1>`.
    /// Lines starting with `#` or `/` are comments; a path may repeat with a
    /// different hash, all are accepted.
    pub fn load_hashes(&mut self, text: &str) {
        self.hashes.clear();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('/') {
                continue;
            }
            let mut it = line.splitn(2, '\t');
            let (Some(path), Some(hex)) = (it.next(), it.next()) else {
                continue;
            };
            let hex = hex.trim();
            if hex.len() != 40 {
                com_printf(&format!("anticheat-hashes.txt: bad hash for {path}\n"));
                continue;
            }
            let mut hash = [0u8; 20];
            let mut ok = true;
            for i in 0..20 {
                match u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16) {
                    Ok(b) => hash[i] = b,
                    Err(_) => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                com_printf(&format!("anticheat-hashes.txt: bad hash for {path}\n"));
                continue;
            }
            self.hashes.push(FileHash {
                quake_path: path.to_string(),
                hash,
            });
        }
    }

    pub fn configure(&mut self, server_address: &str, hostname: &str, version_string: &str, server_port: u16) {
        self.server_address = server_address.to_string();
        self.hostname = hostname.to_string();
        self.version_string = version_string.to_string();
        self.server_port = server_port;
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    fn backoff_expired(&self, now: Instant) -> bool {
        match self.next_attempt {
            Some(t) => now >= t,
            None => true,
        }
    }

    fn schedule_retry(&mut self, now: Instant, dns_failure: bool) {
        if dns_failure {
            self.backoff_secs = (self.backoff_secs + 60).min(MAX_BACKOFF_SECS);
        } else {
            self.backoff_secs = (self.backoff_secs + DEFAULT_BACKOFF_SECS).min(MAX_BACKOFF_SECS);
        }
        self.next_attempt = Some(now + std::time::Duration::from_secs(self.backoff_secs));
    }

    /// Begin a non-blocking connect if we're not already connected or mid-attempt
    /// and the backoff window has elapsed. Safe to call every tick.
    pub fn connect(&mut self, now: Instant) {
        if self.state != ConnState::Disconnected || self.server_address.is_empty() {
            return;
        }
        if !self.backoff_expired(now) {
            return;
        }

        let addr = match (self.server_address.as_str(), 27910u16).to_socket_addrs() {
            Ok(mut it) => match it.next() {
                Some(a) => a,
                None => {
                    com_printf("sv_anticheat: address lookup returned no results\n");
                    self.schedule_retry(now, true);
                    return;
                }
            },
            Err(e) => {
                com_printf(&format!("sv_anticheat: DNS lookup failed: {e}\n"));
                self.schedule_retry(now, true);
                return;
            }
        };

        let socket = match Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)) {
            Ok(s) => s,
            Err(e) => {
                com_printf(&format!("sv_anticheat: socket() failed: {e}\n"));
                self.schedule_retry(now, false);
                return;
            }
        };
        if let Err(e) = socket.set_nonblocking(true) {
            com_printf(&format!("sv_anticheat: set_nonblocking failed: {e}\n"));
            self.schedule_retry(now, false);
            return;
        }
        let _ = socket.set_keepalive(true);

        // On a non-blocking socket connect() returns WouldBlock immediately
        // while the handshake proceeds in the background; that's the normal
        // path here, not a failure.
        match socket.connect(&addr.into()) {
            Ok(()) => {
                self.stream = Some(socket.into());
                self.state = ConnState::Connecting;
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.raw_os_error() == Some(libc::EINPROGRESS) =>
            {
                self.stream = Some(socket.into());
                self.state = ConnState::Connecting;
            }
            Err(e) => {
                com_printf(&format!("sv_anticheat: connect failed: {e}\n"));
                self.schedule_retry(now, false);
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.stream = None;
        self.state = ConnState::Disconnected;
        self.send_buf.clear();
        self.recv_len_have = 0;
        self.recv_body.clear();
        self.recv_body_want = 0;
        self.recv_body_have = 0;
    }

    // =========================================================================
    // Outbound frames
    // =========================================================================

    fn queue_frame(&mut self, body: &[u8]) {
        if self.send_buf.len() + 2 + body.len() > AC_BUFFSIZE {
            com_printf("sv_anticheat: send buffer full, dropping frame\n");
            return;
        }
        self.send_buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
        self.send_buf.extend_from_slice(body);
    }

    /// Q2S_VERSION handshake: hostname, version string, our port, then the
    /// file-hash table loaded from `anticheat-hashes.txt`.
    pub fn send_hello(&mut self) {
        let mut body = Vec::new();
        body.push(Q2ServerByte::Version as u8);
        body.extend_from_slice(&(self.hostname.len() as u16).to_le_bytes());
        body.extend_from_slice(self.hostname.as_bytes());
        body.extend_from_slice(&(self.version_string.len() as u16).to_le_bytes());
        body.extend_from_slice(self.version_string.as_bytes());
        body.extend_from_slice(&self.server_port.to_le_bytes());
        body.extend_from_slice(&(self.hashes.len() as u32).to_le_bytes());

        let mut prev_path: Option<&str> = None;
        for fh in &self.hashes {
            body.extend_from_slice(&fh.hash);
            if prev_path == Some(fh.quake_path.as_str()) {
                body.push(0);
            } else {
                body.push(fh.quake_path.len() as u8);
                body.extend_from_slice(fh.quake_path.as_bytes());
            }
            prev_path = Some(fh.quake_path.as_str());
        }

        self.queue_frame(&body);
    }

    pub fn send_challenge(&mut self, ip: [u8; 4], port: u16, client_index: i32, challenge: i32) {
        let mut body = Vec::new();
        body.push(Q2ServerByte::RequestChallenge as u8);
        body.extend_from_slice(&ip);
        body.extend_from_slice(&port.to_le_bytes());
        body.extend_from_slice(&client_index.to_le_bytes());
        body.extend_from_slice(&challenge.to_le_bytes());
        self.queue_frame(&body);
    }

    pub fn send_query_client(&mut self, client_index: i32) {
        let mut body = Vec::new();
        body.push(Q2ServerByte::QueryClient as u8);
        body.extend_from_slice(&client_index.to_le_bytes());
        self.queue_frame(&body);
    }

    pub fn send_client_disconnect(&mut self, client_index: i32) {
        if !self.is_connected() {
            return;
        }
        let mut body = Vec::new();
        body.push(Q2ServerByte::ClientDisconnect as u8);
        body.extend_from_slice(&client_index.to_le_bytes());
        self.queue_frame(&body);
    }

    // =========================================================================
    // Per-tick pump: completes pending connects, drains inbound frames,
    // flushes the outbound buffer. Never blocks.
    // =========================================================================

    pub fn run(&mut self, now: Instant) -> Vec<AcEvent> {
        let mut events = Vec::new();

        if self.state == ConnState::Disconnected {
            self.connect(now);
            return events;
        }

        if self.state == ConnState::Connecting {
            match self.stream.as_ref().map(|s| s.take_error()) {
                Some(Ok(None)) => {
                    // Writability would be the proper readiness signal; std
                    // doesn't expose that without a poller, so the first
                    // successful read/write below promotes us to Ready.
                    self.state = ConnState::Ready;
                    self.send_hello();
                }
                Some(Ok(Some(e))) => {
                    com_printf(&format!("sv_anticheat: connect failed: {e}\n"));
                    self.disconnect();
                    self.schedule_retry(now, false);
                    return events;
                }
                _ => {
                    self.disconnect();
                    self.schedule_retry(now, false);
                    return events;
                }
            }
        }

        self.pump_recv(&mut events);
        self.pump_send();

        events
    }

    fn pump_recv(&mut self, events: &mut Vec<AcEvent>) {
        loop {
            let Some(stream) = self.stream.as_mut() else { return };

            if self.recv_body_want == 0 {
                if self.recv_len_have < 2 {
                    match stream.read(&mut self.recv_len_buf[self.recv_len_have..]) {
                        Ok(0) => {
                            self.disconnect();
                            return;
                        }
                        Ok(n) => self.recv_len_have += n,
                        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
                        Err(_) => {
                            self.disconnect();
                            return;
                        }
                    }
                    if self.recv_len_have < 2 {
                        continue;
                    }
                }
                self.recv_body_want = u16::from_le_bytes(self.recv_len_buf) as usize;
                self.recv_body.clear();
                self.recv_body.resize(self.recv_body_want, 0);
                self.recv_len_have = 0;
                if self.recv_body_want == 0 {
                    self.dispatch(&[], events);
                    continue;
                }
            }

            let have = self.recv_body.len() - self.recv_body_remaining();
            let remaining = self.recv_body_remaining();
            match stream.read(&mut self.recv_body[have..have + remaining]) {
                Ok(0) => {
                    self.disconnect();
                    return;
                }
                Ok(n) => {
                    self.recv_body_have += n;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(_) => {
                    self.disconnect();
                    return;
                }
            }

            if self.recv_body_remaining() == 0 {
                let frame = std::mem::take(&mut self.recv_body);
                self.recv_body_want = 0;
                self.recv_body_have = 0;
                self.dispatch(&frame, events);
            }
        }
    }

    fn recv_body_remaining(&self) -> usize {
        self.recv_body_want.saturating_sub(self.recv_body_have)
    }

    fn dispatch(&mut self, frame: &[u8], events: &mut Vec<AcEvent>) {
        let Some(&tag) = frame.first() else { return };
        match AcServerByte::from_u8(tag) {
            AcServerByte::Violation => {
                if frame.len() >= 5 {
                    let index = i32::from_le_bytes(frame[1..5].try_into().unwrap());
                    let reason = String::from_utf8_lossy(&frame[5..]).into_owned();
                    events.push(AcEvent::Violation { index, reason });
                }
            }
            AcServerByte::FileViolation => {
                if frame.len() >= 5 {
                    let index = i32::from_le_bytes(frame[1..5].try_into().unwrap());
                    let reason = String::from_utf8_lossy(&frame[5..]).into_owned();
                    events.push(AcEvent::FileViolation { index, reason });
                }
            }
            AcServerByte::ClientAck => {
                if frame.len() >= 5 {
                    let index = i32::from_le_bytes(frame[1..5].try_into().unwrap());
                    events.push(AcEvent::ClientAck { index });
                }
            }
            AcServerByte::QueryReply => {
                if frame.len() >= 5 {
                    let index = i32::from_le_bytes(frame[1..5].try_into().unwrap());
                    events.push(AcEvent::QueryReply {
                        index,
                        data: frame[5..].to_vec(),
                    });
                }
            }
            AcServerByte::Ready => {
                self.backoff_secs = DEFAULT_BACKOFF_SECS;
            }
            AcServerByte::NoAccess => {
                com_printf("sv_anticheat: server denied access, disabling enforcement\n");
                events.push(AcEvent::NoAccess);
                self.disconnect();
            }
            AcServerByte::Bad => {
                com_printf("sv_anticheat: unknown message type, dropping connection\n");
                events.push(AcEvent::NoAccess);
                self.disconnect();
            }
        }
    }

    fn pump_send(&mut self) {
        if self.send_buf.is_empty() {
            return;
        }
        let Some(stream) = self.stream.as_mut() else { return };

        match stream.write(&self.send_buf) {
            Ok(0) => {}
            Ok(n) => {
                self.send_buf.drain(..n);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                com_printf(&format!("sv_anticheat: send failed: {e}\n"));
                self.disconnect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_hashes_parses_tsv() {
        let mut b = AntiCheatBridge::new();
        b.load_hashes(
            "# comment\n\
             baseq2/pak0.pak\t0102030405060708090a0b0c0d0e0f1011121314\n\
             \n\
             / also a comment\n\
             baseq2/pak0.pak\tfffefdfcfbfaf9f8f7f6f5f4f3f2f1f0efeeedec\n",
        );
        assert_eq!(b.hashes.len(), 2);
        assert_eq!(b.hashes[0].quake_path, "baseq2/pak0.pak");
        assert_eq!(b.hashes[0].hash[0], 0x01);
        assert_eq!(b.hashes[1].hash[0], 0xff);
    }

    #[test]
    fn load_hashes_skips_malformed() {
        let mut b = AntiCheatBridge::new();
        b.load_hashes("baseq2/pak0.pak\tnot-a-hash\n");
        assert!(b.hashes.is_empty());
    }

    #[test]
    fn hello_frame_repeats_path_marker_for_duplicate_paths() {
        let mut b = AntiCheatBridge::new();
        b.configure("ac.example.com", "my server", "protocol 34", 27910);
        b.load_hashes(
            "baseq2/pak0.pak\t0102030405060708090a0b0c0d0e0f1011121314\n\
             baseq2/pak0.pak\tfffefdfcfbfaf9f8f7f6f5f4f3f2f1f0efeeedec\n\
             baseq2/pak1.pak\t1111111111111111111111111111111111111111\n",
        );
        b.send_hello();

        // Skip the u16 length prefix.
        let body = &b.send_buf[2..];
        assert_eq!(body[0], Q2ServerByte::Version as u8);
        let mut off = 1;
        let hostlen = u16::from_le_bytes(body[off..off + 2].try_into().unwrap()) as usize;
        off += 2 + hostlen;
        let verlen = u16::from_le_bytes(body[off..off + 2].try_into().unwrap()) as usize;
        off += 2 + verlen;
        off += 2; // server_port
        let count = u32::from_le_bytes(body[off..off + 4].try_into().unwrap());
        off += 4;
        assert_eq!(count, 3);

        off += 20; // first hash
        let marker1 = body[off];
        assert_ne!(marker1, 0);
        off += 1 + marker1 as usize;

        off += 20; // second hash, same path
        let marker2 = body[off];
        assert_eq!(marker2, 0);
        off += 1;

        off += 20; // third hash, new path
        let marker3 = body[off];
        assert_ne!(marker3, 0);
    }

    #[test]
    fn queue_frame_drops_when_buffer_full() {
        let mut b = AntiCheatBridge::new();
        b.send_buf = vec![0u8; AC_BUFFSIZE - 1];
        b.queue_frame(b"xx");
        assert_eq!(b.send_buf.len(), AC_BUFFSIZE - 1);
    }

    #[test]
    fn dispatch_violation_produces_event() {
        let mut b = AntiCheatBridge::new();
        let mut events = Vec::new();
        let mut frame = vec![AcServerByte::Violation as u8];
        frame.extend_from_slice(&7i32.to_le_bytes());
        frame.extend_from_slice(b"wallhack");
        b.dispatch(&frame, &mut events);
        assert_eq!(
            events,
            vec![AcEvent::Violation { index: 7, reason: "wallhack".to_string() }]
        );
    }

    #[test]
    fn dispatch_no_access_disconnects() {
        let mut b = AntiCheatBridge::new();
        b.state = ConnState::Ready;
        let mut events = Vec::new();
        b.dispatch(&[AcServerByte::NoAccess as u8], &mut events);
        assert_eq!(events, vec![AcEvent::NoAccess]);
        assert!(!b.is_connected());
    }

    #[test]
    fn client_query_state_times_out() {
        let mut q = ClientQueryState::default();
        q.query_sent_at = Some(1000);
        assert!(!q.timed_out(1000));
        assert!(!q.timed_out(5999));
        assert!(q.timed_out(6000));
        q.valid = true;
        assert!(!q.timed_out(9999));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let mut b = AntiCheatBridge::new();
        let base = Instant::now();
        b.schedule_retry(base, false);
        assert_eq!(b.backoff_secs, DEFAULT_BACKOFF_SECS * 2);
        for _ in 0..20 {
            b.schedule_retry(base, false);
        }
        assert_eq!(b.backoff_secs, MAX_BACKOFF_SECS);
    }
}
