// net_udp.rs -- non-blocking UDP socket per role, plus the loopback channel
//
// All I/O here is synchronous and non-blocking: the main loop drains
// `recv_from` until it returns WouldBlock and never spawns a thread for
// packet reception, matching the single-threaded cooperative model the
// server core runs under.

#![allow(dead_code)]

use std::io;
use std::net::UdpSocket;

use myq2_common::common::com_printf;
use myq2_common::qcommon::*;
use socket2::{Domain, Protocol, Socket, Type};

use crate::net_common::{netadr_to_socket_addr, socket_addr_to_netadr, Loopback, IPTOS_LOWDELAY};

pub use myq2_common::net::{
    net_adr_to_string, net_compare_adr, net_compare_base_adr, net_is_local_address,
    net_is_local_adr, net_string_to_adr,
};
pub use myq2_common::qcommon::PORT_CLIENT;

/// Per-role UDP networking state: the loopback channel used when a message is
/// addressed to ourselves, and (for `Server`) the bound non-blocking socket.
pub struct NetState {
    loopbacks: [Loopback; 2],
    ip_sockets: [Option<UdpSocket>; 2],
    noudp: bool,
}

impl Default for NetState {
    fn default() -> Self {
        Self {
            loopbacks: [Loopback::default(), Loopback::default()],
            ip_sockets: [None, None],
            noudp: false,
        }
    }
}

impl NetState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Loopback
    // =========================================================================

    fn get_loop_packet(&mut self, sock: NetSrc, net_from: &mut NetAdr, net_message: &mut SizeBuf) -> bool {
        let idx = sock as usize;
        let loop_buf = &mut self.loopbacks[idx];

        if loop_buf.send - loop_buf.get > crate::MAX_LOOPBACK as i32 {
            loop_buf.get = loop_buf.send - crate::MAX_LOOPBACK as i32;
        }

        if loop_buf.get >= loop_buf.send {
            return false;
        }

        let i = (loop_buf.get & (crate::MAX_LOOPBACK as i32 - 1)) as usize;
        loop_buf.get += 1;

        let datalen = loop_buf.msgs[i].datalen as usize;
        net_message.data[..datalen].copy_from_slice(&loop_buf.msgs[i].data[..datalen]);
        net_message.cursize = loop_buf.msgs[i].datalen;
        *net_from = NetAdr {
            adr_type: NetAdrType::Loopback,
            ..Default::default()
        };
        true
    }

    fn send_loop_packet(&mut self, sock: NetSrc, data: &[u8]) {
        // A message sent from role X is delivered to role X's peer, i.e. the
        // opposite role's inbound buffer.
        let idx = (sock as usize) ^ 1;
        let loop_buf = &mut self.loopbacks[idx];

        let i = (loop_buf.send & (crate::MAX_LOOPBACK as i32 - 1)) as usize;
        loop_buf.send += 1;

        let len = data.len().min(MAX_MSGLEN);
        loop_buf.msgs[i].data[..len].copy_from_slice(&data[..len]);
        loop_buf.msgs[i].datalen = len as i32;
    }

    // =========================================================================
    // Socket lifecycle
    // =========================================================================

    /// Bind the socket for `sock`'s role to `port` (0 = any). Sets the socket
    /// non-blocking; the main loop is responsible for draining it.
    pub fn open_ip(&mut self, sock: NetSrc, port: u16) -> io::Result<()> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;
        let _ = socket.set_broadcast(true);
        let _ = socket.set_tos(IPTOS_LOWDELAY);

        let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();
        socket.bind(&addr.into())?;

        let udp: UdpSocket = socket.into();
        com_printf(&format!(
            "Opening UDP socket: {:?} port {}\n",
            sock,
            udp.local_addr().map(|a| a.port()).unwrap_or(port)
        ));
        self.ip_sockets[sock as usize] = Some(udp);
        Ok(())
    }

    pub fn close(&mut self, sock: NetSrc) {
        self.ip_sockets[sock as usize] = None;
    }

    pub fn is_open(&self, sock: NetSrc) -> bool {
        self.ip_sockets[sock as usize].is_some()
    }

    /// The raw socket, for use in a `select`/poll wait set.
    pub fn socket(&self, sock: NetSrc) -> Option<&UdpSocket> {
        self.ip_sockets[sock as usize].as_ref()
    }

    // =========================================================================
    // Packet I/O
    // =========================================================================

    /// NET_GetPacket -- fetch the next waiting packet for `sock`, loopback
    /// first. Returns false once both loopback and socket are drained.
    pub fn get_packet(&mut self, sock: NetSrc, net_from: &mut NetAdr, net_message: &mut SizeBuf) -> bool {
        if self.get_loop_packet(sock, net_from, net_message) {
            return true;
        }

        if self.noudp {
            return false;
        }

        let Some(socket) = &self.ip_sockets[sock as usize] else {
            return false;
        };

        let mut buf = [0u8; MAX_MSGLEN];
        match socket.recv_from(&mut buf) {
            Ok((size, from_addr)) => {
                if size >= MAX_MSGLEN {
                    com_printf("Oversize packet discarded\n");
                    return false;
                }
                *net_from = socket_addr_to_netadr(&from_addr);
                net_message.data[..size].copy_from_slice(&buf[..size]);
                net_message.cursize = size as i32;
                true
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(e) => {
                com_printf(&format!("NET_GetPacket: {}\n", e));
                false
            }
        }
    }

    /// NET_SendPacket -- send `data` to `to`, via loopback or the real socket.
    pub fn send_packet(&mut self, sock: NetSrc, data: &[u8], to: &NetAdr) {
        if to.adr_type == NetAdrType::Loopback {
            self.send_loop_packet(sock, data);
            return;
        }

        if self.noudp {
            return;
        }

        let Some(socket) = &self.ip_sockets[sock as usize] else {
            return;
        };

        let dest = netadr_to_socket_addr(to);
        if let Err(e) = socket.send_to(data, dest) {
            if e.kind() != io::ErrorKind::WouldBlock {
                com_printf(&format!("NET_SendPacket: {}\n", e));
            }
        }
    }
}

// =============================================================================
// Global networking context — bridges this module's instance methods to the
// bare `fn` pointers myq2_common::net::net_register_get_packet/send_packet
// require. The dedicated server only ever has one of each socket role, so a
// single process-wide instance (rather than threading a `&mut NetState`
// through every call site) matches the C original's global socket state
// without reintroducing C's unchecked global mutability: everything still
// goes through `NetState`'s own methods under a lock.
// =============================================================================

use std::sync::{Mutex, OnceLock};

static NET_STATE: OnceLock<Mutex<NetState>> = OnceLock::new();

fn global_net_state() -> &'static Mutex<NetState> {
    NET_STATE.get_or_init(|| Mutex::new(NetState::new()))
}

/// Access the global `NetState` under a lock, execute a closure, and return the result.
pub fn with_net_state<F, R>(f: F) -> R
where
    F: FnOnce(&mut NetState) -> R,
{
    let mut guard = global_net_state().lock().unwrap();
    f(&mut guard)
}

fn global_net_get_packet(sock: NetSrc, from: &mut NetAdr, message: &mut SizeBuf) -> bool {
    with_net_state(|net| net.get_packet(sock, from, message))
}

fn global_net_send_packet(sock: NetSrc, data: &[u8], to: &NetAdr) {
    with_net_state(|net| net.send_packet(sock, data, to))
}

/// Bind the server's UDP socket to `port` and register the dispatch functions
/// `myq2_common::net::net_get_packet`/`net_send_packet` call into. Call once
/// at startup before the main loop starts draining packets.
pub fn net_global_init(port: u16) -> io::Result<()> {
    with_net_state(|net| net.open_ip(NetSrc::Server, port))?;
    myq2_common::net::net_register_get_packet(global_net_get_packet);
    myq2_common::net::net_register_send_packet(global_net_send_packet);
    Ok(())
}

/// The bound server socket, for use in a `select`/poll wait set by the idle path.
pub fn with_server_socket<F, R>(f: F) -> R
where
    F: FnOnce(Option<&UdpSocket>) -> R,
{
    with_net_state(|net| f(net.socket(NetSrc::Server)))
}
