//! Dedicated server entry point.
//!
//! Usage:
//!   myq2ded [-basedir <path>] [-game <dir>] [-port <n>] [+map <name>] [console commands...]
//!
//! Runs the server core on the main thread: non-blocking UDP I/O, a
//! fixed-timestep game frame, and a non-blocking stdin reader all share the
//! same loop rather than separate threads, matching the single-threaded
//! cooperative model the rest of the server core is built on.

use std::io::{self, Read};

use myq2_common::common::{com_parm_value_in, com_printf, qcommon_init, sys_milliseconds};
use myq2_common::qcommon::PORT_SERVER;
use myq2_server::net_udp;
use myq2_server::server::ServerContext;
use myq2_server::sv_ccmds::{sv_execute_operator_command, sv_kill_server_f};
use myq2_server::sv_game::sv_init_game_progs;
use myq2_server::sv_main::{sv_frame, sv_init, sv_shutdown, ServerTiming};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    qcommon_init(&args);

    let mut ctx = ServerContext::default();
    sv_init_game_progs(&mut ctx);
    sv_init(&mut ctx);

    let port: u16 = com_parm_value_in(&args, "-port")
        .and_then(|v| v.parse().ok())
        .unwrap_or(PORT_SERVER as u16);

    if let Err(e) = net_udp::net_global_init(port) {
        tracing::error!("couldn't open UDP socket on port {}: {}", port, e);
        return Err(anyhow::anyhow!("net_global_init failed: {}", e));
    }
    com_printf(&format!("Dedicated server listening on UDP port {}\n", port));

    if let Some(mapname) = com_parm_value_in(&args, "+map") {
        sv_execute_operator_command(&mut ctx, &format!("map {}", mapname));
    }

    let mut timing = ServerTiming::new();
    timing.enable();

    let mut last = sys_milliseconds();
    let mut running = true;
    let mut line = String::new();

    while running {
        let now = sys_milliseconds();
        let msec = (now - last).max(0);
        last = now;

        timing.set_fps(ctx.cvars.variable_value("sv_fps") as i32);
        sv_frame(&mut ctx, msec);

        while let Some(cmdline) = read_console_line(&mut line) {
            let cmdline = cmdline.trim();
            if cmdline.is_empty() {
                continue;
            }
            if cmdline.eq_ignore_ascii_case("quit") || cmdline.eq_ignore_ascii_case("killserver") {
                sv_kill_server_f(&mut ctx);
                running = false;
                break;
            }
            if !sv_execute_operator_command(&mut ctx, cmdline) {
                myq2_common::cmd::cmd_execute_string(cmdline);
            }
        }

        if !ctx.svs.initialized {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    sv_shutdown(&mut ctx, "Server quit\n", false);
    Ok(())
}

/// Drain one line from stdin if a full line is already buffered, without
/// blocking the main loop when no input is waiting.
///
/// `libc::poll` on fd 0 mirrors the non-blocking-socket style used
/// throughout the networking layer: console input is just another source
/// the main loop polls rather than a reason to spawn a thread.
fn read_console_line(carry: &mut String) -> Option<String> {
    if let Some(pos) = carry.find('\n') {
        let rest = carry.split_off(pos + 1);
        let mut line = std::mem::replace(carry, rest);
        line.pop();
        return Some(line);
    }

    let mut pfd = libc::pollfd {
        fd: 0,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: pfd is a single valid pollfd on the stack, nfds matches.
    let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
    if ready <= 0 || pfd.revents & libc::POLLIN == 0 {
        return None;
    }

    let mut buf = [0u8; 4096];
    match io::stdin().read(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(n) => {
            carry.push_str(&String::from_utf8_lossy(&buf[..n]));
            read_console_line(carry)
        }
    }
}
