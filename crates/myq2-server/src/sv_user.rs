// sv_user.rs — server code for moving users
// Converted from: myq2-original/server/sv_user.c

use crate::server::*;
use crate::sv_game::*;
use myq2_common::common::{
    com_printf, com_dprintf, msg_read_byte, msg_read_long, msg_read_string,
    msg_read_delta_usercmd, msg_write_byte, msg_write_delta_entity, msg_write_long,
    msg_write_short, msg_write_string,
};
use myq2_common::cmd::{cmd_tokenize_string, cmd_argv, cmd_argc, cbuf_add_text};
use myq2_common::cvar::{cvar_variable_string, cvar_variable_value, cvar_set, cvar_serverinfo};
use myq2_common::q_shared::*;
use myq2_common::qcommon::*;

// ============================================================
// USER STRINGCMD EXECUTION
//
// sv_client and sv_player will be valid.
// ============================================================

const MAX_STRINGCMDS: i32 = 8;

/// Bytes of batch written before a synthetic keepalive stufftext is inserted,
/// so slow configstring/baseline downloads don't look like a stalled netchan.
const BATCH_STUFF_INTERVAL: i32 = 500;

/// Minimum assembled batch size before zpacket compression is attempted.
const BATCH_COMPRESS_MIN_SIZE: usize = 256;

/// Scans the unread bytes of a pending clc_stringcmd payload, up to its NUL
/// terminator, for a raw 0xFF byte or a `$` macro-expansion character.
fn stringcmd_has_banned_bytes(msg: &SizeBuf) -> bool {
    let start = msg.readcount as usize;
    let end = msg.cursize as usize;
    for &b in msg.data[start..end.min(msg.data.len())].iter() {
        if b == 0 {
            break;
        }
        if b == 0xFF || b == b'$' {
            return true;
        }
    }
    false
}

fn sv_write_batch_noop(buf: &mut SizeBuf) {
    msg_write_byte(buf, SvcOps::StuffText as i32);
    msg_write_string(buf, crate::sv_probe::PROBE_NOOP_CMD);
}

/// Appends an assembled configstring/baseline batch to the client's reliable
/// message, wrapping it in svc_zpacket for protocol 35+ when that saves space.
fn sv_flush_batch(client: &mut Client, batch: &SizeBuf) {
    let raw = &batch.data[..batch.cursize as usize];
    if client.netchan.protocol >= PROTOCOL_R1Q2 && raw.len() >= BATCH_COMPRESS_MIN_SIZE {
        if let Some(compressed) = myq2_common::compression::compress_packet(raw) {
            msg_write_byte(&mut client.netchan.message, SvcOps::ZPacket as i32);
            msg_write_short(&mut client.netchan.message, compressed.len() as i32);
            msg_write_short(&mut client.netchan.message, raw.len() as i32);
            client.netchan.message.write(&compressed);
            return;
        }
    }
    client.netchan.message.write(raw);
}

/// SV_BeginDemoserver
pub fn sv_begin_demoserver(ctx: &mut ServerContext) {
    let name = format!("demos/{}", ctx.sv.name);
    // Try to open the demo file via the filesystem
    if let Some(data) = myq2_common::files::fs_load_file(&name) {
        // Create a temporary file to feed to the demo reader, or store
        // the data directly. The Server struct has a demofile: Option<File>.
        // We write the data to a temp file then open it for reading.
        let gamedir = myq2_common::files::fs_gamedir();
        let path = format!("{}/{}", gamedir, name);
        if let Ok(f) = std::fs::File::open(&path) {
            ctx.sv.demofile = Some(f);
            return;
        }
        // If the file was in a pak, write extracted data to a temp location
        let temp_path = std::env::temp_dir().join(format!("myq2_demo_{}", ctx.sv.name));
        if let Ok(mut f) = std::fs::File::create(&temp_path) {
            use std::io::Write;
            let _ = f.write_all(&data);
        }
        if let Ok(f) = std::fs::File::open(&temp_path) {
            ctx.sv.demofile = Some(f);
            return;
        }
    }
    panic!("Couldn't open {}", name);
}

/// SV_New_f
///
/// Sends the first message from the server to a connected client.
/// This will be sent on the initial connection and upon each server load.
pub fn sv_new_f(ctx: &mut ServerContext, client_idx: usize) {
    com_dprintf(&format!(
        "New() from {}\n",
        ctx.svs.clients[client_idx].name
    ));

    if ctx.svs.clients[client_idx].state != ClientState::Connected {
        com_printf("New not valid -- already spawned\n");
        return;
    }

    // demo servers just dump the file message
    if ctx.sv.state == ServerState::Demo {
        sv_begin_demoserver(ctx);
        return;
    }

    //
    // serverdata needs to go over for all types of servers
    // to make sure the protocol is right, and to set the gamedir
    //
    let gamedir = cvar_variable_string("gamedir");

    // send the serverdata
    msg_write_byte(&mut ctx.svs.clients[client_idx].netchan.message, SvcOps::ServerData as i32);
    msg_write_long(&mut ctx.svs.clients[client_idx].netchan.message, PROTOCOL_VERSION);
    msg_write_long(&mut ctx.svs.clients[client_idx].netchan.message, ctx.svs.spawncount);
    msg_write_byte(&mut ctx.svs.clients[client_idx].netchan.message, ctx.sv.attractloop as i32);
    msg_write_string(&mut ctx.svs.clients[client_idx].netchan.message, &gamedir);

    let playernum = if ctx.sv.state == ServerState::Cinematic
        || ctx.sv.state == ServerState::Pic
    {
        -1i32
    } else {
        client_idx as i32
    };
    msg_write_short(&mut ctx.svs.clients[client_idx].netchan.message, playernum);

    // send full levelname
    let levelname = ctx.sv.configstrings[CS_NAME].clone();
    msg_write_string(
        &mut ctx.svs.clients[client_idx].netchan.message,
        &levelname,
    );

    //
    // game server
    //
    if ctx.sv.state == ServerState::Game {
        // set up the entity for the client
        let ent_num = (playernum + 1) as usize;
        if let Some(ref mut ge) = ctx.ge {
            if let Some(ent) = ge.edicts.get_mut(ent_num) {
                ent.s.number = ent_num as i32;
            }
        }
        ctx.svs.clients[client_idx].edict_index = ent_num as i32;
        ctx.svs.clients[client_idx].lastcmd = UserCmd::default();

        // begin fetching configstrings
        let spawncount = ctx.svs.spawncount;
        msg_write_byte(&mut ctx.svs.clients[client_idx].netchan.message, SvcOps::StuffText as i32);
        msg_write_string(
            &mut ctx.svs.clients[client_idx].netchan.message,
            &format!("cmd configstrings {} 0\n", spawncount),
        );

        // forced version probe, once per connection
        if ctx.svs.clients[client_idx].client_version.is_empty()
            && !ctx.svs.clients[client_idx].probe_awaiting_reply
        {
            crate::sv_probe::sv_send_version_probe(ctx, client_idx);
        }
    }
}

/// SV_Configstrings_f
pub fn sv_configstrings_f(ctx: &mut ServerContext, client_idx: usize) {
    com_dprintf(&format!(
        "Configstrings() from {}\n",
        ctx.svs.clients[client_idx].name
    ));

    if ctx.svs.clients[client_idx].state != ClientState::Connected {
        com_printf("configstrings not valid -- already spawned\n");
        return;
    }

    // handle the case of a level changing while a client was connecting
    let arg1: i32 = cmd_argv(1).parse().unwrap_or(0);
    if arg1 != ctx.svs.spawncount {
        com_printf("SV_Configstrings_f from different level\n");
        sv_new_f(ctx, client_idx);
        return;
    }

    let mut start: usize = cmd_argv(2).parse().unwrap_or(0);

    // Assemble the batch off to the side so it can be wrapped in svc_zpacket
    // as a whole, and so periodic noop stufftext can be inserted by byte count.
    let mut batch = SizeBuf::new(MAX_MSGLEN as i32);
    let mut last_stuff_mark: i32 = 0;

    while batch.cursize < (MAX_MSGLEN / 2) as i32 && start < MAX_CONFIGSTRINGS {
        if !ctx.sv.configstrings[start].is_empty() {
            let cs = ctx.sv.configstrings[start].clone();
            msg_write_byte(&mut batch, SvcOps::ConfigString as i32);
            msg_write_short(&mut batch, start as i32);
            msg_write_string(&mut batch, &cs);
        }
        start += 1;

        if batch.cursize - last_stuff_mark >= BATCH_STUFF_INTERVAL {
            sv_write_batch_noop(&mut batch);
            last_stuff_mark = batch.cursize;
        }
    }

    // send next command
    let spawncount = ctx.svs.spawncount;
    if start == MAX_CONFIGSTRINGS {
        msg_write_byte(&mut batch, SvcOps::StuffText as i32);
        msg_write_string(&mut batch, &format!("cmd baselines {} 0\n", spawncount));
    } else {
        msg_write_byte(&mut batch, SvcOps::StuffText as i32);
        msg_write_string(
            &mut batch,
            &format!("cmd configstrings {} {}\n", spawncount, start),
        );
    }

    sv_flush_batch(&mut ctx.svs.clients[client_idx], &batch);
}

/// SV_Baselines_f
pub fn sv_baselines_f(ctx: &mut ServerContext, client_idx: usize) {
    com_dprintf(&format!(
        "Baselines() from {}\n",
        ctx.svs.clients[client_idx].name
    ));

    if ctx.svs.clients[client_idx].state != ClientState::Connected {
        com_printf("baselines not valid -- already spawned\n");
        return;
    }

    // handle the case of a level changing while a client was connecting
    let arg1: i32 = cmd_argv(1).parse().unwrap_or(0);
    if arg1 != ctx.svs.spawncount {
        com_printf("SV_Baselines_f from different level\n");
        sv_new_f(ctx, client_idx);
        return;
    }

    let mut start: usize = cmd_argv(2).parse().unwrap_or(0);

    let nullstate = EntityState::default();

    let mut batch = SizeBuf::new(MAX_MSGLEN as i32);
    let mut last_stuff_mark: i32 = 0;

    while batch.cursize < (MAX_MSGLEN / 2) as i32 && start < MAX_EDICTS {
        let has_data = {
            let base = &ctx.sv.baselines[start];
            base.modelindex != 0 || base.sound != 0 || base.effects != 0
        };
        if has_data {
            let base = ctx.sv.baselines[start].clone();
            msg_write_byte(&mut batch, SvcOps::SpawnBaseline as i32);
            msg_write_delta_entity(&nullstate, &base, &mut batch, true, true);
        }
        start += 1;

        if batch.cursize - last_stuff_mark >= BATCH_STUFF_INTERVAL {
            sv_write_batch_noop(&mut batch);
            last_stuff_mark = batch.cursize;
        }
    }

    // send next command
    let spawncount = ctx.svs.spawncount;
    if start == MAX_EDICTS {
        msg_write_byte(&mut batch, SvcOps::StuffText as i32);
        msg_write_string(&mut batch, &format!("precache {}\n", spawncount));
    } else {
        msg_write_byte(&mut batch, SvcOps::StuffText as i32);
        msg_write_string(
            &mut batch,
            &format!("cmd baselines {} {}\n", spawncount, start),
        );
    }

    sv_flush_batch(&mut ctx.svs.clients[client_idx], &batch);
}

/// SV_Begin_f
pub fn sv_begin_f(ctx: &mut ServerContext, client_idx: usize) {
    com_dprintf(&format!(
        "Begin() from {}\n",
        ctx.svs.clients[client_idx].name
    ));

    // handle the case of a level changing while a client was connecting
    let arg1: i32 = cmd_argv(1).parse().unwrap_or(0);
    if arg1 != ctx.svs.spawncount {
        com_printf("SV_Begin_f from different level\n");
        sv_new_f(ctx, client_idx);
        return;
    }

    ctx.svs.clients[client_idx].state = ClientState::Spawned;

    // call the game begin function
    let edict_idx = ctx.svs.clients[client_idx].edict_index as usize;
    if let Some(ref mut ge) = ctx.ge {
        if let Some(begin_fn) = ge.client_begin {
            if let Some(ent) = ge.edicts.get_mut(edict_idx) {
                begin_fn(ent);
            }
        }
    }

    cbuf_insert_from_defer();
}

// =============================================================================

/// SV_NextDownload_f
pub fn sv_next_download_f(ctx: &mut ServerContext, client_idx: usize) {
    let client = &mut ctx.svs.clients[client_idx];

    if client.download.is_none() {
        return;
    }

    let mut r = client.downloadsize - client.downloadcount;
    if r > 1024 {
        r = 1024;
    }

    let size = if client.downloadsize != 0 {
        client.downloadsize
    } else {
        1
    };
    let percent = (client.downloadcount + r) * 100 / size;
    let offset = client.downloadcount as usize;
    let end = offset + r as usize;

    // Try udp-zlib compression on protocol 35+ if the client asked for it.
    // Only emit svc_zdownload if it's actually smaller than the raw chunk.
    let mut wrote_compressed = false;
    if client.download_compressed && client.netchan.protocol >= PROTOCOL_R1Q2 {
        if let Some(ref download) = client.download {
            let chunk = &download[offset..end];
            if let Ok(compressed) = myq2_common::compression::compress_data(chunk) {
                if compressed.len() < chunk.len() {
                    msg_write_byte(&mut client.netchan.message, SvcOps::ZDownload as i32);
                    msg_write_short(&mut client.netchan.message, compressed.len() as i32);
                    msg_write_byte(&mut client.netchan.message, percent);
                    msg_write_short(&mut client.netchan.message, chunk.len() as i32);
                    client.netchan.message.write(&compressed);
                    wrote_compressed = true;
                }
            }
        }
    }

    if !wrote_compressed {
        msg_write_byte(&mut client.netchan.message, SvcOps::Download as i32);
        msg_write_short(&mut client.netchan.message, r);
        msg_write_byte(&mut client.netchan.message, percent);
        if let Some(ref download) = client.download {
            client.netchan.message.write(&download[offset..end]);
        }
    }

    client.downloadcount += r;

    if client.downloadcount != client.downloadsize {
        return;
    }

    client.download = None;
    client.download_compressed = false;
}

/// SV_BeginDownload_f
pub fn sv_begin_download_f(ctx: &mut ServerContext, client_idx: usize) {
    let name = cmd_argv(1);
    let offset = if cmd_argc() > 2 {
        cmd_argv(2).parse::<i32>().unwrap_or(0)
    } else {
        0
    };
    let want_compressed = cmd_argc() > 3 && cmd_argv(3) == "udp-zlib";

    let allow_download = ctx.allow_download;
    let allow_download_players = ctx.allow_download_players;
    let allow_download_models = ctx.allow_download_models;
    let allow_download_sounds = ctx.allow_download_sounds;
    let allow_download_maps = ctx.allow_download_maps;

    // hacked by zoid to allow more control over download
    // first off, no .. or global allow check
    if name.contains("..")
        || !allow_download
        // leading dot is no good
        || name.starts_with('.')
        // leading slash bad as well, must be in subdir
        || name.starts_with('/')
        // next up, skin check
        || (name.starts_with("players/") && !allow_download_players)
        // now models
        || (name.starts_with("models/") && !allow_download_models)
        // now sounds
        || (name.starts_with("sound/") && !allow_download_sounds)
        // now maps (note special case for maps, must not be in pak)
        || (name.starts_with("maps/") && !allow_download_maps)
        // MUST be in a subdirectory
        || !name.contains('/')
    {
        // don't allow anything with .. path
        let client = &mut ctx.svs.clients[client_idx];
        msg_write_byte(&mut client.netchan.message, SvcOps::Download as i32);
        msg_write_short(&mut client.netchan.message, -1);
        msg_write_byte(&mut client.netchan.message, 0);
        return;
    }

    let client = &mut ctx.svs.clients[client_idx];

    // free any existing download
    client.download = None;

    let (data, file_from_pak) = fs_load_file(&name);
    client.downloadsize = data.as_ref().map_or(0, |d| d.len() as i32);
    client.download = data;
    client.downloadcount = offset;
    client.download_compressed = want_compressed;

    if offset > client.downloadsize {
        client.downloadcount = client.downloadsize;
    }

    let max_download_size = ctx.sv_max_download_size;
    let client = &mut ctx.svs.clients[client_idx];
    let too_large = max_download_size > 0 && client.downloadsize > max_download_size;

    let download_failed = client.download.is_none()
        // special check for maps, if it came from a pak file, don't allow
        // download  ZOID
        || (name.starts_with("maps/") && file_from_pak)
        || too_large;

    if too_large {
        com_printf(&format!(
            "Refusing download of {} ({} bytes exceeds sv_max_download_size)\n",
            name, client.downloadsize
        ));
    }

    if download_failed {
        com_dprintf(&format!("Couldn't download {} to {}\n", name, client.name));
        client.download = None;

        msg_write_byte(&mut client.netchan.message, SvcOps::Download as i32);
        msg_write_short(&mut client.netchan.message, -1);
        msg_write_byte(&mut client.netchan.message, 0);
        return;
    }

    sv_next_download_f(ctx, client_idx);
    com_dprintf(&format!("Downloading {} to {}\n", name, ctx.svs.clients[client_idx].name));
}

// ============================================================================

/// SV_Disconnect_f
///
/// The client is going to disconnect, so remove the connection immediately
pub fn sv_disconnect_f(ctx: &mut ServerContext, client_idx: usize) {
    crate::sv_main::sv_drop_client(ctx, client_idx);
}

/// SV_ShowServerinfo_f
///
/// Dumps the serverinfo info string
pub fn sv_showserverinfo_f(_ctx: &ServerContext) {
    let serverinfo = cvar_serverinfo();
    info_print(&serverinfo);
}

/// SV_Nextserver
pub fn sv_nextserver(ctx: &mut ServerContext) {
    // ZOID, ss_pic can be nextserver'd in coop mode
    if ctx.sv.state == ServerState::Game
        || (ctx.sv.state == ServerState::Pic && cvar_variable_value("coop") == 0.0)
    {
        return; // can't nextserver while playing a normal game
    }

    ctx.svs.spawncount += 1; // make sure another doesn't sneak in
    let v = cvar_variable_string("nextserver");
    if v.is_empty() {
        cbuf_add_text("killserver\n");
    } else {
        cbuf_add_text(&v);
        cbuf_add_text("\n");
    }
    cvar_set("nextserver", "");
}

/// SV_Nextserver_f
///
/// A cinematic has completed or been aborted by a client, so move
/// to the next server.
pub fn sv_nextserver_f(ctx: &mut ServerContext, client_idx: usize) {
    let arg1: i32 = cmd_argv(1).parse().unwrap_or(0);
    if arg1 != ctx.svs.spawncount {
        com_dprintf(&format!(
            "Nextserver() from wrong level, from {}\n",
            ctx.svs.clients[client_idx].name
        ));
        return; // leftover from last server
    }

    com_dprintf(&format!(
        "Nextserver() from {}\n",
        ctx.svs.clients[client_idx].name
    ));

    sv_nextserver(ctx);
}

/// User command dispatch table (equivalent to ucmds[] in C)
static UCMDS: &[(&str, fn(&mut ServerContext, usize))] = &[
    // auto issued
    ("new", sv_new_f),
    ("configstrings", sv_configstrings_f),
    ("baselines", sv_baselines_f),
    ("begin", sv_begin_f),
    ("nextserver", sv_nextserver_f),
    ("disconnect", sv_disconnect_f),
    // issued by hand at client consoles
    ("info", sv_showserverinfo_f_wrapper),
    ("sinfo", sv_showclientinfo_f),
    ("download", sv_begin_download_f),
    ("nextdl", sv_next_download_f),
    ("nogamedata", sv_nogamedata_f),
    (crate::sv_probe::PROBE_REPLY_CMD, crate::sv_probe::sv_probe_reply_f),
    (crate::sv_probe::PROBE_NOOP_CMD, crate::sv_probe::sv_probe_noop_f),
];

/// Wrapper for sv_showserverinfo_f to match the (ctx, client_idx) signature
fn sv_showserverinfo_f_wrapper(_ctx: &mut ServerContext, _client_idx: usize) {
    let serverinfo = cvar_serverinfo();
    info_print(&serverinfo);
}

/// `sinfo`: print the issuing client's own userinfo string back to its console.
fn sv_showclientinfo_f(ctx: &mut ServerContext, client_idx: usize) {
    let userinfo = ctx.svs.clients[client_idx].userinfo.clone();
    info_print(&userinfo);
}

/// `nogamedata`: client signals it won't accept game-rules-provided resources
/// (e.g. a spectator-only proxy). No server-side behavior beyond acknowledgement.
fn sv_nogamedata_f(ctx: &mut ServerContext, client_idx: usize) {
    com_dprintf(&format!(
        "{} declared nogamedata\n",
        ctx.svs.clients[client_idx].name
    ));
}

/// SV_ExecuteUserCommand
pub fn sv_execute_user_command(ctx: &mut ServerContext, client_idx: usize, s: &str) {
    // client-originated text is never macro-expanded against server cvars
    cmd_tokenize_string(s, false);

    let cmd_name = cmd_argv(0);
    let mut found = false;

    for &(name, func) in UCMDS {
        if cmd_name == name {
            func(ctx, client_idx);
            found = true;
            break;
        }
    }

    if !found && ctx.sv.state == ServerState::Game {
        let edict_idx = ctx.svs.clients[client_idx].edict_index as usize;
        if let Some(ref mut ge) = ctx.ge {
            if let Some(cmd_fn) = ge.client_command {
                if let Some(ent) = ge.edicts.get_mut(edict_idx) {
                    cmd_fn(ent);
                }
            }
        }
    }
}

// ===========================================================================
// USER CMD EXECUTION
// ===========================================================================

/// SV_ClientThink
pub fn sv_client_think(ctx: &mut ServerContext, client_idx: usize, cmd: &UserCmd) {
    ctx.svs.clients[client_idx].command_msec -= cmd.msec as i32;

    if ctx.svs.clients[client_idx].command_msec < 0 {
        ctx.svs.clients[client_idx].command_msec_overflow_count += 1.0;

        if ctx.sv_enforcetime >= 2 && ctx.svs.clients[client_idx].command_msec_overflow_count >= 10.0 {
            com_printf(&format!(
                "commandMsec overflow, kicking {}\n",
                ctx.svs.clients[client_idx].name
            ));
            crate::sv_main::sv_drop_client(ctx, client_idx);
            return;
        }

        if ctx.sv_enforcetime >= 1 {
            com_dprintf(&format!("commandMsec underflow from {}\n", ctx.svs.clients[client_idx].name));
            return;
        }
    } else {
        ctx.svs.clients[client_idx].command_msec_overflow_count *= 0.94;
    }

    let edict_idx = ctx.svs.clients[client_idx].edict_index as usize;
    if let Some(ref mut ge) = ctx.ge {
        if let Some(think_fn) = ge.client_think {
            if let Some(ent) = ge.edicts.get_mut(edict_idx) {
                think_fn(ent, cmd);
            }
        }
    }
}

/// Cheat-guard ceiling on a single usercmd's frame time (spec: kick + blackhole above this).
const MAX_USERCMD_MSEC: i32 = 250;

/// SV_ExecuteClientMessage
///
/// The current net_message is parsed for the given client
pub fn sv_execute_client_message(ctx: &mut ServerContext, client_idx: usize, net_message: &mut SizeBuf) {
    if crate::sv_main::sv_is_blackholed(ctx, &ctx.svs.clients[client_idx].netchan.remote_address) {
        crate::sv_main::sv_drop_client(ctx, client_idx);
        return;
    }

    // only allow one move command
    let mut move_issued = false;
    let mut string_cmd_count: i32 = 0;

    loop {
        if net_message.readcount > net_message.cursize {
            com_printf("SV_ReadClientMessage: badread\n");
            crate::sv_main::sv_drop_client(ctx, client_idx);
            return;
        }

        let c = msg_read_byte(net_message);
        if c == -1 {
            break;
        }

        if c == ClcOps::Nop as i32 {
            // nop — do nothing
        } else if c == ClcOps::UserInfo as i32 {
            let info = msg_read_string(net_message);
            let client = &mut ctx.svs.clients[client_idx];
            // strncpy equivalent — truncate to MAX_INFO_STRING - 1
            client.userinfo = if info.len() >= MAX_INFO_STRING {
                info[..MAX_INFO_STRING - 1].to_string()
            } else {
                info
            };
            crate::sv_main::sv_userinfo_changed(ctx, client_idx);
        } else if c == ClcOps::Move as i32 {
            if move_issued {
                return; // someone is trying to cheat...
            }

            move_issued = true;
            let checksum_index = net_message.readcount;
            let checksum = msg_read_byte(net_message);
            let lastframe = msg_read_long(net_message);

            {
                let client = &mut ctx.svs.clients[client_idx];
                if lastframe != client.lastframe {
                    client.lastframe = lastframe;
                    if client.lastframe > 0 {
                        let latency_idx = (client.lastframe as usize) & (LATENCY_COUNTS - 1);
                        let frame_idx = (client.lastframe as usize) & (UPDATE_BACKUP as usize - 1);
                        if frame_idx < client.frames.len() {
                            client.frame_latency[latency_idx] =
                                ctx.svs.realtime - client.frames[frame_idx].senttime;
                        }
                    }
                }
            }

            let nullcmd = UserCmd::default();
            let oldest = msg_read_delta_usercmd(net_message, &nullcmd);
            let oldcmd = msg_read_delta_usercmd(net_message, &oldest);
            let newcmd = msg_read_delta_usercmd(net_message, &oldcmd);

            if ctx.svs.clients[client_idx].state != ClientState::Spawned {
                ctx.svs.clients[client_idx].lastframe = -1;
                continue;
            }

            // if the checksum fails, ignore the rest of the packet
            let calculated_checksum = myq2_common::common::com_block_sequence_crc_byte(
                &net_message.data[(checksum_index + 1) as usize..net_message.readcount as usize],
                ctx.svs.clients[client_idx].netchan.incoming_sequence,
            ) as i32;

            if calculated_checksum != checksum {
                com_dprintf(&format!(
                    "Failed command checksum for {} ({} != {})/{}\n",
                    ctx.svs.clients[client_idx].name,
                    calculated_checksum,
                    checksum,
                    ctx.svs.clients[client_idx].netchan.incoming_sequence
                ));
                return;
            }

            if oldest.msec as i32 > MAX_USERCMD_MSEC
                || oldcmd.msec as i32 > MAX_USERCMD_MSEC
                || newcmd.msec as i32 > MAX_USERCMD_MSEC
            {
                com_printf(&format!(
                    "{} kicked for oversized usercmd.msec ({}/{}/{})\n",
                    ctx.svs.clients[client_idx].name, oldest.msec, oldcmd.msec, newcmd.msec
                ));
                crate::sv_main::sv_kick_and_blackhole(ctx, client_idx);
                return;
            }

            if !ctx.sv_paused {
                let mut net_drop = ctx.svs.clients[client_idx].netchan.dropped;
                if net_drop < 20 {
                    while net_drop > 2 {
                        let lastcmd = ctx.svs.clients[client_idx].lastcmd;
                        sv_client_think(ctx, client_idx, &lastcmd);
                        net_drop -= 1;
                    }
                    if net_drop > 1 {
                        sv_client_think(ctx, client_idx, &oldest);
                    }
                    if net_drop > 0 {
                        sv_client_think(ctx, client_idx, &oldcmd);
                    }
                }
                sv_client_think(ctx, client_idx, &newcmd);
            }

            ctx.svs.clients[client_idx].lastcmd = newcmd;
        } else if c == ClcOps::StringCmd as i32 {
            // 0xFF bytes and `$`-macro expansion attempts are never legitimate
            // client stringcmds. Scan the raw payload ahead of the read since
            // MSG_ReadString reads chars signed and would silently truncate
            // at a 0xFF byte (it reads as -1, same as the NUL terminator).
            if stringcmd_has_banned_bytes(net_message) {
                crate::sv_main::sv_kick_and_blackhole(ctx, client_idx);
                return;
            }

            let s = msg_read_string(net_message);

            // malicious users may try using too many string commands
            string_cmd_count += 1;
            if string_cmd_count < MAX_STRINGCMDS {
                sv_execute_user_command(ctx, client_idx, &s);
            }

            if ctx.svs.clients[client_idx].state == ClientState::Zombie {
                return; // disconnect command
            }
        } else {
            com_printf("SV_ReadClientMessage: unknown command char\n");
            crate::sv_main::sv_drop_client(ctx, client_idx);
            return;
        }
    }
}

// ============================================================
// Placeholder stubs and wrappers for external functions
// ============================================================

/// FS_LoadFile wrapper — adapts myq2_common::files::fs_load_file_ex to also
/// return a from_pak boolean indicating whether the file was found inside a pak.
fn fs_load_file(name: &str) -> (Option<Vec<u8>>, bool) {
    myq2_common::files::fs_load_file_ex(name)
}

/// Info_Print — Pretty-print an info string's key/value pairs.
fn info_print(s: &str) {
    myq2_common::common::info_print(s);
}

/// Cbuf_InsertFromDefer — Insert deferred command text into the command buffer.
///
/// After a client finishes spawning (SV_Begin_f), any deferred commands
/// (e.g. from stuffcmds during map load) are flushed into the main
/// command buffer for immediate execution.
fn cbuf_insert_from_defer() {
    myq2_common::cmd::cbuf_insert_from_defer();
}

/// MSG_WriteDeltaEntity — Write a delta-compressed entity state to a message buffer.
///
/// Compares `from` and `to` entity states and writes only the changed
/// fields to the buffer. If `force` is true, writes even if nothing changed.
/// If `newentity` is true, forces old_origin to be sent.
fn msg_write_delta_entity(
    from: &EntityState,
    to: &EntityState,
    buf: &mut SizeBuf,
    force: bool,
    newentity: bool,
) {
    myq2_common::common::msg_write_delta_entity(from, to, buf, force, newentity);
}

/// MSG_ReadByte — Read a single byte from a message buffer.
///
/// Returns -1 if the read position is past the end of the buffer.
fn msg_read_byte(buf: &mut SizeBuf) -> i32 {
    myq2_common::common::msg_read_byte(buf)
}

/// MSG_ReadLong — Read a 32-bit integer from a message buffer.
///
/// Reads in little-endian byte order. Returns -1 on buffer overrun.
fn msg_read_long(buf: &mut SizeBuf) -> i32 {
    myq2_common::common::msg_read_long(buf)
}

/// MSG_ReadString — Read a null-terminated string from a message buffer.
///
/// Reads bytes until a null terminator or end of buffer is reached.
fn msg_read_string(buf: &mut SizeBuf) -> String {
    myq2_common::common::msg_read_string(buf)
}

/// MSG_ReadDeltaUsercmd — Read a delta-compressed user command.
///
/// Decodes a UserCmd that was delta-compressed against the `from` command.
/// The delta encoding uses bit flags to indicate which fields changed.
fn msg_read_delta_usercmd(buf: &mut SizeBuf, from: &UserCmd) -> UserCmd {
    myq2_common::common::msg_read_delta_usercmd(buf, from)
}
