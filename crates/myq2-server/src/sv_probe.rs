// sv_probe.rs — cvar probing and reply policy
//
// A connecting client is asked to echo back the value of a small set of
// cvars via a reserved `\177c <var> <value>` stringcmd; a policy table
// decides what (if anything) to do about the reply. Grounded on the
// stufftext/reliable-reply pattern `sv_new_f`/`sv_user.rs` already use for
// `cmd configstrings`.

use crate::server::*;
use myq2_common::common::{com_dprintf, com_printf};
use myq2_common::q_shared::*;
use myq2_common::qcommon::*;

/// Reserved stringcmd a compliant client sends back in reply to a cvar probe.
pub const PROBE_REPLY_CMD: &str = "\u{7f}c";

/// No-op reliable command, used to force client-side ack progress during
/// baseline batching and as a harmless probe filler.
pub const PROBE_NOOP_CMD: &str = "\u{7f}n";

/// How long the server waits for a reply to the forced version probe before
/// logging it as missing (informational only — does not drop the session).
pub const PROBE_REPLY_TIMEOUT_MS: i32 = 5000;

/// Match predicate for a probed cvar's reported value.
#[derive(Debug, Clone)]
pub enum ProbePredicate {
    Any,
    Eq(String),
    Lt(i64),
    Gt(i64),
    Contains(String),
    IEqual(String),
    Literal(String),
}

impl ProbePredicate {
    fn test(&self, value: &str) -> bool {
        match self {
            ProbePredicate::Any => true,
            ProbePredicate::Eq(n) => value == n,
            ProbePredicate::Lt(n) => value.trim().parse::<i64>().map(|v| v < *n).unwrap_or(false),
            ProbePredicate::Gt(n) => value.trim().parse::<i64>().map(|v| v > *n).unwrap_or(false),
            ProbePredicate::Contains(s) => value.contains(s.as_str()),
            ProbePredicate::IEqual(s) => value.eq_ignore_ascii_case(s),
            ProbePredicate::Literal(s) => value == s,
        }
    }
}

/// Action taken when a policy rule's predicate matches (after `negate`).
#[derive(Debug, Clone)]
pub enum ProbeAction {
    Log,
    Message(String),
    Exec(String),
    Stuff(String),
    Blackhole,
    Drop,
}

/// One entry of the reply policy table: `{varname, predicate, action}`,
/// predicate optionally negated (spec: leading `!`).
#[derive(Debug, Clone)]
pub struct ProbeRule {
    pub varname: String,
    pub predicate: ProbePredicate,
    pub negate: bool,
    pub action: ProbeAction,
}

impl ProbeRule {
    pub fn new(varname: &str, predicate: ProbePredicate, action: ProbeAction) -> Self {
        Self { varname: varname.to_string(), predicate, negate: false, action }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    fn matches(&self, value: &str) -> bool {
        self.predicate.test(value) != self.negate
    }
}

/// Send the forced `version` cvar probe, asking the client to echo its
/// `version` cvar back via `\177c version <value>`. Called once per client
/// at the start of the spawn sequence (the `new` stringcmd).
pub fn sv_send_version_probe(ctx: &mut ServerContext, client_idx: usize) {
    let realtime = ctx.svs.realtime;
    let client = &mut ctx.svs.clients[client_idx];
    msg_write_byte(&mut client.netchan.message, SvcOps::StuffText as i32);
    msg_write_string(
        &mut client.netchan.message,
        &format!("cmd {} version $version\n", PROBE_REPLY_CMD),
    );
    client.probe_sent_time = realtime;
    client.probe_awaiting_reply = true;
}

/// Handle a `\177c <var> <value>` reply. Records the client's reported
/// version and evaluates the policy table against the reported value.
pub fn sv_probe_reply_f(ctx: &mut ServerContext, client_idx: usize) {
    if myq2_common::cmd::cmd_argc() < 3 {
        return;
    }
    let varname = myq2_common::cmd::cmd_argv(1);
    let value = myq2_common::cmd::cmd_argv(2);

    if varname == "version" {
        ctx.svs.clients[client_idx].client_version = value.clone();
        ctx.svs.clients[client_idx].probe_awaiting_reply = false;
    }

    let matches: Vec<ProbeRule> = ctx
        .probe_policy
        .iter()
        .filter(|r| r.varname == varname && r.matches(&value))
        .cloned()
        .collect();
    for rule in &matches {
        apply_probe_action(ctx, client_idx, rule, &varname, &value);
    }
}

fn apply_probe_action(
    ctx: &mut ServerContext,
    client_idx: usize,
    rule: &ProbeRule,
    varname: &str,
    value: &str,
) {
    match &rule.action {
        ProbeAction::Log => {
            com_dprintf(&format!(
                "{}: probe policy matched {}={}\n",
                ctx.svs.clients[client_idx].name, varname, value
            ));
        }
        ProbeAction::Message(msg) => {
            crate::sv_send::sv_client_printf(&mut ctx.svs.clients[client_idx], PRINT_HIGH, msg);
        }
        ProbeAction::Exec(cmdline) => {
            myq2_common::cmd::cbuf_add_text(cmdline);
        }
        ProbeAction::Stuff(text) => {
            let client = &mut ctx.svs.clients[client_idx];
            msg_write_byte(&mut client.netchan.message, SvcOps::StuffText as i32);
            msg_write_string(&mut client.netchan.message, text);
        }
        ProbeAction::Blackhole => {
            ctx.svs.clients[client_idx].probe_blackholed = true;
            let adr = ctx.svs.clients[client_idx].netchan.remote_address;
            crate::sv_main::sv_blackhole_add(ctx, &adr);
        }
        ProbeAction::Drop => {
            com_printf(&format!(
                "{} dropped by probe policy ({}={})\n",
                ctx.svs.clients[client_idx].name, varname, value
            ));
            crate::sv_main::sv_drop_client(ctx, client_idx);
        }
    }
}

/// A no-op reliable stringcmd. Used by the client as a probe filler and by
/// the baseline batcher (§4.6) to force ack progress.
pub fn sv_probe_noop_f(_ctx: &mut ServerContext, _client_idx: usize) {}

/// Per-frame sweep (called alongside `sv_check_timeouts`): logs, but does not
/// drop, any client whose forced version probe went unanswered for
/// `PROBE_REPLY_TIMEOUT_MS`.
pub fn sv_check_probe_timeouts(ctx: &mut ServerContext) {
    let realtime = ctx.svs.realtime;
    let max = ctx.maxclients_value as usize;
    for i in 0..max.min(ctx.svs.clients.len()) {
        let client = &ctx.svs.clients[i];
        if client.probe_awaiting_reply
            && client.state != ClientState::Free
            && realtime.saturating_sub(client.probe_sent_time) > PROBE_REPLY_TIMEOUT_MS
        {
            com_dprintf(&format!("{}: no reply to version probe after 5s\n", client.name));
            ctx.svs.clients[i].probe_awaiting_reply = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx() -> ServerContext {
        let mut ctx = ServerContext::default();
        ctx.svs.clients.resize_with(2, Client::default);
        ctx.maxclients_value = 2.0;
        ctx
    }

    #[test]
    fn predicate_eq_matches_exact_value() {
        assert!(ProbePredicate::Eq("34".to_string()).test("34"));
        assert!(!ProbePredicate::Eq("34".to_string()).test("35"));
    }

    #[test]
    fn predicate_lt_gt_parse_numeric() {
        assert!(ProbePredicate::Lt(100).test("50"));
        assert!(!ProbePredicate::Lt(100).test("150"));
        assert!(ProbePredicate::Gt(100).test("150"));
        assert!(!ProbePredicate::Gt(100).test("not-a-number"));
    }

    #[test]
    fn predicate_contains_and_iequal() {
        assert!(ProbePredicate::Contains("cheat".to_string()).test("speedcheat-v2"));
        assert!(ProbePredicate::IEqual("R1Q2".to_string()).test("r1q2"));
    }

    #[test]
    fn rule_negation_inverts_match() {
        let rule = ProbeRule::new("version", ProbePredicate::Eq("34".to_string()), ProbeAction::Log)
            .negated();
        assert!(!rule.matches("34"));
        assert!(rule.matches("35"));
    }

    #[test]
    fn send_version_probe_writes_stufftext() {
        let mut ctx = make_ctx();
        sv_send_version_probe(&mut ctx, 0);
        assert!(ctx.svs.clients[0].probe_awaiting_reply);
        assert!(ctx.svs.clients[0].netchan.message.cursize > 0);
    }

    #[test]
    fn probe_reply_records_version_and_clears_waiting() {
        let mut ctx = make_ctx();
        ctx.svs.clients[0].probe_awaiting_reply = true;
        myq2_common::cmd::cmd_init();
        myq2_common::cmd::cmd_tokenize_string(&format!("{} version r1q2-0.51", PROBE_REPLY_CMD), true);
        sv_probe_reply_f(&mut ctx, 0);
        assert_eq!(ctx.svs.clients[0].client_version, "r1q2-0.51");
        assert!(!ctx.svs.clients[0].probe_awaiting_reply);
    }

    #[test]
    fn probe_reply_applies_blackhole_policy() {
        let mut ctx = make_ctx();
        ctx.probe_policy.push(ProbeRule::new(
            "version",
            ProbePredicate::Contains("cheat".to_string()),
            ProbeAction::Blackhole,
        ));
        myq2_common::cmd::cmd_init();
        myq2_common::cmd::cmd_tokenize_string(&format!("{} version speedcheat-v2", PROBE_REPLY_CMD), true);
        sv_probe_reply_f(&mut ctx, 0);
        assert!(ctx.svs.clients[0].probe_blackholed);
    }

    #[test]
    fn probe_reply_ignores_unrelated_varname_rules() {
        let mut ctx = make_ctx();
        ctx.probe_policy.push(ProbeRule::new(
            "fov",
            ProbePredicate::Any,
            ProbeAction::Blackhole,
        ));
        myq2_common::cmd::cmd_init();
        myq2_common::cmd::cmd_tokenize_string(&format!("{} version normal-client", PROBE_REPLY_CMD), true);
        sv_probe_reply_f(&mut ctx, 0);
        assert!(!ctx.svs.clients[0].probe_blackholed);
    }

    #[test]
    fn check_probe_timeouts_logs_without_dropping() {
        let mut ctx = make_ctx();
        ctx.svs.clients[0].state = ClientState::Connected;
        ctx.svs.clients[0].probe_awaiting_reply = true;
        ctx.svs.clients[0].probe_sent_time = 0;
        ctx.svs.realtime = PROBE_REPLY_TIMEOUT_MS + 1;
        sv_check_probe_timeouts(&mut ctx);
        assert!(!ctx.svs.clients[0].probe_awaiting_reply);
        assert_eq!(ctx.svs.clients[0].state, ClientState::Connected);
    }
}
