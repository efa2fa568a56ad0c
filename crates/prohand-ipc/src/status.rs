//! Non-blocking status channel
//!
//! `try_recv` returns at most one envelope per call, newest first. Samples
//! that are not newer than one already delivered for the same stream
//! (duplicates, or older samples surfacing after a newer one) are dropped.
//! Alerts are keyed by code, so distinct alerts queued behind each other all
//! surface. Ordering restarts with every transport session.

use crate::error::Result;
use crate::transport::SubscribeTransport;
use prohand_core::wire;
use prohand_core::{StatusEnvelope, StatusPayload};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// A uid further behind than this is taken as a host restart, not staleness
const STALE_WINDOW: u32 = 1024;

pub struct StatusChannel {
    transport: Box<dyn SubscribeTransport>,
    last_uid: HashMap<(u16, u16), u32>,
    session: u64,
}

/// Telemetry stream a sample belongs to: kind tag plus group/actuator
fn stream_key(kind: u16, payload: &StatusPayload) -> (u16, u16) {
    let sub = match payload {
        StatusPayload::Group(status) => status.group.code() as u16,
        StatusPayload::Actuator(state) => ((state.group.code() as u16) << 8) | state.index as u16,
        StatusPayload::GroupTarget(target) => target.kind.code() as u16,
        StatusPayload::Alert(alert) => alert.code,
        _ => 0,
    };
    (kind, sub)
}

impl StatusChannel {
    pub fn new(transport: Box<dyn SubscribeTransport>) -> Self {
        let session = transport.session();
        Self {
            transport,
            last_uid: HashMap::new(),
            session,
        }
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    /// Current transport session; changes when the publisher reconnects
    pub fn session(&self) -> u64 {
        self.transport.session()
    }

    /// Next fresh envelope, or `None` when nothing is pending
    pub fn try_recv(&mut self) -> Result<Option<StatusEnvelope>> {
        loop {
            let Some(frame) = self.transport.try_recv()? else {
                return Ok(None);
            };

            let session = self.transport.session();
            if session != self.session {
                debug!(session, "Status publisher reconnected, resetting sample order");
                self.session = session;
                self.last_uid.clear();
            }

            let (kind, env) = match wire::peek_header(&frame).and_then(|h| {
                wire::decode_status(&frame).map(|env| (h.kind, env))
            }) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(error = %e, len = frame.len(), "Dropping undecodable status frame");
                    continue;
                }
            };

            if !self.is_fresh(stream_key(kind, &env.payload), env.uid) {
                trace!(uid = env.uid, payload = env.payload.name(), "Dropping stale status");
                continue;
            }

            trace!(uid = env.uid, payload = env.payload.name(), "Status received");
            return Ok(Some(env));
        }
    }

    fn is_fresh(&mut self, key: (u16, u16), uid: u32) -> bool {
        match self.last_uid.get(&key) {
            Some(&last) => {
                if last.wrapping_sub(uid) <= STALE_WINDOW {
                    return false;
                }
                self.last_uid.insert(key, uid);
                true
            }
            None => {
                self.last_uid.insert(key, uid);
                true
            }
        }
    }

    /// Drain every pending envelope, newest first
    pub fn drain(&mut self) -> Result<Vec<StatusEnvelope>> {
        let mut out = Vec::new();
        while let Some(env) = self.try_recv()? {
            out.push(env);
        }
        Ok(out)
    }
}
