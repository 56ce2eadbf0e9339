//! The grant plugin.
//!
//! A server issues grants, triggers them on a player's behalf and expires
//! them. Every change goes out as a GRANT or EXPIRE notice; client replicas
//! apply those notices through listeners and never change grants on their
//! own.

use crate::error::{GrantError, GrantResult};
use crate::grant::{Call, Expiry, Grant};
use ludus_engine::{EngineResult, Listeners, Plugin, Session};
use ludus_filter::Filter;
use ludus_sync::Recipients;
use ludus_types::{Args, Notice, NoticeType, PlayerId, Viewer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Plugin name. Grant notices carry it as their source.
pub const PLUGIN_NAME: &str = "grants";

type PlayerGrants = BTreeMap<String, Grant>;

#[derive(Debug, Serialize, Deserialize)]
struct GrantNotice {
    players: Vec<PlayerId>,
    grants: Vec<Grant>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpireNotice {
    filters: Vec<Expiry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantState {
    #[serde(default)]
    grants: BTreeMap<PlayerId, PlayerGrants>,
}

/// Per-player grant storage, keyed by grant id.
#[derive(Debug, Default)]
pub struct GrantManager {
    grants: BTreeMap<PlayerId, PlayerGrants>,
}

impl GrantManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives every grant to every listed player. Server only; a client
    /// learns about grants from the GRANT notice.
    pub fn grant(&mut self, session: &mut Session<'_>, players: &[PlayerId], grants: Vec<Grant>) {
        if !session.is_server() {
            debug!(plugin = PLUGIN_NAME, "grant ignored on client");
            return;
        }
        self.store(players, &grants);
        let data = json!({ "players": players, "grants": grants });
        session.notify(Recipients::All, Notice::new(PLUGIN_NAME, NoticeType::GRANT, data));
    }

    /// Schedules the grant's action for `player`.
    ///
    /// Returns `Ok(false)` when the player holds no such grant or a check
    /// rejects the action. On success the grant's expiry list is applied,
    /// then the grant itself expires unless it is repeatable.
    pub fn trigger(
        &mut self,
        session: &mut Session<'_>,
        player: PlayerId,
        grant_id: &str,
        args: Args,
    ) -> EngineResult<bool> {
        let Some(grant) = self.find_grant(player, grant_id).cloned() else {
            debug!(%player, grant = grant_id, "trigger for unknown grant");
            return Ok(false);
        };
        let args = grant.resolve_args(args);
        if !session.schedule(grant.action(), args)? {
            return Ok(false);
        }
        debug!(%player, grant = grant_id, action = grant.action(), "grant triggered");
        self.expire(session, grant.expires().to_vec());
        if !grant.is_repeatable() {
            self.expire(session, vec![Expiry::Id(grant.id().to_string())]);
        }
        Ok(true)
    }

    pub fn trigger_call(&mut self, session: &mut Session<'_>, player: PlayerId, call: Call) -> EngineResult<bool> {
        let grant_id = call.grant_id().to_string();
        self.trigger(session, player, &grant_id, call.into_args())
    }

    /// Expires grants. Server only. An empty list is a no-op; otherwise one
    /// EXPIRE notice goes out whether or not anything matched.
    pub fn expire(&mut self, session: &mut Session<'_>, filters: Vec<Expiry>) {
        if filters.is_empty() {
            return;
        }
        if !session.is_server() {
            debug!(plugin = PLUGIN_NAME, "expire ignored on client");
            return;
        }
        let data = json!({ "filters": filters });
        session.notify(Recipients::All, Notice::new(PLUGIN_NAME, NoticeType::EXPIRE, data));
        self.remove(&filters);
    }

    pub fn find_grant(&self, player: PlayerId, grant_id: &str) -> Option<&Grant> {
        self.grants.get(&player)?.get(grant_id)
    }

    /// Grants `player` holds that `filter` matches, ordered by id.
    pub fn list_grants(&self, player: PlayerId, filter: &Filter) -> Vec<&Grant> {
        match self.grants.get(&player) {
            Some(map) => filter.select(map.values()),
            None => Vec::new(),
        }
    }

    /// Total number of grants held across players.
    pub fn len(&self) -> usize {
        self.grants.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&mut self, players: &[PlayerId], grants: &[Grant]) {
        for player in players {
            let map = self.grants.entry(*player).or_default();
            for grant in grants {
                map.insert(grant.id().to_string(), grant.clone());
            }
        }
    }

    fn remove(&mut self, filters: &[Expiry]) {
        for expiry in filters {
            match expiry {
                Expiry::All => {
                    for map in self.grants.values_mut() {
                        map.clear();
                    }
                    return;
                }
                Expiry::Id(id) => {
                    for map in self.grants.values_mut() {
                        map.remove(id);
                    }
                }
                Expiry::Matching(filter) => {
                    for map in self.grants.values_mut() {
                        map.retain(|_, grant| !filter.matches(grant));
                    }
                }
            }
        }
    }

    fn from_source(session: &Session<'_>, notice: &Notice) -> bool {
        session.is_client() && notice.source() == PLUGIN_NAME
    }
}

fn arg<T: DeserializeOwned>(args: &Args, name: &str) -> GrantResult<T> {
    let value = args.get(name).ok_or_else(|| GrantError::missing(name))?;
    serde_json::from_value(value.clone()).map_err(|e| GrantError::InvalidArgument {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn arg_or<T: DeserializeOwned>(args: &Args, name: &str, fallback: T) -> GrantResult<T> {
    match args.get(name) {
        Some(_) => arg(args, name),
        None => Ok(fallback),
    }
}

impl Plugin for GrantManager {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn compat(&self) -> u32 {
        1
    }

    fn methods(&self) -> Vec<String> {
        ["grant", "trigger", "trigger_call", "expire", "find_grant", "list_grants"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn invoke(&mut self, session: &mut Session<'_>, method: &str, args: &Args) -> anyhow::Result<Value> {
        match method {
            "grant" => {
                let players: Vec<PlayerId> = arg(args, "players")?;
                let grants: Vec<Grant> = arg(args, "grants")?;
                let count = grants.len();
                self.grant(session, &players, grants);
                Ok(json!(count))
            }
            "trigger" => {
                let player = arg(args, "player")?;
                let id: String = arg(args, "id")?;
                let call_args = arg_or(args, "args", Args::new())?;
                Ok(json!(self.trigger(session, player, &id, call_args)?))
            }
            "trigger_call" => {
                let player = arg(args, "player")?;
                let call: Call = arg(args, "call")?;
                Ok(json!(self.trigger_call(session, player, call)?))
            }
            "expire" => {
                let filters = arg_or(args, "filters", vec![Expiry::All])?;
                self.expire(session, filters);
                Ok(Value::Null)
            }
            "find_grant" => {
                let player = arg(args, "player")?;
                let id: String = arg(args, "id")?;
                Ok(serde_json::to_value(self.find_grant(player, &id))?)
            }
            "list_grants" => {
                let player = arg(args, "player")?;
                let filter = arg_or(args, "filter", Filter::All)?;
                Ok(serde_json::to_value(self.list_grants(player, &filter))?)
            }
            other => anyhow::bail!("method '{other}' not implemented"),
        }
    }

    fn notice_types(&self) -> Vec<(&'static str, NoticeType)> {
        vec![("GRANT", NoticeType::GRANT), ("EXPIRE", NoticeType::EXPIRE)]
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::<Self>::new()
            .on(NoticeType::GRANT, |grants, session, _, _, notice| {
                if Self::from_source(session, notice) {
                    let payload: GrantNotice = serde_json::from_value(notice.data().clone())?;
                    grants.store(&payload.players, &payload.grants);
                }
                Ok(())
            })
            .on(NoticeType::EXPIRE, |grants, session, _, _, notice| {
                if Self::from_source(session, notice) {
                    let payload: ExpireNotice = serde_json::from_value(notice.data().clone())?;
                    grants.remove(&payload.filters);
                }
                Ok(())
            })
    }

    fn get_state(&self, viewer: Viewer) -> anyhow::Result<Value> {
        let visible: BTreeMap<&PlayerId, &PlayerGrants> =
            self.grants.iter().filter(|(player, _)| viewer.can_see(**player)).collect();
        Ok(json!({ "grants": visible }))
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        let state: GrantState = if state.is_null() {
            GrantState::default()
        } else {
            serde_json::from_value(state)?
        };
        self.grants = state.grants;
        Ok(())
    }
}
