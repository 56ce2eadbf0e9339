//! Replicated item storage with a shared partition and one private
//! partition per player.
//!
//! Every change emits a STORE_SET or STORE_DEL notice: shared changes go to
//! every observer, private changes only to the owning player. Client
//! replicas apply the notices through listeners.
//!
//! The store only sees changes made through its API. An item edited in
//! place must be set again before clients learn about it.

use crate::error::{arg, opt_arg, PluginResult};
use ludus_engine::{Listeners, Plugin, Session};
use ludus_filter::Filter;
use ludus_sync::Recipients;
use ludus_types::{Args, Entity, Filterable, Notice, NoticeType, PlayerId, Viewer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Plugin name. Store notices carry it as their source.
pub const STORE_NAME: &str = "store";

/// A stored record: an entity with an opaque payload.
///
/// Items created inside action handlers should take their id from the
/// call's stash or its arguments, so replicas replaying the call agree on
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    entity: Entity,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
}

impl Item {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entity: Entity::new(),
            data: Value::Null,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            entity: Entity::named(name),
            data: Value::Null,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.entity = self.entity.with_id(id);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity = self.entity.with_kind(kind);
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.entity = self.entity.with_flag(flag);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub(crate) fn from_parts(entity: Entity, data: Value) -> Self {
        Self { entity, data }
    }

    pub fn id(&self) -> &str {
        self.entity.id()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl Filterable for Item {
    fn entity(&self) -> &Entity {
        &self.entity
    }
}

type Partition = BTreeMap<String, Item>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSet {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    shared: Partition,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    player: BTreeMap<PlayerId, Partition>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    all: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shared: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    player: BTreeMap<PlayerId, Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    shared: Partition,
    #[serde(default)]
    players: BTreeMap<PlayerId, Partition>,
}

/// Shared and per-player item storage.
#[derive(Debug, Default)]
pub struct ObjectStore {
    shared: Partition,
    players: BTreeMap<PlayerId, Partition>,
}

impl ObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks an id up in the shared partition, then in each player's
    /// partition by seat.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.shared
            .get(id)
            .or_else(|| self.players.values().find_map(|p| p.get(id)))
    }

    /// Removes ids from the shared partition and every player partition.
    pub fn delete(&mut self, session: &mut Session<'_>, ids: Vec<String>) {
        self.remove_everywhere(&ids);
        let del = StoreDel {
            all: Some(ids),
            ..Default::default()
        };
        emit(session, Recipients::All, NoticeType::STORE_DEL, &del);
    }

    pub fn get_shared(&self, id: &str) -> Option<&Item> {
        self.shared.get(id)
    }

    /// Inserts or replaces a shared item and returns its id.
    pub fn set_shared(&mut self, session: &mut Session<'_>, item: Item) -> String {
        let id = item.id().to_string();
        self.shared.insert(id.clone(), item.clone());
        let set = StoreSet {
            shared: BTreeMap::from([(id.clone(), item)]),
            ..Default::default()
        };
        emit(session, Recipients::All, NoticeType::STORE_SET, &set);
        id
    }

    pub fn delete_shared(&mut self, session: &mut Session<'_>, ids: Vec<String>) {
        for id in &ids {
            self.shared.remove(id);
        }
        let del = StoreDel {
            shared: Some(ids),
            ..Default::default()
        };
        emit(session, Recipients::All, NoticeType::STORE_DEL, &del);
    }

    pub fn list_shared(&self, filter: &Filter) -> Vec<&Item> {
        filter.select(self.shared.values())
    }

    pub fn get_player(&self, player: PlayerId, id: &str) -> Option<&Item> {
        self.players.get(&player)?.get(id)
    }

    /// Inserts or replaces an item in `player`'s partition. Only that
    /// player is told.
    pub fn set_player(&mut self, session: &mut Session<'_>, player: PlayerId, item: Item) -> String {
        let id = item.id().to_string();
        self.players.entry(player).or_default().insert(id.clone(), item.clone());
        let set = StoreSet {
            player: BTreeMap::from([(player, BTreeMap::from([(id.clone(), item)]))]),
            ..Default::default()
        };
        emit(session, player, NoticeType::STORE_SET, &set);
        id
    }

    pub fn delete_player(&mut self, session: &mut Session<'_>, player: PlayerId, ids: Vec<String>) {
        if let Some(partition) = self.players.get_mut(&player) {
            for id in &ids {
                partition.remove(id);
            }
        }
        let del = StoreDel {
            player: BTreeMap::from([(player, ids)]),
            ..Default::default()
        };
        emit(session, player, NoticeType::STORE_DEL, &del);
    }

    pub fn list_player(&self, player: PlayerId, filter: &Filter) -> Vec<&Item> {
        match self.players.get(&player) {
            Some(partition) => filter.select(partition.values()),
            None => Vec::new(),
        }
    }

    fn remove_everywhere(&mut self, ids: &[String]) {
        for id in ids {
            self.shared.remove(id);
            for partition in self.players.values_mut() {
                partition.remove(id);
            }
        }
    }

    fn apply_set(&mut self, set: StoreSet) {
        self.shared.extend(set.shared);
        for (player, items) in set.player {
            self.players.entry(player).or_default().extend(items);
        }
    }

    fn apply_del(&mut self, del: StoreDel) {
        if let Some(ids) = del.all {
            self.remove_everywhere(&ids);
        }
        for id in del.shared.unwrap_or_default() {
            self.shared.remove(&id);
        }
        for (player, ids) in del.player {
            if let Some(partition) = self.players.get_mut(&player) {
                for id in ids {
                    partition.remove(&id);
                }
            }
        }
    }
}

fn emit<T: Serialize>(session: &mut Session<'_>, to: impl Into<Recipients>, kind: NoticeType, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(data) => session.notify(to, Notice::new(STORE_NAME, kind, data)),
        Err(e) => warn!(error = %e, "store notice not serializable"),
    }
}

fn ids_arg(args: &Args) -> PluginResult<Vec<String>> {
    arg(args, "ids")
}

fn filter_arg(args: &Args) -> PluginResult<Filter> {
    Ok(opt_arg(args, "filter")?.unwrap_or(Filter::All))
}

impl Plugin for ObjectStore {
    fn name(&self) -> &str {
        STORE_NAME
    }

    fn compat(&self) -> u32 {
        1
    }

    fn methods(&self) -> Vec<String> {
        [
            "get",
            "del",
            "get_shared",
            "set_shared",
            "del_shared",
            "list_shared",
            "get_player",
            "set_player",
            "del_player",
            "list_player",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn method_prefix(&self) -> &str {
        "stor_"
    }

    fn invoke(&mut self, session: &mut Session<'_>, method: &str, args: &Args) -> anyhow::Result<Value> {
        let value = match method {
            "get" => serde_json::to_value(self.get(&arg::<String>(args, "id")?))?,
            "del" => {
                self.delete(session, ids_arg(args)?);
                Value::Null
            }
            "get_shared" => serde_json::to_value(self.get_shared(&arg::<String>(args, "id")?))?,
            "set_shared" => json!(self.set_shared(session, arg(args, "item")?)),
            "del_shared" => {
                self.delete_shared(session, ids_arg(args)?);
                Value::Null
            }
            "list_shared" => serde_json::to_value(self.list_shared(&filter_arg(args)?))?,
            "get_player" => {
                let item = self.get_player(arg(args, "player")?, &arg::<String>(args, "id")?);
                serde_json::to_value(item)?
            }
            "set_player" => json!(self.set_player(session, arg(args, "player")?, arg(args, "item")?)),
            "del_player" => {
                self.delete_player(session, arg(args, "player")?, ids_arg(args)?);
                Value::Null
            }
            "list_player" => serde_json::to_value(self.list_player(arg(args, "player")?, &filter_arg(args)?))?,
            other => anyhow::bail!("method '{other}' not implemented"),
        };
        Ok(value)
    }

    fn notice_types(&self) -> Vec<(&'static str, NoticeType)> {
        vec![("STORE_SET", NoticeType::STORE_SET), ("STORE_DEL", NoticeType::STORE_DEL)]
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::<Self>::new()
            .on(NoticeType::STORE_SET, |store, session, _, _, notice| {
                if session.is_client() && notice.source() == STORE_NAME {
                    store.apply_set(serde_json::from_value(notice.data().clone())?);
                }
                Ok(())
            })
            .on(NoticeType::STORE_DEL, |store, session, _, _, notice| {
                if session.is_client() && notice.source() == STORE_NAME {
                    store.apply_del(serde_json::from_value(notice.data().clone())?);
                }
                Ok(())
            })
    }

    fn get_state(&self, viewer: Viewer) -> anyhow::Result<Value> {
        let players: BTreeMap<&PlayerId, &Partition> =
            self.players.iter().filter(|(player, _)| viewer.can_see(**player)).collect();
        Ok(json!({ "shared": self.shared, "players": players }))
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        let state: StoreState = if state.is_null() {
            StoreState::default()
        } else {
            serde_json::from_value(state)?
        };
        self.shared = state.shared;
        self.players = state.players;
        Ok(())
    }
}
