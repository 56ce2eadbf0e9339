//! Typed store and turn operations on [`Engine`] and [`Session`].

use crate::store::{Item, ObjectStore};
use crate::turns::{Round, Turns};
use ludus_engine::{Engine, EngineResult, Session};
use ludus_filter::Filter;
use ludus_types::PlayerId;

/// Store operations on an engine with a registered [`ObjectStore`].
pub trait EngineStore {
    fn get_item(&self, id: &str) -> EngineResult<Option<Item>>;

    fn set_shared(&self, item: Item) -> EngineResult<String>;

    fn get_shared(&self, id: &str) -> EngineResult<Option<Item>>;

    fn list_shared(&self, filter: &Filter) -> EngineResult<Vec<Item>>;

    fn set_player(&self, player: PlayerId, item: Item) -> EngineResult<String>;

    fn get_player(&self, player: PlayerId, id: &str) -> EngineResult<Option<Item>>;

    fn list_player(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Item>>;

    fn delete_items(&self, ids: Vec<String>) -> EngineResult<()>;

    fn delete_shared(&self, ids: Vec<String>) -> EngineResult<()>;

    fn delete_player(&self, player: PlayerId, ids: Vec<String>) -> EngineResult<()>;
}

impl EngineStore for Engine {
    fn get_item(&self, id: &str) -> EngineResult<Option<Item>> {
        self.read_plugin::<ObjectStore, _, _>(|s| s.get(id).cloned())
    }

    fn set_shared(&self, item: Item) -> EngineResult<String> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| Ok(s.set_shared(session, item)))
    }

    fn get_shared(&self, id: &str) -> EngineResult<Option<Item>> {
        self.read_plugin::<ObjectStore, _, _>(|s| s.get_shared(id).cloned())
    }

    fn list_shared(&self, filter: &Filter) -> EngineResult<Vec<Item>> {
        self.read_plugin::<ObjectStore, _, _>(|s| s.list_shared(filter).into_iter().cloned().collect())
    }

    fn set_player(&self, player: PlayerId, item: Item) -> EngineResult<String> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| Ok(s.set_player(session, player, item)))
    }

    fn get_player(&self, player: PlayerId, id: &str) -> EngineResult<Option<Item>> {
        self.read_plugin::<ObjectStore, _, _>(|s| s.get_player(player, id).cloned())
    }

    fn list_player(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Item>> {
        self.read_plugin::<ObjectStore, _, _>(|s| s.list_player(player, filter).into_iter().cloned().collect())
    }

    fn delete_items(&self, ids: Vec<String>) -> EngineResult<()> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| {
            s.delete(session, ids);
            Ok(())
        })
    }

    fn delete_shared(&self, ids: Vec<String>) -> EngineResult<()> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| {
            s.delete_shared(session, ids);
            Ok(())
        })
    }

    fn delete_player(&self, player: PlayerId, ids: Vec<String>) -> EngineResult<()> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| {
            s.delete_player(session, player, ids);
            Ok(())
        })
    }
}

/// Store operations from inside another plugin's handler.
pub trait SessionStore {
    fn set_shared(&mut self, item: Item) -> EngineResult<String>;

    fn set_player(&mut self, player: PlayerId, item: Item) -> EngineResult<String>;

    fn delete_items(&mut self, ids: Vec<String>) -> EngineResult<()>;

    fn get_item(&self, id: &str) -> EngineResult<Option<Item>>;
}

impl SessionStore for Session<'_> {
    fn set_shared(&mut self, item: Item) -> EngineResult<String> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| Ok(s.set_shared(session, item)))
    }

    fn set_player(&mut self, player: PlayerId, item: Item) -> EngineResult<String> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| Ok(s.set_player(session, player, item)))
    }

    fn delete_items(&mut self, ids: Vec<String>) -> EngineResult<()> {
        self.with_plugin::<ObjectStore, _, _>(|s, session| {
            s.delete(session, ids);
            Ok(())
        })
    }

    fn get_item(&self, id: &str) -> EngineResult<Option<Item>> {
        Ok(self.plugin::<ObjectStore>()?.get(id).cloned())
    }
}

/// Turn queries and control on an engine with a registered [`Turns`].
pub trait EngineTurns {
    /// Starts the next player's turn.
    fn next_turn(&self) -> EngineResult<()>;

    fn turn_player(&self) -> EngineResult<Option<PlayerId>>;

    fn turn_number(&self) -> EngineResult<i64>;

    fn turn_round(&self) -> EngineResult<Round>;
}

impl EngineTurns for Engine {
    fn next_turn(&self) -> EngineResult<()> {
        self.with_plugin::<Turns, _, _>(|t, session| Ok(t.advance(session.players().len())?))
    }

    fn turn_player(&self) -> EngineResult<Option<PlayerId>> {
        self.read_plugin::<Turns, _, _>(Turns::player)
    }

    fn turn_number(&self) -> EngineResult<i64> {
        self.read_plugin::<Turns, _, _>(Turns::number)
    }

    fn turn_round(&self) -> EngineResult<Round> {
        self.read_plugin::<Turns, _, _>(Turns::round)
    }
}

/// Turn control from inside another plugin's handler.
pub trait SessionTurns {
    fn next_turn(&mut self) -> EngineResult<()>;

    fn turn_player(&self) -> EngineResult<Option<PlayerId>>;
}

impl SessionTurns for Session<'_> {
    fn next_turn(&mut self) -> EngineResult<()> {
        self.with_plugin::<Turns, _, _>(|t, session| Ok(t.advance(session.players().len())?))
    }

    fn turn_player(&self) -> EngineResult<Option<PlayerId>> {
        Ok(self.plugin::<Turns>()?.player())
    }
}
