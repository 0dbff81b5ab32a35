use std::collections::BTreeMap;

use ev_core::{InterpreterContext, Value, VariableRef, VariableScope};
use serde::{Deserialize, Serialize};

/// Variable storage consumed by interpreters.
///
/// Local references resolve against the context installed by the most recent
/// `setup_temp_variables` call; interpreters make that call once per tick and
/// before any out-of-tick write.
pub trait VariableStore {
    fn setup_temp_variables(&mut self, context: &InterpreterContext);

    fn number(&self, variable: VariableRef) -> f64;
    fn set_number(&mut self, variable: VariableRef, value: f64);

    fn string(&self, variable: VariableRef) -> String;
    fn set_string(&mut self, variable: VariableRef, value: String);

    fn boolean(&self, variable: VariableRef) -> bool;
    fn set_boolean(&mut self, variable: VariableRef, value: bool);

    fn list(&self, variable: VariableRef) -> Vec<Value>;
    fn set_list(&mut self, variable: VariableRef, value: Vec<Value>);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBank {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub numbers: BTreeMap<usize, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub strings: BTreeMap<usize, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub booleans: BTreeMap<usize, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<usize, Vec<Value>>,
}

impl VariableBank {
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
            && self.strings.is_empty()
            && self.booleans.is_empty()
            && self.lists.is_empty()
    }
}

/// In-memory store with one local bank per context id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryVariableStore {
    #[serde(default)]
    pub locals: BTreeMap<String, VariableBank>,
    #[serde(default)]
    pub globals: VariableBank,
    #[serde(default)]
    pub persistent: VariableBank,
    #[serde(skip)]
    temp_context: String,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_context(&self) -> &str {
        &self.temp_context
    }

    pub fn local_bank(&self, context_id: &str) -> Option<&VariableBank> {
        self.locals.get(context_id)
    }

    fn bank(&self, scope: VariableScope) -> Option<&VariableBank> {
        match scope {
            VariableScope::Local => self.locals.get(&self.temp_context),
            VariableScope::Global => Some(&self.globals),
            VariableScope::Persistent => Some(&self.persistent),
        }
    }

    fn bank_mut(&mut self, scope: VariableScope) -> &mut VariableBank {
        match scope {
            VariableScope::Local => self.locals.entry(self.temp_context.clone()).or_default(),
            VariableScope::Global => &mut self.globals,
            VariableScope::Persistent => &mut self.persistent,
        }
    }
}

impl VariableStore for MemoryVariableStore {
    fn setup_temp_variables(&mut self, context: &InterpreterContext) {
        if self.temp_context != context.id {
            self.temp_context = context.id.clone();
        }
    }

    fn number(&self, variable: VariableRef) -> f64 {
        self.bank(variable.scope)
            .and_then(|bank| bank.numbers.get(&variable.index).copied())
            .unwrap_or(0.0)
    }

    fn set_number(&mut self, variable: VariableRef, value: f64) {
        self.bank_mut(variable.scope)
            .numbers
            .insert(variable.index, value);
    }

    fn string(&self, variable: VariableRef) -> String {
        self.bank(variable.scope)
            .and_then(|bank| bank.strings.get(&variable.index).cloned())
            .unwrap_or_default()
    }

    fn set_string(&mut self, variable: VariableRef, value: String) {
        self.bank_mut(variable.scope)
            .strings
            .insert(variable.index, value);
    }

    fn boolean(&self, variable: VariableRef) -> bool {
        self.bank(variable.scope)
            .and_then(|bank| bank.booleans.get(&variable.index).copied())
            .unwrap_or(false)
    }

    fn set_boolean(&mut self, variable: VariableRef, value: bool) {
        self.bank_mut(variable.scope)
            .booleans
            .insert(variable.index, value);
    }

    fn list(&self, variable: VariableRef) -> Vec<Value> {
        self.bank(variable.scope)
            .and_then(|bank| bank.lists.get(&variable.index).cloned())
            .unwrap_or_default()
    }

    fn set_list(&mut self, variable: VariableRef, value: Vec<Value>) {
        self.bank_mut(variable.scope)
            .lists
            .insert(variable.index, value);
    }
}

#[cfg(test)]
mod variables_tests {
    use super::*;

    #[test]
    fn locals_follow_the_temp_context() {
        let mut store = MemoryVariableStore::new();
        store.setup_temp_variables(&InterpreterContext::new("scene-a", None));
        store.set_number(VariableRef::local(0), 5.0);
        store.set_number(VariableRef::global(0), 9.0);

        store.setup_temp_variables(&InterpreterContext::new("scene-b", None));
        assert_eq!(store.number(VariableRef::local(0)), 0.0);
        assert_eq!(store.number(VariableRef::global(0)), 9.0);

        store.setup_temp_variables(&InterpreterContext::new("scene-a", None));
        assert_eq!(store.number(VariableRef::local(0)), 5.0);
        assert_eq!(store.temp_context(), "scene-a");
    }

    #[test]
    fn missing_entries_read_as_defaults() {
        let store = MemoryVariableStore::new();
        let persistent = VariableRef {
            scope: VariableScope::Persistent,
            index: 3,
        };
        assert_eq!(store.string(persistent), "");
        assert!(!store.boolean(persistent));
        assert!(store.list(persistent).is_empty());
    }

    #[test]
    fn store_serializes_banks_without_temp_context() {
        let mut store = MemoryVariableStore::new();
        store.setup_temp_variables(&InterpreterContext::new("main", None));
        store.set_string(VariableRef::local(1), "Ann".to_string());
        store.set_boolean(VariableRef::global(2), true);

        let json = serde_json::to_value(&store).expect("store should encode");
        assert_eq!(json["locals"]["main"]["strings"]["1"], "Ann");
        assert_eq!(json["globals"]["booleans"]["2"], true);
        assert!(json.get("tempContext").is_none());

        let decoded: MemoryVariableStore = serde_json::from_value(json).expect("decode");
        assert_eq!(
            decoded.local_bank("main").map(|bank| bank.strings.len()),
            Some(1)
        );
        assert!(decoded.persistent.is_empty());
    }
}
