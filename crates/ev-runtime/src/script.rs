use std::cell::RefCell;
use std::rc::Rc;

use ev_core::{Value, VariableRef, VariableScope};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Position, Scope, FLOAT, INT};
use thiserror::Error;

use crate::helpers::rhai_bridge::{dynamic_to_value, value_to_dynamic};
use crate::variables::VariableStore;

pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("{0}")]
    Eval(String),
    #[error("unsupported script value type `{0}`")]
    Unsupported(String),
}

/// Evaluates the dynamic script sources found in authored commands.
///
/// `parameters` are the arguments of the calling common event, visible to
/// scripts as the `params` array. Callers must not hold a borrow of the
/// variable store across a call.
pub trait ScriptEvaluator {
    fn run(&self, source: &str, parameters: &[Value]) -> Result<(), ScriptError>;
    fn evaluate(&self, source: &str, parameters: &[Value]) -> Result<Value, ScriptError>;
}

pub struct RhaiScriptEvaluator {
    engine: Engine,
}

impl RhaiScriptEvaluator {
    pub fn new() -> Self {
        Self::with_max_operations(DEFAULT_MAX_OPERATIONS)
    }

    pub fn with_max_operations(max_operations: u64) -> Self {
        let mut engine = Engine::new();
        engine.set_strict_variables(true);
        engine.set_max_operations(max_operations);
        Self { engine }
    }

    /// Adds `get_*`/`set_*` functions over `variables`, e.g.
    /// `set_number("global", 0, get_number("local", 2) + 1)`.
    pub fn with_variables(variables: Rc<RefCell<dyn VariableStore>>) -> Self {
        let mut evaluator = Self::new();
        register_variable_functions(&mut evaluator.engine, variables);
        evaluator
    }

    fn scope_for(parameters: &[Value]) -> Scope<'static> {
        let mut scope = Scope::new();
        let params = parameters.iter().map(value_to_dynamic).collect::<Array>();
        scope.push_dynamic("params", Dynamic::from_array(params));
        scope
    }
}

fn script_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

fn variable_ref(scope: &str, index: INT) -> Result<VariableRef, Box<EvalAltResult>> {
    let scope = match scope {
        "local" => VariableScope::Local,
        "global" => VariableScope::Global,
        "persistent" => VariableScope::Persistent,
        other => return Err(script_error(format!("unknown variable scope \"{other}\""))),
    };
    let index = usize::try_from(index)
        .map_err(|_| script_error(format!("variable index {index} is negative")))?;
    Ok(VariableRef { scope, index })
}

fn register_variable_functions(engine: &mut Engine, variables: Rc<RefCell<dyn VariableStore>>) {
    let store = Rc::clone(&variables);
    engine.register_fn(
        "get_number",
        move |scope: &str, index: INT| -> Result<FLOAT, Box<EvalAltResult>> {
            Ok(store.borrow().number(variable_ref(scope, index)?))
        },
    );
    let store = Rc::clone(&variables);
    engine.register_fn(
        "set_number",
        move |scope: &str, index: INT, value: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let number = value
                .as_float()
                .or_else(|_| value.as_int().map(|value| value as FLOAT))
                .map_err(|type_name| script_error(format!("expected number, got {type_name}")))?;
            store
                .borrow_mut()
                .set_number(variable_ref(scope, index)?, number);
            Ok(())
        },
    );
    let store = Rc::clone(&variables);
    engine.register_fn(
        "get_string",
        move |scope: &str, index: INT| -> Result<String, Box<EvalAltResult>> {
            Ok(store.borrow().string(variable_ref(scope, index)?))
        },
    );
    let store = Rc::clone(&variables);
    engine.register_fn(
        "set_string",
        move |scope: &str, index: INT, value: &str| -> Result<(), Box<EvalAltResult>> {
            store
                .borrow_mut()
                .set_string(variable_ref(scope, index)?, value.to_string());
            Ok(())
        },
    );
    let store = Rc::clone(&variables);
    engine.register_fn(
        "get_bool",
        move |scope: &str, index: INT| -> Result<bool, Box<EvalAltResult>> {
            Ok(store.borrow().boolean(variable_ref(scope, index)?))
        },
    );
    engine.register_fn(
        "set_bool",
        move |scope: &str, index: INT, value: bool| -> Result<(), Box<EvalAltResult>> {
            variables
                .borrow_mut()
                .set_boolean(variable_ref(scope, index)?, value);
            Ok(())
        },
    );
}

impl Default for RhaiScriptEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RhaiScriptEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiScriptEvaluator").finish_non_exhaustive()
    }
}

impl ScriptEvaluator for RhaiScriptEvaluator {
    fn run(&self, source: &str, parameters: &[Value]) -> Result<(), ScriptError> {
        let mut scope = Self::scope_for(parameters);
        self.engine
            .run_with_scope(&mut scope, source)
            .map_err(|error| ScriptError::Eval(error.to_string()))
    }

    fn evaluate(&self, source: &str, parameters: &[Value]) -> Result<Value, ScriptError> {
        let mut scope = Self::scope_for(parameters);
        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, source)
            .map_err(|error| ScriptError::Eval(error.to_string()))
            .and_then(dynamic_to_value)
    }
}
