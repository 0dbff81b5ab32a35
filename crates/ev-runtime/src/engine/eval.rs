use std::cell::RefMut;
use std::sync::OnceLock;

use ev_core::{
    ChangeVariableParams, Comparison, ConditionParams, Value, ValueSource, VariableKind,
    VariableOperation, VariableRef,
};
use regex::Regex;

use super::rng::next_random_in_range;
use super::Interpreter;
use crate::variables::VariableStore;

fn template_regex() -> &'static Regex {
    static TEMPLATE: OnceLock<Regex> = OnceLock::new();
    TEMPLATE.get_or_init(|| Regex::new(r"\$\{([^{}]+)\}").expect("template regex must compile"))
}

fn coerce(value: Value, kind: VariableKind) -> Value {
    match kind {
        VariableKind::Number => Value::Number(value.to_number()),
        VariableKind::String => Value::String(value.to_text()),
        VariableKind::Boolean => Value::Bool(value.to_bool()),
        VariableKind::List => match value {
            Value::List(_) => value,
            other => Value::List(vec![other]),
        },
    }
}

fn compare<T: PartialOrd + ?Sized>(left: &T, right: &T, comparison: Comparison) -> bool {
    match comparison {
        Comparison::Equal => left == right,
        Comparison::NotEqual => left != right,
        Comparison::Greater => left > right,
        Comparison::GreaterOrEqual => left >= right,
        Comparison::Less => left < right,
        Comparison::LessOrEqual => left <= right,
    }
}

impl Interpreter {
    /// The variable store with locals bound to this interpreter's context.
    pub fn variables(&self) -> RefMut<'_, dyn VariableStore + 'static> {
        let mut store = self.env.variables().borrow_mut();
        store.setup_temp_variables(&self.context);
        store
    }

    pub fn variable_value(&self, variable: VariableRef, kind: VariableKind) -> Value {
        let store = self.variables();
        match kind {
            VariableKind::Number => Value::Number(store.number(variable)),
            VariableKind::String => Value::String(store.string(variable)),
            VariableKind::Boolean => Value::Bool(store.boolean(variable)),
            VariableKind::List => Value::List(store.list(variable)),
        }
    }

    /// Writes `value` into the bank matching its own kind.
    pub fn set_variable_value(&mut self, variable: VariableRef, value: Value) {
        let mut store = self.variables();
        match value {
            Value::Number(value) => store.set_number(variable, value),
            Value::String(value) => store.set_string(variable, value),
            Value::Bool(value) => store.set_boolean(variable, value),
            Value::List(value) => store.set_list(variable, value),
        }
    }

    pub fn value_of(&mut self, source: &ValueSource, kind: VariableKind) -> Value {
        let raw = match source {
            ValueSource::Constant { value } => value.clone(),
            ValueSource::Variable { variable } => return self.variable_value(*variable, kind),
            ValueSource::Parameter { index } => match self.parameters.get(*index) {
                Some(value) => value.clone(),
                None => {
                    log::debug!("parameter {} not passed to `{}`", index, self.context.id);
                    return coerce(Value::Number(0.0), kind);
                }
            },
            ValueSource::Random { min, max } => {
                let mut state = self.env.random_state();
                let drawn = next_random_in_range(&mut state, *min, *max);
                self.env.set_random_state(state);
                Value::Number(drawn as f64)
            }
            ValueSource::Script { source } => match self.evaluate_script(source) {
                Ok(value) => value,
                Err(message) => {
                    log::warn!("script source failed in `{}`: {}", self.context.id, message);
                    return match kind {
                        VariableKind::String => Value::String(format!("ERR: {message}")),
                        other => coerce(Value::Number(0.0), other),
                    };
                }
            },
        };
        coerce(raw, kind)
    }

    pub fn number_value_of(&mut self, source: &ValueSource) -> f64 {
        self.value_of(source, VariableKind::Number).to_number()
    }

    pub fn string_value_of(&mut self, source: &ValueSource) -> String {
        self.value_of(source, VariableKind::String).to_text()
    }

    pub fn boolean_value_of(&mut self, source: &ValueSource) -> bool {
        self.value_of(source, VariableKind::Boolean).to_bool()
    }

    pub fn list_value_of(&mut self, source: &ValueSource) -> Vec<Value> {
        match self.value_of(source, VariableKind::List) {
            Value::List(values) => values,
            other => vec![other],
        }
    }

    pub fn check_condition(&mut self, params: &ConditionParams) -> bool {
        let left = self.value_of(&params.left, params.kind);
        let right = self.value_of(&params.right, params.kind);
        match (left, right) {
            (Value::Number(left), Value::Number(right)) => {
                compare(&left, &right, params.comparison)
            }
            (Value::String(left), Value::String(right)) => {
                compare(left.as_str(), right.as_str(), params.comparison)
            }
            (Value::Bool(left), Value::Bool(right)) => compare(&left, &right, params.comparison),
            (Value::List(left), Value::List(right)) => match params.comparison {
                Comparison::Equal => left == right,
                Comparison::NotEqual => left != right,
                other => compare(&left.len(), &right.len(), other),
            },
            _ => false,
        }
    }

    pub fn change_variable(&mut self, params: &ChangeVariableParams) {
        let operand = self.value_of(&params.source, params.kind);
        let current = self.variable_value(params.target, params.kind);
        let next = match (current, operand, params.operation) {
            (_, operand, VariableOperation::Set) => operand,
            (Value::Number(current), Value::Number(operand), operation) => {
                Value::Number(match operation {
                    VariableOperation::Add => current + operand,
                    VariableOperation::Sub => current - operand,
                    VariableOperation::Mul => current * operand,
                    VariableOperation::Div if operand != 0.0 => current / operand,
                    VariableOperation::Mod if operand != 0.0 => current % operand,
                    _ => current,
                })
            }
            (Value::String(current), Value::String(operand), VariableOperation::Add) => {
                Value::String(current + operand.as_str())
            }
            (Value::List(mut current), Value::List(operand), VariableOperation::Add) => {
                current.extend(operand);
                Value::List(current)
            }
            (current, _, operation) => {
                log::debug!(
                    "operation {:?} does not apply to {} variables",
                    operation,
                    current.type_name()
                );
                current
            }
        };
        self.set_variable_value(params.target, next);
    }

    /// Replaces each `${expr}` with its evaluated text; failures render as
    /// `ERR: <message>`.
    pub fn render_text(&self, template: &str) -> String {
        let mut output = String::with_capacity(template.len());
        let mut last_index = 0usize;
        for captures in template_regex().captures_iter(template) {
            let (Some(full), Some(expr)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last_index..full.start()]);
            match self.evaluate_script(expr.as_str()) {
                Ok(value) => output.push_str(&value.to_text()),
                Err(message) => output.push_str(&format!("ERR: {message}")),
            }
            last_index = full.end();
        }
        output.push_str(&template[last_index..]);
        output
    }

    pub fn run_script(&self, source: &str) {
        self.bind_context();
        if let Err(error) = self.env.scripts().run(source, &self.parameters) {
            log::warn!("script command failed in `{}`: {}", self.context.id, error);
        }
    }

    fn evaluate_script(&self, source: &str) -> Result<Value, String> {
        self.bind_context();
        self.env
            .scripts()
            .evaluate(source, &self.parameters)
            .map_err(|error| error.to_string())
    }
}

#[cfg(test)]
mod eval_tests {
    use ev_core::{
        ChangeVariableParams, Comparison, ConditionParams, Value, ValueSource, VariableKind,
        VariableOperation, VariableRef,
    };

    use super::super::runtime_test_support::*;

    fn change(
        kind: VariableKind,
        operation: VariableOperation,
        source: ValueSource,
    ) -> ChangeVariableParams {
        ChangeVariableParams {
            kind,
            target: VariableRef::local(0),
            operation,
            source,
        }
    }

    #[test]
    fn number_operations_apply_and_division_by_zero_is_ignored() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        let number = VariableKind::Number;
        interpreter.change_variable(&change(number, VariableOperation::Set, ValueSource::number(7.0)));
        interpreter.change_variable(&change(number, VariableOperation::Mul, ValueSource::number(3.0)));
        interpreter.change_variable(&change(number, VariableOperation::Mod, ValueSource::number(5.0)));
        assert_eq!(
            interpreter.variable_value(VariableRef::local(0), number),
            Value::Number(1.0)
        );
        interpreter.change_variable(&change(number, VariableOperation::Div, ValueSource::number(0.0)));
        assert_eq!(
            interpreter.variable_value(VariableRef::local(0), number),
            Value::Number(1.0)
        );
    }

    #[test]
    fn string_add_concatenates() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        let string = VariableKind::String;
        interpreter.change_variable(&change(string, VariableOperation::Set, ValueSource::text("a")));
        interpreter.change_variable(&change(string, VariableOperation::Add, ValueSource::text("b")));
        interpreter.change_variable(&change(string, VariableOperation::Sub, ValueSource::text("b")));
        assert_eq!(
            interpreter.variable_value(VariableRef::local(0), string),
            Value::String("ab".to_string())
        );
    }

    #[test]
    fn failing_script_source_yields_err_text() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        let text = interpreter.string_value_of(&ValueSource::Script {
            source: "undefined_name".to_string(),
        });
        assert!(text.starts_with("ERR: "), "unexpected text {text}");
        let number = interpreter.number_value_of(&ValueSource::Script {
            source: "undefined_name".to_string(),
        });
        assert_eq!(number, 0.0);
    }

    #[test]
    fn parameters_and_random_sources_resolve() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        interpreter.set_parameters(vec![Value::String("12".to_string())]);
        assert_eq!(
            interpreter.number_value_of(&ValueSource::Parameter { index: 0 }),
            12.0
        );
        assert_eq!(
            interpreter.number_value_of(&ValueSource::Parameter { index: 4 }),
            0.0
        );

        let before = h.env.random_state();
        let drawn = interpreter.number_value_of(&ValueSource::Random { min: 1, max: 6 });
        assert!((1.0..=6.0).contains(&drawn));
        assert_ne!(h.env.random_state(), before);
    }

    #[test]
    fn comparisons_follow_the_condition_kind() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        let strings = ConditionParams {
            kind: VariableKind::String,
            left: ValueSource::text("apple"),
            comparison: Comparison::Less,
            right: ValueSource::text("banana"),
        };
        assert!(interpreter.check_condition(&strings));

        let coerced = ConditionParams {
            kind: VariableKind::Number,
            left: ValueSource::text("10"),
            comparison: Comparison::GreaterOrEqual,
            right: ValueSource::number(10.0),
        };
        assert!(interpreter.check_condition(&coerced));

        let flags = ConditionParams {
            kind: VariableKind::Boolean,
            left: ValueSource::variable(VariableRef::global(3)),
            comparison: Comparison::Equal,
            right: ValueSource::Constant {
                value: Value::Bool(false),
            },
        };
        assert!(interpreter.check_condition(&flags));
    }

    #[test]
    fn render_text_interpolates_expressions() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(Vec::new());
        interpreter.set_parameters(vec![Value::Number(3.0)]);
        assert_eq!(
            interpreter.render_text("You have ${params[0] * 2} coins"),
            "You have 6 coins"
        );
        assert!(interpreter.render_text("${nope}").starts_with("ERR: "));
        assert_eq!(interpreter.render_text("plain"), "plain");
    }
}
