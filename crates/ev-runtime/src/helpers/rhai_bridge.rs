use ev_core::Value;
use rhai::{Array, Dynamic, ImmutableString, FLOAT, INT};

use crate::script::ScriptError;

pub(crate) fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Bool(value) => Dynamic::from_bool(*value),
        Value::Number(value) => Dynamic::from_float(*value as FLOAT),
        Value::String(value) => Dynamic::from(value.clone()),
        Value::List(values) => {
            Dynamic::from_array(values.iter().map(value_to_dynamic).collect::<Array>())
        }
    }
}

pub(crate) fn dynamic_to_value(value: Dynamic) -> Result<Value, ScriptError> {
    if value.is::<bool>() {
        return Ok(Value::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(Value::Number(value.cast::<INT>() as f64));
    }
    if value.is::<FLOAT>() {
        return Ok(Value::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(Value::String(value.cast::<ImmutableString>().to_string()));
    }
    if value.is::<char>() {
        return Ok(Value::String(value.cast::<char>().to_string()));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_value(item)?);
        }
        return Ok(Value::List(out));
    }

    Err(ScriptError::Unsupported(value.type_name().to_string()))
}

#[cfg(test)]
mod rhai_bridge_tests {
    use super::*;

    #[test]
    fn nested_arrays_convert_recursively() {
        let inner = Array::from([Dynamic::from_bool(true), Dynamic::from(2 as INT)]);
        let value = dynamic_to_value(Dynamic::from_array(Array::from([Dynamic::from_array(
            inner,
        )])))
        .expect("array should convert");
        assert_eq!(
            value,
            Value::List(vec![Value::List(vec![
                Value::Bool(true),
                Value::Number(2.0)
            ])])
        );
    }

    #[test]
    fn unit_is_rejected() {
        assert!(matches!(
            dynamic_to_value(Dynamic::UNIT),
            Err(ScriptError::Unsupported(_))
        ));
    }

    #[test]
    fn values_survive_the_bridge() {
        let value = Value::List(vec![Value::String("a".to_string()), Value::Number(1.5)]);
        assert_eq!(
            dynamic_to_value(value_to_dynamic(&value)).expect("bridge"),
            value
        );
    }
}
