use serde_json::Value;

use super::Reducer;

/// Numeric accumulation: current + incoming.
///
/// Integer operands stay integral; mixed or fractional operands fall back
/// to f64 arithmetic. A non-numeric operand on either side degrades to
/// overwrite so a malformed update cannot wedge the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SumNumbers;

impl Reducer for SumNumbers {
    fn apply(&self, current: Value, incoming: Value) -> Value {
        if let (Some(a), Some(b)) = (current.as_i64(), incoming.as_i64()) {
            return Value::from(a + b);
        }
        match (current.as_f64(), incoming.as_f64()) {
            (Some(a), Some(b)) => Value::from(a + b),
            _ => incoming,
        }
    }
}
