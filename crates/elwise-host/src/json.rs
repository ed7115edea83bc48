use crate::value::HostValue;
use elwise_core_tensor::{DType, Element, Result, Tensor, TensorError};
use num_traits::NumCast;
use serde_json::{Map, Value};

/// Decodes a JSON document into a host value.
///
/// Plain JSON arrays become host sequences and go through the usual
/// coercion at call time. An object of the form
/// `{"dtype": "i32", "shape": [2, 2], "data": [...]}` becomes a typed array
/// handle; `data` may be flat or nested.
pub fn from_json(value: &Value) -> Result<HostValue> {
    let host = match value {
        Value::Null => HostValue::None,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) if n.is_i64() => HostValue::Int(i),
            (_, Some(f)) if n.is_f64() => HostValue::Float(f),
            _ => {
                return Err(TensorError::conversion(format!(
                    "integer {} does not fit i64; use a typed u64 array",
                    n
                )));
            }
        },
        Value::String(s) => HostValue::Str(s.clone()),
        Value::Array(items) => {
            HostValue::List(items.iter().map(from_json).collect::<Result<Vec<_>>>()?)
        }
        Value::Object(map) => HostValue::array(typed_array(map)?),
    };
    Ok(host)
}

fn typed_array(map: &Map<String, Value>) -> Result<Tensor> {
    let dtype: DType = field(map, "dtype")?
        .as_str()
        .ok_or_else(|| TensorError::conversion("'dtype' must be a string"))?
        .parse()
        .map_err(TensorError::ConversionFailure)?;

    let shape = field(map, "shape")?
        .as_array()
        .ok_or_else(|| TensorError::conversion("'shape' must be an array"))?
        .iter()
        .map(|d| {
            d.as_u64()
                .and_then(|d| usize::try_from(d).ok())
                .ok_or_else(|| TensorError::conversion(format!("invalid dimension {}", d)))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut leaves = Vec::new();
    flatten_json(field(map, "data")?, &mut leaves);

    match dtype {
        DType::I8 => numeric::<i8>(&leaves, &shape),
        DType::I16 => numeric::<i16>(&leaves, &shape),
        DType::I32 => numeric::<i32>(&leaves, &shape),
        DType::I64 => numeric::<i64>(&leaves, &shape),
        DType::U8 => numeric::<u8>(&leaves, &shape),
        DType::U16 => numeric::<u16>(&leaves, &shape),
        DType::U32 => numeric::<u32>(&leaves, &shape),
        DType::U64 => numeric::<u64>(&leaves, &shape),
        DType::F32 => numeric::<f32>(&leaves, &shape),
        DType::F64 => numeric::<f64>(&leaves, &shape),
        DType::Bool => {
            let data = leaves
                .iter()
                .map(|v| v.as_bool().ok_or_else(|| bad_leaf(v, dtype)))
                .collect::<Result<Vec<_>>>()?;
            Tensor::from_bools(data, &shape)
        }
        DType::Utf8 => {
            let data = leaves
                .iter()
                .map(|v| v.as_str().map(str::to_owned).ok_or_else(|| bad_leaf(v, dtype)))
                .collect::<Result<Vec<_>>>()?;
            Tensor::from_strings(data, &shape)
        }
        DType::Object => Err(TensorError::conversion(
            "object arrays cannot be decoded from JSON",
        )),
    }
}

fn field<'m>(map: &'m Map<String, Value>, key: &str) -> Result<&'m Value> {
    map.get(key)
        .ok_or_else(|| TensorError::conversion(format!("typed array is missing '{}'", key)))
}

fn flatten_json<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_json(item, out)),
        leaf => out.push(leaf),
    }
}

fn numeric<T: Element + NumCast>(leaves: &[&Value], shape: &[usize]) -> Result<Tensor> {
    let data = leaves
        .iter()
        .map(|v| {
            let cast = if let Some(i) = v.as_i64() {
                T::from(i)
            } else if let Some(u) = v.as_u64() {
                T::from(u)
            } else if T::DTYPE.is_float() {
                v.as_f64().and_then(T::from)
            } else {
                None
            };
            cast.ok_or_else(|| bad_leaf(v, T::DTYPE))
        })
        .collect::<Result<Vec<T>>>()?;

    Tensor::from_vec(data, shape)
}

fn bad_leaf(value: &Value, dtype: DType) -> TensorError {
    TensorError::conversion(format!("{} is not a valid {} element", value, dtype))
}
