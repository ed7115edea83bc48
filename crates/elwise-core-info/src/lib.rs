use elwise_core_tensor::{Storage, Tensor};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

/// Machine-readable form of a tensor, as written by `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct TensorReport {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: Value,
}

pub fn render_shape(shape: &[usize]) -> String {
    match shape {
        [d] => format!("({},)", d),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}

pub fn render_summary(t: &Tensor) -> String {
    format!(
        "shape={} dtype={} elements={}",
        render_shape(t.shape()),
        t.dtype(),
        t.num_elements()
    )
}

/// Nested, bracketed rendering in row-major order.
pub fn render_tensor(t: &Tensor) -> String {
    let flat = element_strings(t.storage());
    nest_text(&flat, t.shape(), 0)
}

pub fn tensor_report(t: &Tensor) -> TensorReport {
    let flat = element_values(t.storage());
    TensorReport {
        dtype: t.dtype().to_string(),
        shape: t.shape().to_vec(),
        data: nest_json(&flat, t.shape()),
    }
}

pub fn tensor_to_json(t: &Tensor) -> Value {
    debug!("tensor_to_json: {}", render_summary(t));
    let report = tensor_report(t);

    let mut map = Map::new();
    map.insert("dtype".to_string(), Value::String(report.dtype));
    map.insert("shape".to_string(), Value::from(report.shape));
    map.insert("data".to_string(), report.data);
    Value::Object(map)
}

macro_rules! map_storage {
    ($storage:expr, $x:ident => $int:expr, $f:ident => $float:expr, $b:ident => $bool:expr, $s:ident => $text:expr) => {
        match $storage {
            Storage::I8(v) => v.iter().map(|&$x| $int).collect(),
            Storage::I16(v) => v.iter().map(|&$x| $int).collect(),
            Storage::I32(v) => v.iter().map(|&$x| $int).collect(),
            Storage::I64(v) => v.iter().map(|&$x| $int).collect(),
            Storage::U8(v) => v.iter().map(|&$x| $int).collect(),
            Storage::U16(v) => v.iter().map(|&$x| $int).collect(),
            Storage::U32(v) => v.iter().map(|&$x| $int).collect(),
            Storage::U64(v) => v.iter().map(|&$x| $int).collect(),
            Storage::F32(v) => v.iter().map(|&$f| $float).collect(),
            Storage::F64(v) => v.iter().map(|&$f| $float).collect(),
            Storage::Bool(v) => v.iter().map(|&$b| $bool).collect(),
            Storage::Utf8(v) => v.iter().map(|$s| $text).collect(),
        }
    };
}

fn element_strings(storage: &Storage) -> Vec<String> {
    map_storage!(storage,
        x => x.to_string(),
        f => format!("{:?}", f),
        b => (b != 0).to_string(),
        s => format!("{:?}", s)
    )
}

fn element_values(storage: &Storage) -> Vec<Value> {
    map_storage!(storage,
        x => Value::from(x),
        f => Value::from(f),
        b => Value::Bool(b != 0),
        s => Value::String(s.clone())
    )
}

fn nest_text(flat: &[String], shape: &[usize], depth: usize) -> String {
    let Some((&dim, rest)) = shape.split_first() else {
        return flat.first().cloned().unwrap_or_default();
    };

    let inner: usize = rest.iter().product();
    let sep = if rest.is_empty() {
        ", ".to_string()
    } else {
        format!(",\n{}", " ".repeat(depth + 1))
    };

    let parts: Vec<String> = (0..dim)
        .map(|i| nest_text(&flat[i * inner..(i + 1) * inner], rest, depth + 1))
        .collect();

    format!("[{}]", parts.join(&sep))
}

fn nest_json(flat: &[Value], shape: &[usize]) -> Value {
    let Some((&dim, rest)) = shape.split_first() else {
        return flat.first().cloned().unwrap_or(Value::Null);
    };

    let inner: usize = rest.iter().product();
    Value::Array(
        (0..dim)
            .map(|i| nest_json(&flat[i * inner..(i + 1) * inner], rest))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_shape() {
        assert_eq!(render_shape(&[3]), "(3,)");
        assert_eq!(render_shape(&[2, 2]), "(2, 2)");
        assert_eq!(render_shape(&[]), "()");
    }

    #[test]
    fn test_render_summary() {
        let t = Tensor::from_vec(vec![1i64, 2, 3, 4], &[2, 2]).unwrap();
        assert_eq!(render_summary(&t), "shape=(2, 2) dtype=i64 elements=4");
    }

    #[test]
    fn test_render_tensor_nested() {
        let t = Tensor::from_vec(vec![6i32, 8, 10, 12], &[2, 2]).unwrap();
        assert_eq!(render_tensor(&t), "[[6, 8],\n [10, 12]]");

        let t = Tensor::from_vec(vec![2.5f64, 4.5], &[2]).unwrap();
        assert_eq!(render_tensor(&t), "[2.5, 4.5]");
    }

    #[test]
    fn test_render_empty() {
        let t = Tensor::from_vec(Vec::<f32>::new(), &[0]).unwrap();
        assert_eq!(render_tensor(&t), "[]");
    }

    #[test]
    fn test_tensor_to_json() {
        let t = Tensor::from_vec(vec![11u16, 22, 33, 44, 55, 66], &[2, 3]).unwrap();
        assert_eq!(
            tensor_to_json(&t),
            json!({"dtype": "u16", "shape": [2, 3], "data": [[11, 22, 33], [44, 55, 66]]})
        );
    }

    #[test]
    fn test_tensor_to_json_matches_report() {
        let t = Tensor::from_vec(vec![1.5f32, -2.0], &[1, 2]).unwrap();
        let via_serde = serde_json::to_value(tensor_report(&t)).unwrap();
        assert_eq!(tensor_to_json(&t), via_serde);
    }

    #[test]
    fn test_json_nan_becomes_null() {
        let t = Tensor::from_vec(vec![f64::NAN, 1.0], &[2]).unwrap();
        assert_eq!(tensor_to_json(&t)["data"], json!([null, 1.0]));
    }
}
