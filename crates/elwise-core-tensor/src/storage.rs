use crate::dtype::DType;
use elwise_core_kernel::cpu_add::AddElement;

/// Owned, contiguous element buffer. One variant per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// One byte per element, 0 or 1.
    Bool(Vec<u8>),
    Utf8(Vec<String>),
}

macro_rules! for_each_pod {
    ($storage:expr, $v:ident => $body:expr, $text:ident => $text_body:expr) => {
        match $storage {
            Storage::I8($v) => $body,
            Storage::I16($v) => $body,
            Storage::I32($v) => $body,
            Storage::I64($v) => $body,
            Storage::U8($v) => $body,
            Storage::U16($v) => $body,
            Storage::U32($v) => $body,
            Storage::U64($v) => $body,
            Storage::F32($v) => $body,
            Storage::F64($v) => $body,
            Storage::Bool($v) => $body,
            Storage::Utf8($text) => $text_body,
        }
    };
}

impl Storage {
    pub fn dtype(&self) -> DType {
        match self {
            Storage::I8(_) => DType::I8,
            Storage::I16(_) => DType::I16,
            Storage::I32(_) => DType::I32,
            Storage::I64(_) => DType::I64,
            Storage::U8(_) => DType::U8,
            Storage::U16(_) => DType::U16,
            Storage::U32(_) => DType::U32,
            Storage::U64(_) => DType::U64,
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
            Storage::Bool(_) => DType::Bool,
            Storage::Utf8(_) => DType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        for_each_pod!(self, v => v.len(), s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw element bytes in native order. Text carries no fixed-width bytes
    /// and yields an empty slice.
    pub fn as_bytes(&self) -> &[u8] {
        for_each_pod!(self, v => bytemuck::cast_slice(v), _s => &[])
    }
}

/// Fixed-width numeric element types that can live in a [`Storage`] and be
/// produced by the add kernel.
pub trait Element: bytemuck::Pod + AddElement {
    const DTYPE: DType;

    fn into_storage(data: Vec<Self>) -> Storage;

    fn slice_of(storage: &Storage) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$variant;

                #[inline(always)]
                fn into_storage(data: Vec<Self>) -> Storage {
                    Storage::$variant(data)
                }

                #[inline(always)]
                fn slice_of(storage: &Storage) -> Option<&[Self]> {
                    match storage {
                        Storage::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);
