use std::fmt;
use std::str::FromStr;

/// Element types an array handle can carry.
///
/// Only the integer and IEEE float kinds take part in arithmetic. `Bool`,
/// `Utf8` and `Object` exist so that views of non-numeric host arrays can be
/// described (and rejected) without guessing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Utf8,
    Object,
}

impl DType {
    pub const NUMERIC: [DType; 10] = [
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    /// Size in bytes of one element, or None for kinds without a fixed
    /// in-memory width.
    #[inline(always)]
    pub const fn element_size(&self) -> Option<usize> {
        match self {
            DType::I8 | DType::U8 | DType::Bool => Some(1),
            DType::I16 | DType::U16 => Some(2),
            DType::I32 | DType::U32 | DType::F32 => Some(4),
            DType::I64 | DType::U64 | DType::F64 => Some(8),
            DType::Utf8 | DType::Object => None,
        }
    }

    #[inline(always)]
    pub const fn bits(&self) -> usize {
        match self.element_size() {
            Some(n) => n * 8,
            None => 0,
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    pub const fn is_signed_int(&self) -> bool {
        matches!(self, DType::I8 | DType::I16 | DType::I32 | DType::I64)
    }

    pub const fn is_unsigned_int(&self) -> bool {
        matches!(self, DType::U8 | DType::U16 | DType::U32 | DType::U64)
    }

    pub const fn is_integer(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Result type of combining `self` with `other` in arithmetic.
    ///
    /// Symmetric. Returns None when either side is non-numeric. The rules:
    /// - float + float picks the wider float
    /// - an int of at most 16 bits fits exactly in f32, anything wider goes to f64
    /// - ints of the same signedness pick the wider one
    /// - mixed signedness picks the signed side if strictly wider, otherwise
    ///   the next signed width up; `u64` has none and lands on f64
    pub const fn promote(self, other: DType) -> Option<DType> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }

        let out = match (self.is_float(), other.is_float()) {
            (true, true) => wider(self, other),
            (true, false) => float_with_int(self, other),
            (false, true) => float_with_int(other, self),
            (false, false) => match (self.is_signed_int(), other.is_signed_int()) {
                (true, true) | (false, false) => wider(self, other),
                (true, false) => signed_with_unsigned(self, other),
                (false, true) => signed_with_unsigned(other, self),
            },
        };

        Some(out)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Bool => "bool",
            DType::Utf8 => "utf8",
            DType::Object => "object",
        }
    }
}

const fn wider(a: DType, b: DType) -> DType {
    if a.bits() >= b.bits() { a } else { b }
}

const fn float_with_int(float: DType, int: DType) -> DType {
    match float {
        DType::F32 if int.bits() <= 16 => DType::F32,
        _ => DType::F64,
    }
}

const fn signed_with_unsigned(signed: DType, unsigned: DType) -> DType {
    if signed.bits() > unsigned.bits() {
        return signed;
    }
    match unsigned {
        DType::U8 => DType::I16,
        DType::U16 => DType::I32,
        DType::U32 => DType::I64,
        _ => DType::F64,
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dtype = match s.to_ascii_lowercase().as_str() {
            "i8" | "int8" => DType::I8,
            "i16" | "int16" => DType::I16,
            "i32" | "int32" => DType::I32,
            "i64" | "int64" | "int" => DType::I64,
            "u8" | "uint8" => DType::U8,
            "u16" | "uint16" => DType::U16,
            "u32" | "uint32" => DType::U32,
            "u64" | "uint64" => DType::U64,
            "f32" | "float32" => DType::F32,
            "f64" | "float64" | "float" => DType::F64,
            "bool" => DType::Bool,
            "utf8" | "str" | "text" => DType::Utf8,
            "object" => DType::Object,
            other => return Err(format!("unknown dtype '{}'", other)),
        };
        Ok(dtype)
    }
}
