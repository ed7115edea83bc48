pub mod dtype;
pub mod error;
pub mod storage;

use elwise_core_kernel::cpu_add::{AddElement, OverflowAt, add_arr};
use log::{debug, trace};
use num_traits::AsPrimitive;
use smallvec::SmallVec;
use std::borrow::Cow;

pub use dtype::DType;
pub use elwise_core_kernel::cpu_add::OverflowPolicy;
pub use error::{ErrorKind, TensorError};
pub use storage::{Element, Storage};

pub type Result<T> = std::result::Result<T, TensorError>;

pub type ShapeBuf = SmallVec<[usize; 6]>;

// Expands `$body` once per numeric element type with `$t` aliased to it.
// Non-numeric kinds fall through to UnsupportedType.
macro_rules! match_numeric {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            DType::I8 => {
                type $t = i8;
                $body
            }
            DType::I16 => {
                type $t = i16;
                $body
            }
            DType::I32 => {
                type $t = i32;
                $body
            }
            DType::I64 => {
                type $t = i64;
                $body
            }
            DType::U8 => {
                type $t = u8;
                $body
            }
            DType::U16 => {
                type $t = u16;
                $body
            }
            DType::U32 => {
                type $t = u32;
                $body
            }
            DType::U64 => {
                type $t = u64;
                $body
            }
            DType::F32 => {
                type $t = f32;
                $body
            }
            DType::F64 => {
                type $t = f64;
                $body
            }
            other @ (DType::Bool | DType::Utf8 | DType::Object) => {
                Err(TensorError::UnsupportedType(other))
            }
        }
    };
}

/// Borrowed, read-only view over contiguous array memory.
///
/// The bytes belong to someone else (a host array, a [`Tensor`], a mmap).
/// Views of non-numeric kinds carry no element bytes; they only describe
/// shape and kind so callers can reject them.
#[derive(Debug, Clone)]
pub struct TensorView<'a> {
    pub data: &'a [u8],        // Element bytes, native order, row-major
    pub shape: Cow<'a, [usize]>, // Dimensions, outermost first
    pub dtype: DType,          // How to interpret bytes
}

impl<'a> TensorView<'a> {
    pub fn new(data: &'a [u8], shape: impl Into<Cow<'a, [usize]>>, dtype: DType) -> Self {
        Self {
            data,
            shape: shape.into(),
            dtype,
        }
    }

    /// View that describes an array without exposing element bytes.
    pub fn opaque(shape: impl Into<Cow<'a, [usize]>>, dtype: DType) -> Self {
        Self::new(&[], shape, dtype)
    }

    #[inline(always)]
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline(always)]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline(always)]
    pub fn element_size(&self) -> Option<usize> {
        self.dtype.element_size()
    }

    pub fn expected_byte_len(&self) -> Option<usize> {
        let size = self.element_size()?;
        self.shape
            .iter()
            .try_fold(size, |acc, &d| acc.checked_mul(d))
    }

    /// Checks that numeric bytes can be read as `shape` elements of `dtype`
    /// (length and alignment). Non-numeric views carry no readable
    /// elements and pass.
    pub fn validate(&self) -> Result<()> {
        if !self.dtype.is_numeric() {
            return Ok(());
        }
        match_numeric!(self.dtype, T => self.as_slice::<T>().map(|_| ()))
    }

    /// Typed slice - zero-copy, dtype/length/alignment checked
    pub fn as_slice<T: Element>(&self) -> Result<&'a [T]> {
        if self.dtype != T::DTYPE {
            return Err(TensorError::conversion(format!(
                "view holds {}, requested {}",
                self.dtype,
                T::DTYPE
            )));
        }

        let expected_len = self
            .expected_byte_len()
            .ok_or_else(|| TensorError::conversion("view byte length overflows usize"))?;
        if self.data.len() != expected_len {
            return Err(TensorError::conversion(format!(
                "view data length mismatch: got {}, expected {}",
                self.data.len(),
                expected_len
            )));
        }

        if expected_len == 0 {
            return Ok(&[]);
        }

        if self.data.as_ptr().align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(TensorError::conversion(format!(
                "view data is not aligned for {}",
                T::DTYPE
            )));
        }

        bytemuck::try_cast_slice(self.data)
            .map_err(|e| TensorError::conversion(format!("view cast failed: {:?}", e)))
    }
}

/// Owned array: a shape plus a uniquely owned element buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: ShapeBuf,
    storage: Storage,
}

impl Tensor {
    pub fn from_storage(storage: Storage, shape: &[usize]) -> Result<Self> {
        let count = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| TensorError::conversion(format!("shape {:?} overflows usize", shape)))?;

        if count != storage.len() {
            return Err(TensorError::conversion(format!(
                "{} elements do not fill shape {:?}",
                storage.len(),
                shape
            )));
        }

        Ok(Self {
            shape: shape.iter().copied().collect(),
            storage,
        })
    }

    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::from_storage(T::into_storage(data), shape)
    }

    pub fn from_bools(data: Vec<bool>, shape: &[usize]) -> Result<Self> {
        let bytes = data.into_iter().map(u8::from).collect();
        Self::from_storage(Storage::Bool(bytes), shape)
    }

    pub fn from_strings(data: Vec<String>, shape: &[usize]) -> Result<Self> {
        Self::from_storage(Storage::Utf8(data), shape)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn num_elements(&self) -> usize {
        self.storage.len()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn into_storage(self) -> Storage {
        self.storage
    }

    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice_of(&self.storage)
    }

    /// Borrow as a view. Text arrays come back opaque.
    pub fn view(&self) -> TensorView<'_> {
        TensorView::new(
            self.storage.as_bytes(),
            Cow::Borrowed(&self.shape[..]),
            self.dtype(),
        )
    }
}

// COMPUTE OPERATIONS

/// Element-wise addition with the default (wrapping) overflow policy.
pub fn add(a: &TensorView<'_>, b: &TensorView<'_>) -> Result<Tensor> {
    add_with(a, b, OverflowPolicy::default())
}

/// Element-wise addition into a freshly allocated tensor.
///
/// Validation runs to completion before anything is allocated: both views
/// must be at least one-dimensional, hold numeric elements, and share the
/// exact same shape. The result has the promoted element type of the two
/// inputs. Neither input is written.
pub fn add_with(a: &TensorView<'_>, b: &TensorView<'_>, policy: OverflowPolicy) -> Result<Tensor> {
    let out_dtype = check_operands(a, b)?;
    let n = a.num_elements();

    debug!(
        "add: {}{:?} + {}{:?} -> {} ({:?})",
        a.dtype, a.shape, b.dtype, b.shape, out_dtype, policy
    );

    let storage = match_numeric!(a.dtype, A => {
        let xs = a.as_slice::<A>()?;
        match_numeric!(b.dtype, B => {
            let ys = b.as_slice::<B>()?;
            match_numeric!(out_dtype, O => {
                let mut out = alloc_output::<O>(n)?;
                sum_into(xs, ys, &mut out, policy)?;
                Ok(O::into_storage(out))
            })
        })
    })?;

    Tensor::from_storage(storage, &a.shape)
}

/// Validates operands in order: readable array (dimensionality, bytes),
/// element kind, shape. Returns the promoted output type.
fn check_operands(a: &TensorView<'_>, b: &TensorView<'_>) -> Result<DType> {
    for view in [a, b] {
        if view.ndim() == 0 {
            return Err(TensorError::conversion(
                "zero-dimensional operand; expected an array",
            ));
        }
        view.validate()?;
    }

    for view in [a, b] {
        if !view.dtype.is_numeric() {
            return Err(TensorError::UnsupportedType(view.dtype));
        }
    }

    if a.shape != b.shape {
        return Err(TensorError::ShapeMismatch {
            lhs: a.shape.to_vec(),
            rhs: b.shape.to_vec(),
        });
    }

    a.dtype
        .promote(b.dtype)
        .ok_or(TensorError::UnsupportedType(a.dtype))
}

fn alloc_output<T: Element>(n: usize) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(n)
        .map_err(|_| TensorError::AllocationFailure {
            elements: n,
            dtype: T::DTYPE,
        })?;
    trace!("add: reserved {} x {}", n, T::DTYPE);
    out.resize(n, T::zeroed());
    Ok(out)
}

fn sum_into<A, B, O>(xs: &[A], ys: &[B], out: &mut [O], policy: OverflowPolicy) -> Result<()>
where
    A: AsPrimitive<O>,
    B: AsPrimitive<O>,
    O: Element + AddElement,
{
    add_arr(xs, ys, out, policy).map_err(|err| match err.downcast_ref::<OverflowAt>() {
        Some(&OverflowAt(index)) => TensorError::IntegerOverflow {
            index,
            dtype: O::DTYPE,
        },
        // add_arr only rejects operands of different lengths
        None => TensorError::ShapeMismatch {
            lhs: vec![xs.len()],
            rhs: vec![ys.len()],
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::*;
    use approx::assert_relative_eq;

    fn tensor<T: Element>(data: Vec<T>, shape: &[usize]) -> Tensor {
        Tensor::from_vec(data, shape).expect("tensor construction failed")
    }

    // VIEW TESTS - Zero-Copy

    #[test]
    fn test_view_is_zero_copy() {
        let t = tensor(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let view = t.view();

        assert_eq!(view.num_elements(), 6);
        assert_eq!(view.element_size(), Some(4));
        assert_eq!(view.expected_byte_len(), Some(24));

        let slice = view.as_slice::<f32>().expect("f32 slice failed");
        assert_eq!(slice.as_ptr(), t.as_slice::<f32>().unwrap().as_ptr());
    }

    #[test]
    fn test_view_misaligned_fails() {
        let aligned: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let bytes: &[u8] = bytemuck::cast_slice(&aligned);
        let misaligned = &bytes[1..25];

        assert_ne!(
            misaligned.as_ptr().align_offset(std::mem::align_of::<f32>()),
            0,
            "Test setup failed: slice should be misaligned"
        );

        let view = TensorView::new(misaligned, vec![2usize, 3], DType::F32);
        let err = view.as_slice::<f32>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn test_view_length_mismatch_fails() {
        let data = [1i32, 2, 3];
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let view = TensorView::new(bytes, vec![4usize], DType::I32);
        assert_eq!(
            view.as_slice::<i32>().unwrap_err().kind(),
            ErrorKind::ConversionFailure
        );
    }

    #[test]
    fn test_view_validate() {
        let data = [1u16, 2, 3, 4];
        let bytes: &[u8] = bytemuck::cast_slice(&data);

        assert!(TensorView::new(bytes, vec![2usize, 2], DType::U16).validate().is_ok());
        assert_eq!(
            TensorView::new(bytes, vec![3usize], DType::U16)
                .validate()
                .unwrap_err()
                .kind(),
            ErrorKind::ConversionFailure
        );
        assert!(TensorView::opaque(vec![5usize], DType::Utf8).validate().is_ok());
    }

    #[test]
    fn test_tensor_rejects_wrong_count() {
        let err = Tensor::from_vec(vec![1u8, 2, 3], &[2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    }

    // ADD TESTS

    #[test]
    fn test_add_one_dimensional() {
        let a = tensor(vec![1i64, 2, 3], &[3]);
        let b = tensor(vec![10i64, 20, 30], &[3]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.shape(), &[3]);
        assert_eq!(out.dtype(), DType::I64);
        assert_eq!(out.as_slice::<i64>().unwrap(), &[11, 22, 33]);
    }

    #[test]
    fn test_add_two_dimensional_row_major() {
        let a = tensor(vec![1i32, 2, 3, 4], &[2, 2]);
        let b = tensor(vec![5i32, 6, 7, 8], &[2, 2]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_slice::<i32>().unwrap(), &[6, 8, 10, 12]);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = tensor(vec![1i32, 2], &[2]);
        let b = tensor(vec![1i32, 2, 3, 4], &[2, 2]);

        let err = add(&a.view(), &b.view()).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                lhs: vec![2],
                rhs: vec![2, 2]
            }
        );
    }

    #[test]
    fn test_add_same_count_different_shape() {
        let a = tensor(vec![1.0f64; 6], &[2, 3]);
        let b = tensor(vec![1.0f64; 6], &[3, 2]);
        assert_eq!(
            add(&a.view(), &b.view()).unwrap_err().kind(),
            ErrorKind::ShapeMismatch
        );
    }

    #[test]
    fn test_add_int_plus_float_promotes() {
        let a = tensor(vec![1.5f64, 2.5], &[2]);
        let b = tensor(vec![1i64, 2], &[2]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.dtype(), DType::F64);
        let got = out.as_slice::<f64>().unwrap();
        assert_relative_eq!(got[0], 2.5);
        assert_relative_eq!(got[1], 4.5);
    }

    #[test]
    fn test_add_narrow_int_with_f32_stays_f32() {
        let a = tensor(vec![1u8, 2], &[2]);
        let b = tensor(vec![0.25f32, 0.5], &[2]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.dtype(), DType::F32);
        assert_eq!(out.as_slice::<f32>().unwrap(), &[1.25, 2.5]);
    }

    #[test]
    fn test_add_mixed_sign_widens() {
        let a = tensor(vec![255u8, 0], &[2]);
        let b = tensor(vec![1i8, -128], &[2]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.dtype(), DType::I16);
        assert_eq!(out.as_slice::<i16>().unwrap(), &[256, -128]);
    }

    #[test]
    fn test_add_text_is_unsupported() {
        let a = Tensor::from_strings(vec!["a".into(), "b".into()], &[2]).unwrap();
        let b = tensor(vec![1.0f32, 2.0], &[2]);

        let err = add(&a.view(), &b.view()).unwrap_err();
        assert_eq!(err, TensorError::UnsupportedType(DType::Utf8));
    }

    #[test]
    fn test_add_bool_is_unsupported() {
        let a = Tensor::from_bools(vec![true, false], &[2]).unwrap();
        let b = tensor(vec![1u8, 2], &[2]);
        assert_eq!(
            add(&b.view(), &a.view()).unwrap_err(),
            TensorError::UnsupportedType(DType::Bool)
        );
    }

    #[test]
    fn test_type_checked_before_shape() {
        let a = Tensor::from_strings(vec!["x".into()], &[1]).unwrap();
        let b = tensor(vec![1i32, 2], &[2]);
        assert_eq!(
            add(&a.view(), &b.view()).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
    }

    #[test]
    fn test_malformed_bytes_checked_before_shape() {
        let data = [1i32, 2, 3];
        let short = TensorView::new(bytemuck::cast_slice(&data), vec![4usize], DType::I32);
        let b = tensor(vec![1i32, 2], &[2]);

        assert_eq!(
            add(&short, &b.view()).unwrap_err().kind(),
            ErrorKind::ConversionFailure
        );
        assert_eq!(
            add(&b.view(), &short).unwrap_err().kind(),
            ErrorKind::ConversionFailure
        );
    }

    #[test]
    fn test_misaligned_bytes_checked_before_type() {
        let aligned = [1.0f64, 2.0, 3.0];
        let bytes: &[u8] = bytemuck::cast_slice(&aligned);
        let misaligned = TensorView::new(&bytes[1..17], vec![2usize], DType::F64);
        let text = Tensor::from_strings(vec!["x".into()], &[1]).unwrap();

        assert_eq!(
            add(&misaligned, &text.view()).unwrap_err().kind(),
            ErrorKind::ConversionFailure
        );
    }

    #[test]
    fn test_alloc_output_failure() {
        let err = alloc_output::<f64>(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllocationFailure);
        assert_eq!(
            err,
            TensorError::AllocationFailure {
                elements: usize::MAX,
                dtype: DType::F64
            }
        );
    }

    #[test]
    fn test_sum_into_length_mismatch() {
        let mut out = [0i32; 2];
        let err = sum_into(&[1i32, 2], &[1i32], &mut out, OverflowPolicy::Wrap).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                lhs: vec![2],
                rhs: vec![1]
            }
        );
    }

    #[test]
    fn test_add_zero_dimensional_rejected() {
        let a = tensor(vec![1i32], &[]);
        let b = tensor(vec![2i32], &[]);
        assert_eq!(
            add(&a.view(), &b.view()).unwrap_err().kind(),
            ErrorKind::ConversionFailure
        );
    }

    #[test]
    fn test_add_empty_arrays() {
        let a = tensor(Vec::<f32>::new(), &[0, 3]);
        let b = tensor(Vec::<f32>::new(), &[0, 3]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.shape(), &[0, 3]);
        assert_eq!(out.num_elements(), 0);
    }

    #[test]
    fn test_add_does_not_mutate_or_alias_inputs() {
        let a = tensor(vec![1.0f32, f32::NAN, -0.0], &[3]);
        let b = tensor(vec![2.0f32, 1.0, 0.0], &[3]);
        let a_bits: Vec<u32> = a.as_slice::<f32>().unwrap().iter().map(|x| x.to_bits()).collect();
        let b_before = b.clone();

        let out = add(&a.view(), &b.view()).expect("add failed");

        let a_after: Vec<u32> = a.as_slice::<f32>().unwrap().iter().map(|x| x.to_bits()).collect();
        assert_eq!(a_bits, a_after);
        assert_eq!(b, b_before);

        let out_ptr = out.storage().as_bytes().as_ptr();
        assert_ne!(out_ptr, a.storage().as_bytes().as_ptr());
        assert_ne!(out_ptr, b.storage().as_bytes().as_ptr());
    }

    #[test]
    fn test_add_wraps_by_default() {
        let a = tensor(vec![i32::MAX, 5], &[2]);
        let b = tensor(vec![1i32, 5], &[2]);

        let out = add(&a.view(), &b.view()).expect("add failed");
        assert_eq!(out.as_slice::<i32>().unwrap(), &[i32::MIN, 10]);
    }

    #[test]
    fn test_add_saturating() {
        let a = tensor(vec![250u8, 5], &[2]);
        let b = tensor(vec![10u8, 5], &[2]);

        let out = add_with(&a.view(), &b.view(), OverflowPolicy::Saturate).expect("add failed");
        assert_eq!(out.as_slice::<u8>().unwrap(), &[255, 10]);
    }

    #[test]
    fn test_add_checked_overflow() {
        let a = tensor(vec![1i64, i64::MAX], &[2]);
        let b = tensor(vec![1i64, 1], &[2]);

        let err = add_with(&a.view(), &b.view(), OverflowPolicy::Checked).unwrap_err();
        assert_eq!(
            err,
            TensorError::IntegerOverflow {
                index: 1,
                dtype: DType::I64
            }
        );
    }

    #[test]
    fn test_add_from_borrowed_bytes() {
        let a_data = [1.0f64, 2.0, 3.0, 4.0];
        let b_data = [5u16, 6, 7, 8];

        let a_view = TensorView::new(bytemuck::cast_slice(&a_data), vec![4usize], DType::F64);
        let b_view = TensorView::new(bytemuck::cast_slice(&b_data), vec![4usize], DType::U16);

        let out = add(&a_view, &b_view).expect("add failed");
        assert_eq!(out.as_slice::<f64>().unwrap(), &[6.0, 8.0, 10.0, 12.0]);
    }
}
