//! Operator plumbing shared by the tensor types.
//!
//! Tensor-tensor operators are implemented on references and return a
//! `Result`, since the operands may disagree in shape. Scalar operators on
//! host tensors cannot fail; on device tensors they still allocate and so
//! return a `Result` too.

/// Elementwise operators for host tensors.
///
/// The type must provide `map`, `map_inplace` and `zip_inplace`.
macro_rules! host_elementwise {
    ($ty:ident) => {
        impl $ty {
            pub fn add_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.zip_inplace(rhs, "add", |a, b| a + b)
            }

            pub fn sub_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.zip_inplace(rhs, "sub", |a, b| a - b)
            }

            pub fn mul_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.zip_inplace(rhs, "mul", |a, b| a * b)
            }

            pub fn div_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.zip_inplace(rhs, "div", |a, b| a / b)
            }

            /// `self += alpha * x`
            pub fn axpy(&mut self, alpha: f32, x: &$ty) -> $crate::error::Result<()> {
                self.zip_inplace(x, "axpy", |a, b| a + alpha * b)
            }

            pub fn pow(&self, exp: f32) -> $ty {
                self.map(|x| x.powf(exp))
            }

            pub fn pow_inplace(&mut self, exp: f32) {
                self.map_inplace(|x| x.powf(exp))
            }
        }

        host_elementwise!(@binary $ty, Add, add, add_inplace);
        host_elementwise!(@binary $ty, Sub, sub, sub_inplace);
        host_elementwise!(@binary $ty, Mul, mul, mul_inplace);
        host_elementwise!(@binary $ty, Div, div, div_inplace);

        host_elementwise!(@scalar $ty, Add, add, +);
        host_elementwise!(@scalar $ty, Sub, sub, -);
        host_elementwise!(@scalar $ty, Mul, mul, *);
        host_elementwise!(@scalar $ty, Div, div, /);

        impl std::ops::Mul<&$ty> for f32 {
            type Output = $ty;

            fn mul(self, rhs: &$ty) -> $ty {
                rhs.map(|x| self * x)
            }
        }

        impl std::ops::Neg for &$ty {
            type Output = $ty;

            fn neg(self) -> $ty {
                self.map(|x| -x)
            }
        }
    };

    (@binary $ty:ident, $trait:ident, $method:ident, $inplace:ident) => {
        impl std::ops::$trait for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn $method(self, rhs: &$ty) -> Self::Output {
                let mut out = self.clone();
                out.$inplace(rhs)?;
                Ok(out)
            }
        }
    };

    (@scalar $ty:ident, $trait:ident, $method:ident, $op:tt) => {
        impl std::ops::$trait<f32> for &$ty {
            type Output = $ty;

            fn $method(self, s: f32) -> $ty {
                self.map(|x| x $op s)
            }
        }
    };
}

/// Elementwise operators for device tensors.
///
/// The type must provide a `buf: DeviceBuffer` field, `check_same` and
/// `try_clone`.
macro_rules! device_elementwise {
    ($ty:ident) => {
        impl $ty {
            pub fn add_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.axpy(1.0, rhs)
            }

            pub fn sub_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.axpy(-1.0, rhs)
            }

            pub fn mul_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.check_same(rhs, "mul")?;
                $crate::device::get()?.mul(&mut self.buf, &rhs.buf)
            }

            pub fn div_inplace(&mut self, rhs: &$ty) -> $crate::error::Result<()> {
                self.check_same(rhs, "div")?;
                $crate::device::get()?.div(&mut self.buf, &rhs.buf)
            }

            /// `self += alpha * x`
            pub fn axpy(&mut self, alpha: f32, x: &$ty) -> $crate::error::Result<()> {
                self.check_same(x, "axpy")?;
                $crate::device::get()?.axpy(alpha, &x.buf, &mut self.buf)
            }

            pub fn pow(&self, exp: f32) -> $crate::error::Result<$ty> {
                let mut out = self.try_clone()?;
                out.pow_inplace(exp)?;
                Ok(out)
            }

            pub fn pow_inplace(&mut self, exp: f32) -> $crate::error::Result<()> {
                $crate::device::get()?.pow(&mut self.buf, exp)
            }

            pub fn add_scalar_inplace(&mut self, s: f32) -> $crate::error::Result<()> {
                $crate::device::get()?.add_scalar(s, &mut self.buf)
            }

            pub fn scale_inplace(&mut self, s: f32) -> $crate::error::Result<()> {
                $crate::device::get()?.scal(s, &mut self.buf)
            }

            fn mapped(
                &self,
                f: impl FnOnce(&mut $ty) -> $crate::error::Result<()>,
            ) -> $crate::error::Result<$ty> {
                let mut out = self.try_clone()?;
                f(&mut out)?;
                Ok(out)
            }
        }

        device_elementwise!(@binary $ty, Add, add, add_inplace);
        device_elementwise!(@binary $ty, Sub, sub, sub_inplace);
        device_elementwise!(@binary $ty, Mul, mul, mul_inplace);
        device_elementwise!(@binary $ty, Div, div, div_inplace);

        impl std::ops::Add<f32> for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn add(self, s: f32) -> Self::Output {
                self.mapped(|t| t.add_scalar_inplace(s))
            }
        }

        impl std::ops::Sub<f32> for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn sub(self, s: f32) -> Self::Output {
                self.mapped(|t| t.add_scalar_inplace(-s))
            }
        }

        impl std::ops::Mul<f32> for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn mul(self, s: f32) -> Self::Output {
                self.mapped(|t| t.scale_inplace(s))
            }
        }

        impl std::ops::Div<f32> for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn div(self, s: f32) -> Self::Output {
                self.mapped(|t| t.scale_inplace(1.0 / s))
            }
        }

        impl std::ops::Mul<&$ty> for f32 {
            type Output = $crate::error::Result<$ty>;

            fn mul(self, rhs: &$ty) -> Self::Output {
                rhs * self
            }
        }

        impl std::ops::Neg for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn neg(self) -> Self::Output {
                self.mapped(|t| t.scale_inplace(-1.0))
            }
        }
    };

    (@binary $ty:ident, $trait:ident, $method:ident, $inplace:ident) => {
        impl std::ops::$trait for &$ty {
            type Output = $crate::error::Result<$ty>;

            fn $method(self, rhs: &$ty) -> Self::Output {
                let mut out = self.try_clone()?;
                out.$inplace(rhs)?;
                Ok(out)
            }
        }
    };
}
