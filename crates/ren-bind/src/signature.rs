//! Signature deduction for host callables.
//!
//! `HostFunction<Marker>` is implemented for every `Fn(A1, .., An) -> R`
//! with `n <= 8`, where each `Ai: FromCell` and `R: IntoReturn`. The marker is
//! the argument tuple, which keeps the impls for different arities apart.

use std::fmt::Display;

use ren_abi::{stack_argument, RenCell};
use ren_engine::NativeFailure;
use ren_values::{CellHeap, FromCell, Function, IntoCell, Kind, Unset, Value, Word};

/// One deduced parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct HostParam {
    pub type_name: &'static str,
    /// `None` when the type takes any value.
    pub kinds: Option<Vec<Kind>>,
}

/// Argument tuples that can be decoded from a native call stack.
pub trait FromStack: Sized {
    const ARITY: usize;

    fn params() -> Vec<HostParam>;

    /// Decode arguments left to right, stopping at the first failure.
    ///
    /// # Safety
    /// `stack` must be a live argument stack with at least `ARITY` arguments.
    unsafe fn from_stack(stack: *mut RenCell, heap: &dyn CellHeap) -> Result<Self, NativeFailure>;
}

macro_rules! one {
    ($x:ident) => {
        1
    };
}

macro_rules! from_stack_tuple {
    ($($arg:ident),*) => {
        impl<$($arg: FromCell,)*> FromStack for ($($arg,)*) {
            const ARITY: usize = 0 $(+ one!($arg))*;

            fn params() -> Vec<HostParam> {
                vec![$(HostParam {
                    type_name: std::any::type_name::<$arg>(),
                    kinds: <$arg as FromCell>::accepted_kinds(),
                }),*]
            }

            #[allow(unused_variables, unused_mut, unused_assignments, clippy::unused_unit)]
            unsafe fn from_stack(
                stack: *mut RenCell,
                heap: &dyn CellHeap,
            ) -> Result<Self, NativeFailure> {
                let mut index = 0usize;
                Ok(($({
                    let cell = &*stack_argument(stack, index);
                    let value = <$arg as FromCell>::from_cell(cell, heap)
                        .map_err(|err| NativeFailure::argument(index, err))?;
                    index += 1;
                    value
                },)*))
            }
        }
    };
}

from_stack_tuple!();
from_stack_tuple!(A1);
from_stack_tuple!(A1, A2);
from_stack_tuple!(A1, A2, A3);
from_stack_tuple!(A1, A2, A3, A4);
from_stack_tuple!(A1, A2, A3, A4, A5);
from_stack_tuple!(A1, A2, A3, A4, A5, A6);
from_stack_tuple!(A1, A2, A3, A4, A5, A6, A7);
from_stack_tuple!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Return types a native may produce.
///
/// `()` becomes `unset!`; `Err` of a `Result` becomes a callable failure.
pub trait IntoReturn {
    type Output: IntoCell + 'static;

    fn into_return(self) -> Result<Self::Output, NativeFailure>;
}

impl IntoReturn for () {
    type Output = Unset;

    fn into_return(self) -> Result<Unset, NativeFailure> {
        Ok(Unset)
    }
}

impl<T, E> IntoReturn for Result<T, E>
where
    T: IntoCell + 'static,
    E: Display,
{
    type Output = T;

    fn into_return(self) -> Result<T, NativeFailure> {
        self.map_err(|err| NativeFailure::Callable(err.to_string()))
    }
}

impl<T: IntoCell + 'static> IntoReturn for Option<T> {
    type Output = Option<T>;

    fn into_return(self) -> Result<Option<T>, NativeFailure> {
        Ok(self)
    }
}

macro_rules! plain_return {
    ($($ty:ty),*) => {
        $(impl IntoReturn for $ty {
            type Output = $ty;

            fn into_return(self) -> Result<$ty, NativeFailure> {
                Ok(self)
            }
        })*
    };
}

plain_return!(i64, i32, f64, bool, char, String, &'static str, Word, Vec<Value>, Kind, Function, Value, Unset);

/// A host callable with a deducible native signature.
pub trait HostFunction<Marker>: Send + Sync + 'static {
    type Args: FromStack + 'static;
    type Output: IntoCell + 'static;

    fn invoke(&self, args: Self::Args) -> Result<Self::Output, NativeFailure>;
}

macro_rules! host_function {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> HostFunction<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: FromCell + 'static,)*
        {
            type Args = ($($arg,)*);
            type Output = R::Output;

            #[allow(non_snake_case, clippy::unused_unit)]
            fn invoke(&self, ($($arg,)*): Self::Args) -> Result<R::Output, NativeFailure> {
                (self)($($arg),*).into_return()
            }
        }
    };
}

host_function!();
host_function!(A1);
host_function!(A1, A2);
host_function!(A1, A2, A3);
host_function!(A1, A2, A3, A4);
host_function!(A1, A2, A3, A4, A5);
host_function!(A1, A2, A3, A4, A5, A6);
host_function!(A1, A2, A3, A4, A5, A6, A7);
host_function!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Deduced parameters of `F`, without calling it.
pub fn host_params<M, F: HostFunction<M>>(_fun: &F) -> Vec<HostParam> {
    <F::Args as FromStack>::params()
}

pub(crate) fn signature_name<M, F: HostFunction<M>>() -> &'static str {
    std::any::type_name::<(F::Args, F::Output)>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arity<M, F: HostFunction<M>>(_f: &F) -> usize {
        <F::Args as FromStack>::ARITY
    }

    #[test]
    fn deduces_arity() {
        assert_eq!(arity(&|| 1i64), 0);
        assert_eq!(arity(&|a: i64, b: i64| a + b), 2);
        assert_eq!(
            arity(&|_: i64, _: f64, _: bool, _: char, _: String, _: Word, _: Vec<Value>, _: Value| ()),
            8
        );
    }

    #[test]
    fn deduces_kinds() {
        let params = host_params(&|_: i64, _: f64, _: Value| ());
        assert_eq!(params[0].kinds, Some(vec![Kind::Integer]));
        assert_eq!(params[1].kinds, Some(vec![Kind::Decimal, Kind::Integer]));
        assert_eq!(params[2].kinds, None);
    }

    #[test]
    fn returns_normalise() {
        let unit = |_: i64| ();
        assert_eq!(unit.invoke((1,)), Ok(Unset));

        let failing = |a: i64| -> Result<i64, String> {
            if a < 0 {
                Err("negative".to_string())
            } else {
                Ok(a)
            }
        };
        assert_eq!(failing.invoke((2,)), Ok(2));
        assert_eq!(
            failing.invoke((-1,)),
            Err(NativeFailure::Callable("negative".to_string()))
        );
    }
}
