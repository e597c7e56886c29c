//! The call dispatcher: pure forwarding from host argument packs to one of
//! `Object`'s four call shapes.

use crate::convert::Convert;
use crate::error::Error;
use crate::object::Object;

/// A keyword argument, constructed via [`kwarg`]. Distinguishing this type
/// from a plain positional argument is what lets [`call_any!`] partition a
/// host argument pack into positional/keyword spans without the callee
/// needing to know which shape it will end up dispatching to.
#[derive(Clone)]
pub struct Kwarg {
    pub name: &'static str,
    pub value: Object,
}

/// Build a keyword argument from any host value convertible via [`Convert`].
pub fn kwarg<T: Convert>(name: &'static str, value: &T) -> Kwarg {
    Kwarg {
        name,
        value: Object::new(value),
    }
}

/// One element of a variadic call argument pack, tagged by the argument's
/// position/keyword role. Rust has no variadic templates, so `call_any!`
/// builds this enum per argument instead of partitioning at compile time.
pub enum CallArgument {
    Positional(Object),
    Keyword(Kwarg),
}

/// Converts a single `call_any!` argument into a [`CallArgument`].
pub trait IntoCallArgument {
    fn into_call_argument(self) -> CallArgument;
}

impl IntoCallArgument for Object {
    fn into_call_argument(self) -> CallArgument {
        CallArgument::Positional(self)
    }
}

impl IntoCallArgument for Kwarg {
    fn into_call_argument(self) -> CallArgument {
        CallArgument::Keyword(self)
    }
}

/// Dispatch a call with no arguments.
pub fn call0(callee: &Object) -> Result<Object, Error> {
    callee.call0()
}

/// Dispatch a call with a positional argument span.
pub fn call(callee: &Object, posargs: &[Object]) -> Result<Object, Error> {
    callee.call(posargs)
}

/// Dispatch a call with both positional and keyword argument spans, keyword
/// arguments aggregated into a mapping in first-seen order.
pub fn call_kw(callee: &Object, posargs: &[Object], kwargs: &[Kwarg]) -> Result<Object, Error> {
    let pairs: Vec<(&str, Object)> = kwargs.iter().map(|k| (k.name, k.value.clone())).collect();
    callee.call_kw(posargs, &pairs)
}

/// Partition `args` into positional/keyword spans and dispatch to the
/// appropriate call shape. Called by [`call_any!`]; prefer the macro at call
/// sites.
pub fn call_variadic(callee: &Object, args: Vec<CallArgument>) -> Result<Object, Error> {
    if args.is_empty() {
        return call0(callee);
    }
    let mut posargs = Vec::with_capacity(args.len());
    let mut kwargs = Vec::new();
    for arg in args {
        match arg {
            CallArgument::Positional(o) => posargs.push(o),
            CallArgument::Keyword(k) => kwargs.push(k),
        }
    }
    if kwargs.is_empty() {
        call(callee, &posargs)
    } else {
        call_kw(callee, &posargs, &kwargs)
    }
}

/// Call `callee` with a variadic host argument pack, e.g.
/// `call_any!(&f, Object::new(&1), kwarg("b", &2))`.
#[macro_export]
macro_rules! call_any {
    ($callee:expr $(,)?) => {
        $crate::call::call0($callee)
    };
    ($callee:expr, $($arg:expr),+ $(,)?) => {
        $crate::call::call_variadic(
            $callee,
            vec![$($crate::call::IntoCallArgument::into_call_argument($arg)),+],
        )
    };
}
