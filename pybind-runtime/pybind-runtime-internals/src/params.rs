//! Parameter schema and argument binder: fills positional slots, then
//! keyword slots by declaration order, then defaults, then extracts each
//! slot into its host type, prefixing any failure with `argument '<name>': `.

use crate::convert::Convert;
use crate::error::{prefix_error, raise_type_error, Error};
use crate::object::mapping::Dict;
use crate::object::Object;

/// A function/method parameter: a host type `T`, a compile-time name, and an
/// optional default-value factory.
pub struct Param<T> {
    pub name: &'static str,
    pub default: Option<fn() -> T>,
}

impl<T> Param<T> {
    pub const fn new(name: &'static str) -> Self {
        Param {
            name,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, default: fn() -> T) -> Self {
        Param {
            name,
            default: Some(default),
        }
    }
}

/// Steps 1-4 of the binder: produce one runtime object per declared
/// parameter, filling from `posargs`, then `kwargs` (in iteration order),
/// then defaults, type-erased over `Object` since the positional/keyword
/// assignment pass doesn't need each slot's declared host type yet.
fn bind_slots(
    names: &[&'static str],
    defaults: &[Option<Object>],
    posargs: &[Object],
    kwargs: Option<&Dict>,
) -> Result<Vec<Object>, Error> {
    let n = names.len();
    if n == 0 {
        let kw_count = kwargs.map(|d| d.len().unwrap_or(0)).unwrap_or(0);
        let total = posargs.len() + kw_count;
        if total > 0 {
            return Err(raise_type_error(format!(
                "function takes no arguments ({} given)",
                total
            )));
        }
        return Ok(Vec::new());
    }

    let kw_count = kwargs.map(|d| d.len().unwrap_or(0)).unwrap_or(0);
    let total = posargs.len() + kw_count;
    if posargs.len() > n {
        return Err(raise_type_error(format!(
            "function takes at most {} arguments ({} given)",
            n, total
        )));
    }

    let mut slots: Vec<Option<Object>> = vec![None; n];
    for (i, value) in posargs.iter().enumerate() {
        slots[i] = Some(value.clone());
    }

    if let Some(kwargs) = kwargs {
        let mut binder_error: Option<Error> = None;
        kwargs.for_each(|key, value| {
            if binder_error.is_some() {
                return Ok(());
            }
            let name = match String::extract(key.handle()) {
                Ok(n) => n,
                Err(e) => {
                    binder_error = Some(e);
                    return Ok(());
                }
            };
            match names.iter().position(|&n| n == name) {
                None => {
                    binder_error = Some(raise_type_error(format!(
                        "unexpected argument '{}'",
                        name
                    )));
                }
                Some(i) => {
                    if slots[i].is_some() {
                        binder_error = Some(raise_type_error(format!(
                            "duplicate argument '{}'",
                            name
                        )));
                    } else {
                        slots[i] = Some(value.clone());
                    }
                }
            }
            Ok(())
        })?;
        if let Some(e) = binder_error {
            return Err(e);
        }
    }

    for i in 0..n {
        if slots[i].is_none() {
            match &defaults[i] {
                Some(default_value) => slots[i] = Some(default_value.clone()),
                None => {
                    return Err(raise_type_error(format!(
                        "missing argument '{}'",
                        names[i]
                    )));
                }
            }
        }
    }

    Ok(slots.into_iter().map(|s| s.unwrap()).collect())
}

/// Extract slot `i` into `T`, prefixing a failure with `argument '<name>': `.
fn extract_slot<T: Convert>(name: &'static str, slot: &Object) -> Result<T, Error> {
    T::extract(slot.handle()).map_err(|e| prefix_error(e, &format!("argument '{}'", name)))
}

/// Bind a zero-parameter call. A fast path that skips slot allocation entirely.
pub fn bind0(func_label: &str, posargs: &[Object], kwargs: Option<&Dict>) -> Result<(), Error> {
    bind_slots(&[], &[], posargs, kwargs)
        .map_err(|e| prefix_error(e, func_label))
        .map(|_| ())
}

macro_rules! binder_arity {
    ($fn_name:ident, $( $idx:tt : $T:ident ),+ $(,)?) => {
        /// Bind a call against this arity's parameter schema.
        pub fn $fn_name<$($T: Convert),+>(
            func_label: &str,
            params: ( $(&Param<$T>,)+ ),
            posargs: &[Object],
            kwargs: Option<&Dict>,
        ) -> Result<( $($T,)+ ), Error> {
            let names: &[&'static str] = &[ $(params.$idx.name),+ ];
            let defaults: Vec<Option<Object>> = vec![
                $( params.$idx.default.map(|f| Object::new(&f())) ),+
            ];
            let slots = bind_slots(names, &defaults, posargs, kwargs)
                .map_err(|e| $crate::error::prefix_error(e, func_label))?;
            $( let $T = extract_slot::<$T>(params.$idx.name, &slots[$idx])
                .map_err(|e| $crate::error::prefix_error(e, func_label))?; )+
            Ok(( $($T,)+ ))
        }
    };
}

binder_arity!(bind1, 0: T0);
binder_arity!(bind2, 0: T0, 1: T1);
binder_arity!(bind3, 0: T0, 1: T1, 2: T2);
binder_arity!(bind4, 0: T0, 1: T1, 2: T2, 3: T3);
binder_arity!(bind5, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
binder_arity!(bind6, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);

#[cfg(test)]
mod tests {
    // Exercising `bind*` against real positional/keyword argument objects
    // requires a live interpreter; see `pybind-runtime/tests/function.rs`.
}
