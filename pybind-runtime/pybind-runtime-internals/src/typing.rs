//! Typing helpers: `Union`/`Optional` variant façades and type-name
//! reflection.
//!
//! A template library can express `Union<Options...>` as a variadic
//! template; Rust has no variadic generics, so [`define_union!`] pushes the
//! "for every N" step from the type system into a macro instantiated once
//! per needed combination, the same move `call_any!` (`call.rs`) makes for
//! variadic call argument packs.

use crate::object::Object;

/// Any runtime object, no type constraint. The typing-level base case.
pub type Any = Object;

/// A façade whose declared type name is known without an instance --
/// compile-time reflection rather than a runtime lookup.
pub trait Facade {
    fn facade_type_name() -> String;
    fn facade_isinstance(obj: &Object) -> bool;
}

/// Reflect a façade's declared type name, e.g. `type_name::<Int>()` ==
/// `"int"`.
pub fn type_name<D: Facade>() -> String {
    D::facade_type_name()
}

macro_rules! impl_facade {
    ($ty:ty) => {
        impl Facade for $ty {
            fn facade_type_name() -> String {
                <$ty>::type_name().to_string()
            }
            fn facade_isinstance(obj: &Object) -> bool {
                <$ty>::isinstance(obj)
            }
        }
    };
}

impl_facade!(crate::object::number::Int);
impl_facade!(crate::object::number::Float);
impl_facade!(crate::object::number::Bool);
impl_facade!(crate::object::string::Str);
impl_facade!(crate::object::sequence::Tuple);
impl_facade!(crate::object::sequence::List);
impl_facade!(crate::object::mapping::Dict);
impl_facade!(crate::object::set::Set);
impl_facade!(crate::object::iterator::Iterator);
impl_facade!(crate::object::module::Module);

impl Facade for Object {
    fn facade_type_name() -> String {
        "object".to_string()
    }
    fn facade_isinstance(_obj: &Object) -> bool {
        true
    }
}

/// Define a variant façade over two or more member façades: `isinstance` is
/// the disjunction of the members' predicates, `facade_type_name` is
/// `"A | B | …"`. Nested unions are not supported -- pass the flattened
/// member list directly, since Rust macro expansion has no notion of "this
/// member is itself a Union" to flatten automatically.
#[macro_export]
macro_rules! define_union {
    ($name:ident, $($member:ty),+ $(,)?) => {
        /// A runtime object known to satisfy one of this union's member
        /// façades.
        #[derive(Clone, Debug)]
        pub struct $name($crate::object::Object);

        impl $name {
            pub fn type_name() -> String {
                $crate::typing::type_name::<$name>()
            }

            pub fn isinstance(obj: &$crate::object::Object) -> bool {
                false $(|| <$member as $crate::typing::Facade>::facade_isinstance(obj))+
            }

            pub fn expect(obj: &$crate::object::Object) -> Result<Self, $crate::error::Error> {
                <$name as $crate::typing::Facade>::facade_isinstance(obj)
                    .then(|| $name(obj.clone()))
                    .ok_or_else(|| {
                        $crate::error::raise_type_error(format!(
                            "expected '{}', got '{}'",
                            <$name as $crate::typing::Facade>::facade_type_name(),
                            $crate::object::fully_qualified_name(unsafe {
                                pyo3_ffi::Py_TYPE(obj.as_ptr()) as *mut pyo3_ffi::PyObject
                            })
                        ))
                    })
            }

            pub fn as_object(&self) -> &$crate::object::Object {
                &self.0
            }
        }

        impl $crate::typing::Facade for $name {
            fn facade_type_name() -> String {
                let parts: Vec<String> = vec![$(<$member as $crate::typing::Facade>::facade_type_name()),+];
                parts.join(" | ")
            }
            fn facade_isinstance(obj: &$crate::object::Object) -> bool {
                $name::isinstance(obj)
            }
        }

        impl $crate::convert::Convert for $name {
            fn object(&self) -> $crate::handle::Handle {
                self.0.handle().clone()
            }
            fn extract(handle: &$crate::handle::Handle) -> Result<Self, $crate::error::Error> {
                Self::expect(&$crate::object::Object::from_handle(handle.clone()))
            }
        }
    };
}

/// `Optional<D>` for a concrete façade `D` is just `Option<D>`: the generic
/// `impl<T: Convert> Convert for Option<T>` in `convert.rs` already gives
/// every `Convert` type (façades included) the "`D` or `None`" round-trip --
/// no separate type is needed.
pub type Optional<D> = Option<D>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::number::Int;
    use crate::object::string::Str;

    define_union!(IntOrStr, Int, Str);

    #[test]
    fn union_type_name_joins_members() {
        assert_eq!(IntOrStr::type_name(), "int | str");
    }
}
