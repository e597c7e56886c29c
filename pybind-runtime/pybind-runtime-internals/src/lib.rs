//! `pybind-runtime` is a library for embedding a dynamic scripting runtime
//! in a host process and exposing host types and functions to it through a
//! statically-typed binding layer. It is intended to work with any embedder
//! that links against the runtime's C ABI.

#![deny(bare_trait_objects)]

pub mod call;
pub mod class_registry;
pub mod convert;
pub mod error;
pub mod gil;
pub mod handle;
pub mod interpreter;
pub mod memory;
pub mod module_builder;
pub mod object;
pub mod params;
pub mod trampoline;
pub mod typing;

pub use crate::call::{kwarg, CallArgument, IntoCallArgument, Kwarg};
pub use crate::class_registry::HeapType;
pub use crate::convert::Convert;
pub use crate::error::{
    raise_assertion_error, raise_runtime_error, raise_system_error, raise_type_error,
    raise_value_error, Error, ErrorException,
};
pub use crate::gil::{acquire, release, AcquireScope, ReleaseScope};
pub use crate::handle::{borrow, steal, Handle};
pub use crate::interpreter::{Config, Interpreter};
pub use crate::memory::{make_memory, MemoryView};
pub use crate::module_builder::{destructor_for, module_, ClassBuilder, ModuleBuilder};
pub use crate::object::capsule::Capsule;
pub use crate::object::Object;
pub use crate::params::Param;
pub use crate::trampoline::{HostFn, HostInit, HostMethod, HostProperty};
pub use crate::typing::{type_name, Any, Facade, Optional};
