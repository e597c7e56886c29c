//! The trampoline factory: wraps host callables as runtime-callable
//! functions of the ABI-mandated `(self, posargs, kwargs) -> object*` shape.
//!
//! Every specialization runs inside [`crate::error::translate`], binds
//! arguments per [`crate::params`], and leaks its backing `PyMethodDef`/
//! `PyGetSetDef` into append-only storage, since the runtime retains the
//! pointer for the type's lifetime. `Box::leak` stands in for a
//! function-local `static` -- Rust's generic functions can't host a
//! per-instantiation static (see `class_registry.rs`), so each registration
//! call leaks its own record instead; the registry this feeds only ever
//! registers a given name once per process, so this does not grow
//! unbounded in practice.

use std::os::raw::{c_char, c_int, c_void};

use pyo3_ffi as ffi;

use crate::error::{raise_type_error, translate, Error};
use crate::handle::borrow;
use crate::object::mapping::Dict;
use crate::object::sequence::Tuple;
use crate::object::Object;

fn borrow_posargs(args: *mut ffi::PyObject) -> Vec<Object> {
    if args.is_null() {
        return Vec::new();
    }
    let tuple = Tuple::expect(&Object::from_handle(borrow(args))).expect("args is always a tuple");
    let len = tuple.len().unwrap_or(0);
    (0..len as isize).map(|i| tuple.get(i).unwrap()).collect()
}

fn borrow_kwargs(kwargs: *mut ffi::PyObject) -> Option<Dict> {
    if kwargs.is_null() {
        None
    } else {
        Dict::expect(&Object::from_handle(borrow(kwargs))).ok()
    }
}

fn c_string(s: &str) -> *const c_char {
    Box::leak(std::ffi::CString::new(s).unwrap_or_default().into_boxed_c_str()).as_ptr()
}

/// Build and leak a `PyMethodDef` for a host function `F`. Each callable
/// captures its host body as a distinct monomorphization of the inner
/// trampoline, so the leaked `PyMethodDef` can carry a plain
/// `PyCFunctionWithKeywords` pointer with no captured closure state --
/// matching the ABI's requirement that the function pointer be `'static`
/// with no environment slot. `F::call` is responsible for its own binding
/// via [`crate::params::bind0`]/`bind1`/etc.
pub fn function_def<F>(name: &'static str) -> &'static ffi::PyMethodDef
where
    F: HostFn,
{
    unsafe extern "C" fn trampoline<F: HostFn>(
        self_: *mut ffi::PyObject,
        args: *mut ffi::PyObject,
        kwargs: *mut ffi::PyObject,
    ) -> *mut ffi::PyObject {
        assert!(self_.is_null(), "`self` must be null for a function trampoline");
        let posargs = borrow_posargs(args);
        let kwargs = borrow_kwargs(kwargs);
        match translate(|| F::call(&posargs, kwargs.as_ref())) {
            Some(result) => {
                let object = result.unwrap_or_else(Object::none);
                let h = object.into_handle();
                h.incref();
                h.get()
            }
            None => std::ptr::null_mut(),
        }
    }

    let def = ffi::PyMethodDef {
        ml_name: c_string(name),
        ml_meth: Some(unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(*mut ffi::PyObject, *mut ffi::PyObject, *mut ffi::PyObject) -> *mut ffi::PyObject,
                ffi::PyCFunction,
            >(trampoline::<F>)
        }),
        ml_flags: ffi::METH_VARARGS | ffi::METH_KEYWORDS,
        ml_doc: std::ptr::null(),
    };
    Box::leak(Box::new(def))
}

/// A host function body bindable by the function trampoline: given the raw
/// positional/keyword argument objects, binds them per [`crate::params`],
/// invokes the underlying host function, and converts its result. Generated
/// by `#[host_fn]` (see `pybind-runtime-macros`); implemented by hand only
/// in tests.
pub trait HostFn {
    fn call(posargs: &[Object], kwargs: Option<&Dict>) -> Result<Option<Object>, Error>;
}

/// A host method body bindable by the method trampoline (self is the
/// embedded host instance's runtime object, prepended to the argument list
/// the argument list).
pub trait HostMethod<T> {
    fn call(instance: &T, posargs: &[Object], kwargs: Option<&Dict>) -> Result<Option<Object>, Error>;
}

/// Build and leak a `PyMethodDef` for a method trampoline. Asserts `self` is
/// non-null and extracts the embedded host instance via the registry
/// before prepending it to the call.
pub fn method_def<T: 'static, M: HostMethod<T>>(name: &'static str) -> &'static ffi::PyMethodDef {
    unsafe extern "C" fn trampoline<T: 'static, M: HostMethod<T>>(
        self_: *mut ffi::PyObject,
        args: *mut ffi::PyObject,
        kwargs: *mut ffi::PyObject,
    ) -> *mut ffi::PyObject {
        assert!(!self_.is_null(), "`self` must be non-null for a method trampoline");
        let posargs = borrow_posargs(args);
        let kwargs = borrow_kwargs(kwargs);
        match translate(|| {
            let ht = crate::class_registry::find::<T>()?;
            let instance = ht.value_of(self_);
            M::call(instance, &posargs, kwargs.as_ref())
        }) {
            Some(result) => {
                let object = result.unwrap_or_else(Object::none);
                let h = object.into_handle();
                h.incref();
                h.get()
            }
            None => std::ptr::null_mut(),
        }
    }
    let def = ffi::PyMethodDef {
        ml_name: c_string(name),
        ml_meth: Some(unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(*mut ffi::PyObject, *mut ffi::PyObject, *mut ffi::PyObject) -> *mut ffi::PyObject,
                ffi::PyCFunction,
            >(trampoline::<T, M>)
        }),
        ml_flags: ffi::METH_VARARGS | ffi::METH_KEYWORDS,
        ml_doc: std::ptr::null(),
    };
    Box::leak(Box::new(def))
}

/// A host initializer body bindable by the `__init__` trampoline.
pub trait HostInit<T> {
    fn call(posargs: &[Object], kwargs: Option<&Dict>) -> Result<T, Error>;
}

/// Build and leak the `__init__` trampoline: constructs the embedded host
/// value in place inside the already-allocated instance, then increments
/// the parent's refcount if configured.
pub fn init_def<T: 'static, I: HostInit<T>>() -> &'static ffi::PyMethodDef {
    unsafe extern "C" fn trampoline<T: 'static, I: HostInit<T>>(
        self_: *mut ffi::PyObject,
        args: *mut ffi::PyObject,
        kwargs: *mut ffi::PyObject,
    ) -> c_int {
        assert!(!self_.is_null(), "`self` must be non-null for an __init__ trampoline");
        let posargs = borrow_posargs(args);
        let kwargs = borrow_kwargs(kwargs);
        let outcome: Option<()> = translate(|| {
            let ht = crate::class_registry::find::<T>()?;
            let value = I::call(&posargs, kwargs.as_ref())?;
            unsafe {
                let raw = self_ as *mut crate::class_registry::ClassData<T>;
                std::ptr::write(&mut (*raw).value, value);
                if let Some(parent) = ht.parent_of(&(*raw).value) {
                    parent.handle().incref();
                }
            }
            Ok(())
        });
        if outcome.is_some() {
            0
        } else {
            -1
        }
    }

    let def = ffi::PyMethodDef {
        ml_name: c_string("__init__"),
        ml_meth: Some(unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(*mut ffi::PyObject, *mut ffi::PyObject, *mut ffi::PyObject) -> c_int,
                ffi::PyCFunction,
            >(trampoline::<T, I>)
        }),
        ml_flags: ffi::METH_VARARGS | ffi::METH_KEYWORDS,
        ml_doc: std::ptr::null(),
    };
    Box::leak(Box::new(def))
}

/// The default `__init__`, installed whenever a class builder does not call
/// `def_init` explicitly: always raises `TypeError: cannot create '<class>'
/// instances`, so a host-side factory (`HeapType::create`) is the only way
/// to build instances. Generic over the bound host type `T`
/// so the class's display name can be read back from the registry
/// rather than baked into a non-generic closure, which the
/// `PyCFunctionWithKeywords` ABI has no slot for.
pub fn no_init_def<T: 'static>() -> &'static ffi::PyMethodDef {
    unsafe extern "C" fn trampoline<T: 'static>(
        self_: *mut ffi::PyObject,
        _args: *mut ffi::PyObject,
        _kwargs: *mut ffi::PyObject,
    ) -> c_int {
        let _ = self_;
        translate(|| -> Result<(), Error> {
            let ht = crate::class_registry::find::<T>()?;
            let name = crate::object::typeobj::Type::expect(&ht.as_object())?.name()?;
            Err(raise_type_error(format!("cannot create '{}' instances", name)))
        });
        -1
    }
    let def = ffi::PyMethodDef {
        ml_name: c_string("__init__"),
        ml_meth: Some(unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(*mut ffi::PyObject, *mut ffi::PyObject, *mut ffi::PyObject) -> c_int,
                ffi::PyCFunction,
            >(trampoline::<T>)
        }),
        ml_flags: ffi::METH_VARARGS | ffi::METH_KEYWORDS,
        ml_doc: std::ptr::null(),
    };
    Box::leak(Box::new(def))
}

/// Build the destructor trampoline for a heap type `T`: decrements the
/// parent's refcount if configured, then runs the host destructor on the
/// embedded value (mirrors the initializer in reverse).
/// Installed as the type's `Py_tp_dealloc` slot by `class_registry::bind`.
pub extern "C" fn destructor_trampoline<T: 'static>(instance: *mut ffi::PyObject) {
    if let Ok(ht) = crate::class_registry::find::<T>() {
        unsafe { ht.destroy(instance) };
    } else {
        unsafe { ffi::PyObject_Free(instance as *mut c_void) };
    }
}

/// A host property getter/setter body bindable by the getter/setter
/// trampoline.
pub trait HostProperty<T> {
    fn get(instance: &T) -> Result<Object, Error>;
    fn set(_instance: &mut T, _value: &Object) -> Result<(), Error> {
        Err(raise_type_error("property is read-only"))
    }
}

/// Build and leak a `PyGetSetDef` for a property. If `P::set` is never
/// overridden, assignment raises through the translator: a property with
/// no setter is read-only.
pub fn getset_def<T: 'static, P: HostProperty<T>>(name: &'static str, has_setter: bool) -> &'static ffi::PyGetSetDef {
    unsafe extern "C" fn getter<T: 'static, P: HostProperty<T>>(
        self_: *mut ffi::PyObject,
        _closure: *mut c_void,
    ) -> *mut ffi::PyObject {
        match translate(|| {
            let ht = crate::class_registry::find::<T>()?;
            let instance = ht.value_of(self_);
            P::get(instance)
        }) {
            Some(object) => {
                let h = object.into_handle();
                h.incref();
                h.get()
            }
            None => std::ptr::null_mut(),
        }
    }

    unsafe extern "C" fn setter<T: 'static, P: HostProperty<T>>(
        self_: *mut ffi::PyObject,
        value: *mut ffi::PyObject,
        _closure: *mut c_void,
    ) -> c_int {
        let outcome: Option<()> = translate(|| {
            let ht = crate::class_registry::find::<T>()?;
            let instance = ht.value_of_mut(self_);
            let value = Object::from_handle(borrow(value));
            P::set(instance, &value)
        });
        if outcome.is_some() {
            0
        } else {
            -1
        }
    }

    let def = ffi::PyGetSetDef {
        name: c_string(name) as *mut c_char,
        get: Some(getter::<T, P>),
        set: if has_setter { Some(setter::<T, P>) } else { None },
        doc: std::ptr::null_mut(),
        closure: std::ptr::null_mut(),
    };
    Box::leak(Box::new(def))
}

#[cfg(test)]
mod tests {
    // Exercising these trampolines end-to-end requires a live interpreter
    // allocating real instances; see `pybind-runtime/tests/classes.rs` for
    // coverage of the init/method/property/destructor paths and
    // `pybind-runtime/tests/error_translation.rs` for the no-init
    // `TypeError` message.
}
