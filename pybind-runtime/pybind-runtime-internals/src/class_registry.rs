//! The heap-type registry: one runtime heap type per host type `T`, keyed by
//! `T`'s `TypeId`. Rust's generic functions can't host a per-instantiation
//! `static` the way a template instantiation can, so the registry is
//! instead one process-wide map keyed by `TypeId`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Mutex, OnceLock};

use memoffset::offset_of;
use pyo3_ffi as ffi;

use crate::error::{raise_runtime_error, Error, ErrorException};
use crate::handle::{borrow, steal, Handle};
use crate::object::module::Module;
use crate::object::Object;

/// Instance memory layout for a host type `T` exposed to scripts:
/// `[runtime object header | host T]`. `#[repr(C)]` pins the header first so
/// `offset_of!(ClassData<T>, value)` matches what the runtime allocated.
#[repr(C)]
pub struct ClassData<T> {
    header: ffi::PyObject,
    pub value: T,
}

struct Entry {
    type_object: Handle,
    offset: usize,
    /// A `fn(&T) -> Object` parent accessor, erased to a bare pointer; cast
    /// back to the exact fn-pointer type in `create`/`destroy`, where `T` is
    /// known again from the caller's own generic parameter.
    parent_getter: Option<usize>,
}

// SAFETY: `Entry` is only ever read back through `HeapType<T>::type_id`-keyed
// lookups that reconstruct the exact `T` the entry was registered with, and
// all mutation happens under `registry()`'s mutex.
unsafe impl Send for Entry {}

fn registry() -> &'static Mutex<HashMap<TypeId, Entry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<TypeId, Entry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A bound heap type for host type `T`. Cheaply reconstructed from the
/// registry; all the state lives in the process-wide map.
pub struct HeapType<T> {
    type_object: Handle,
    offset: usize,
    parent_getter: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> HeapType<T> {
    pub fn type_ptr(&self) -> *mut ffi::PyTypeObject {
        self.type_object.get() as *mut ffi::PyTypeObject
    }

    pub fn as_object(&self) -> Object {
        Object::from_handle(self.type_object.clone())
    }

    fn parent_getter(&self) -> Option<fn(&T) -> Object> {
        self.parent_getter
            .map(|p| unsafe { std::mem::transmute::<usize, fn(&T) -> Object>(p) })
    }

    /// The configured parent of `value`, if this type was bound with a
    /// parent accessor. Used by the `__init__` trampoline to take the
    /// same incref it would have taken had the instance been built through
    /// [`HeapType::create`].
    pub fn parent_of(&self, value: &T) -> Option<Object> {
        self.parent_getter().map(|getter| getter(value))
    }

    /// Allocate and construct a new instance embedding `value`, incrementing
    /// the parent's refcount if this type has a parent accessor configured.
    pub fn create(&self, value: T) -> Object {
        unsafe {
            let raw = ffi::PyObject_Malloc(std::mem::size_of::<ClassData<T>>()) as *mut ClassData<T>;
            ffi::PyObject_Init(&mut (*raw).header, self.type_ptr());
            std::ptr::write(&mut (*raw).value, value);
            if let Some(getter) = self.parent_getter() {
                getter(&(*raw).value).handle().incref();
            }
            Object::from_handle(steal(raw as *mut ffi::PyObject))
        }
    }

    /// Drop the embedded value and decref the parent, then free the
    /// instance's storage. Called by the destructor trampoline once
    /// the instance's refcount reaches zero.
    ///
    /// # Safety
    /// `instance` must be a live instance of this heap type, about to be
    /// deallocated, and must not be touched again afterwards.
    pub unsafe fn destroy(&self, instance: *mut ffi::PyObject) {
        let raw = instance as *mut ClassData<T>;
        if let Some(getter) = self.parent_getter() {
            getter(&(*raw).value).handle().decref();
        }
        std::ptr::drop_in_place(&mut (*raw).value);
        ffi::PyObject_Free(instance as *mut std::os::raw::c_void);
    }

    /// Borrow the embedded host value from an instance pointer.
    ///
    /// # Safety
    /// `instance` must be a live instance of this heap type.
    pub unsafe fn value_of<'a>(&self, instance: *mut ffi::PyObject) -> &'a T {
        &(*(instance as *const ClassData<T>)).value
    }

    pub unsafe fn value_of_mut<'a>(&self, instance: *mut ffi::PyObject) -> &'a mut T {
        &mut (*(instance as *mut ClassData<T>)).value
    }

    /// Given a host `&T` embedded in an instance, recover the owning
    /// instance as a borrowed handle. This is how method trampolines let
    /// host code pass `self` back into scripts.
    pub fn instance_of(&self, value: &T) -> Object {
        let value_ptr = value as *const T as *const u8;
        let base = unsafe { value_ptr.sub(self.offset) } as *mut ffi::PyObject;
        Object::from_handle(borrow(base))
    }
}

/// Idempotent registration: the first call for a given `T` constructs the
/// heap type via the runtime's `PyType_FromSpec`; subsequent calls return
/// the cached entry. `destructor` becomes the type's `Py_tp_dealloc` slot.
pub fn bind<T: Any>(
    name: &str,
    module: &Module,
    destructor: unsafe extern "C" fn(*mut ffi::PyObject),
    parent_getter: Option<fn(&T) -> Object>,
) -> Result<HeapType<T>, Error> {
    let type_id = TypeId::of::<T>();
    {
        let map = registry().lock().expect("class registry poisoned");
        if let Some(entry) = map.get(&type_id) {
            return Ok(from_entry(entry));
        }
    }

    let module_name = module.name()?;
    let full_name = format!("{}.{}", module_name, name);
    let full_name_c = std::ffi::CString::new(full_name).unwrap_or_default();

    let mut slots = [
        ffi::PyType_Slot {
            slot: ffi::Py_tp_dealloc,
            pfunc: destructor as *mut std::os::raw::c_void,
        },
        ffi::PyType_Slot {
            slot: 0,
            pfunc: std::ptr::null_mut(),
        },
    ];
    let spec = ffi::PyType_Spec {
        name: full_name_c.as_ptr(),
        basicsize: std::mem::size_of::<ClassData<T>>() as std::os::raw::c_int,
        itemsize: 0,
        flags: (ffi::Py_TPFLAGS_DEFAULT | ffi::Py_TPFLAGS_HEAPTYPE) as std::os::raw::c_uint,
        slots: slots.as_mut_ptr(),
    };
    let type_ptr = unsafe { ffi::PyType_FromSpec(&spec as *const ffi::PyType_Spec as *mut ffi::PyType_Spec) };
    if type_ptr.is_null() {
        return Err(raise_runtime_error(ErrorException::capture().to_string()));
    }
    let type_object = steal(type_ptr);
    let offset = offset_of!(ClassData<T>, value);
    let parent_getter_erased = parent_getter.map(|f| f as usize);

    let mut map = registry().lock().expect("class registry poisoned");
    let entry = map.entry(type_id).or_insert(Entry {
        type_object: type_object.clone(),
        offset,
        parent_getter: parent_getter_erased,
    });
    Ok(from_entry(entry))
}

fn from_entry<T>(entry: &Entry) -> HeapType<T> {
    HeapType {
        type_object: entry.type_object.clone(),
        offset: entry.offset,
        parent_getter: entry.parent_getter,
        _marker: PhantomData,
    }
}

/// Look up an already-bound heap type; fails if `T` was never registered.
pub fn find<T: Any>() -> Result<HeapType<T>, Error> {
    let map = registry().lock().expect("class registry poisoned");
    map.get(&TypeId::of::<T>())
        .map(from_entry)
        .ok_or_else(|| raise_runtime_error("host type is not bound to any class"))
}
