//! External collaborators the core explicitly does not own (§1, §4.3, §4.4).
//!
//! The original system resolved these through a platform-specific
//! trampoline and dynamic symbol lookup in a running process (§1:
//! "Non-goals"). This crate models them as traits so the executor's dispatch
//! and argument-marshaling logic can be exercised without a real platform
//! ABI — an in-process test double is provided for each.

use std::collections::HashMap;

/// `ALLOC`/`FREE`/`REALLOC` (§4.4, builtin ids 0-2).
///
/// Two concrete shapes matter, per §1.2's reading of Open Question 4
/// (`llshost_Cleanup`'s heap-ownership check): a VM that created its own heap
/// must destroy it; a VM that borrowed a host-provided heap must not. That
/// distinction is pushed to whichever `Allocator` the embedder constructs,
/// rather than encoded as a boolean the core has to get right.
pub trait Allocator {
    /// Allocate `size` bytes, returning `0` on failure (§4.4).
    fn alloc(&mut self, size: u64) -> u64;
    /// Free a previously allocated pointer.
    fn free(&mut self, ptr: u64);
    /// Resize a previously allocated pointer, returning `0` on failure.
    fn realloc(&mut self, ptr: u64, size: u64) -> u64;
}

/// `LOAD_LIBRARY`/`GET_PROC_ADDRESS` (§4.4, builtin ids 3-4).
pub trait LibraryLoader {
    /// Load a dynamic library by name, returning a nonzero handle, or `0`
    /// on failure.
    fn load_library(&mut self, name: &[u8]) -> u64;
    /// Resolve a symbol within a previously loaded library, returning a
    /// nonzero function pointer, or `0` on failure.
    fn get_proc_address(&mut self, handle: u64, name: &[u8]) -> u64;
}

/// The foreign-call bridge (§4.3). Implementations receive the marshaled
/// argument list and a flag for whether the callee returns a double, and
/// return the raw 64-bit scalar (a double's bit pattern, for float returns).
///
/// The bridge is explicitly out of scope for this crate (§1): a real
/// implementation is a platform-specific assembly trampoline. What *is* in
/// scope is walking the stack-resident parameter block into this call
/// (§4.3) — see [`super::foreign`].
pub trait ForeignTrampoline {
    /// Invoke `target`, passing `args` per the host ABI, and return the
    /// scalar result.
    fn invoke(&mut self, target: u64, args: &[ForeignArg], returns_float: bool) -> u64;
}

/// A single marshaled foreign-call argument (§4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForeignArg {
    /// `tag == 1`: a 64-bit integer argument.
    Integer(u64),
    /// `tag == 2` (or any non-`{0,1}` tag): a double argument.
    Float(f64),
}

/// The everything-the-core-needs-from-the-host bundle: an interpreter is
/// generic over one `HostEnv` rather than three separate type parameters,
/// mirroring the teacher's single `Interpreter<S>` storage parameter.
pub trait HostEnv: Allocator + LibraryLoader + ForeignTrampoline {}
impl<T: Allocator + LibraryLoader + ForeignTrampoline> HostEnv for T {}

/// A heap the VM owns and must tear down itself (§1.2, Open Question 4:
/// "if we own the heap we created, destroy it").
#[derive(Debug, Default)]
pub struct OwnedHeap {
    blocks: HashMap<u64, Vec<u8>>,
    next_handle: u64,
}

impl OwnedHeap {
    /// A fresh, empty heap.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            next_handle: 1,
        }
    }
}

impl Allocator for OwnedHeap {
    fn alloc(&mut self, size: u64) -> u64 {
        let Ok(size) = usize::try_from(size) else {
            return 0;
        };
        let handle = self.next_handle;
        self.next_handle += 1;
        self.blocks.insert(handle, vec![0u8; size]);
        handle
    }

    fn free(&mut self, ptr: u64) {
        self.blocks.remove(&ptr);
    }

    fn realloc(&mut self, ptr: u64, size: u64) -> u64 {
        let Ok(size) = usize::try_from(size) else {
            return 0;
        };
        match self.blocks.get_mut(&ptr) {
            Some(block) => {
                block.resize(size, 0);
                ptr
            }
            None => self.alloc(size as u64),
        }
    }
}

impl Drop for OwnedHeap {
    fn drop(&mut self) {
        // We created every block in `blocks`; nothing to borrow-and-leave-alone.
        self.blocks.clear();
    }
}

/// A heap borrowed from the host process: `FREE`/`REALLOC` act only on
/// handles this allocator itself produced, and dropping it never tears down
/// anything the host still owns (§1.2, Open Question 4: "if we borrowed the
/// process heap, don't [destroy it]").
#[derive(Debug, Default)]
pub struct BorrowedHeap {
    blocks: HashMap<u64, Vec<u8>>,
    next_handle: u64,
}

impl BorrowedHeap {
    /// Wrap a heap this VM instance does not own.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            next_handle: 1,
        }
    }
}

impl Allocator for BorrowedHeap {
    fn alloc(&mut self, size: u64) -> u64 {
        let Ok(size) = usize::try_from(size) else {
            return 0;
        };
        let handle = self.next_handle;
        self.next_handle += 1;
        self.blocks.insert(handle, vec![0u8; size]);
        handle
    }

    fn free(&mut self, ptr: u64) {
        self.blocks.remove(&ptr);
    }

    fn realloc(&mut self, ptr: u64, size: u64) -> u64 {
        let Ok(size) = usize::try_from(size) else {
            return 0;
        };
        match self.blocks.get_mut(&ptr) {
            Some(block) => {
                block.resize(size, 0);
                ptr
            }
            None => self.alloc(size as u64),
        }
    }
}

/// A library loader that always fails: dynamic library resolution is a
/// platform primitive outside this crate's scope (§1, §4.4).
#[derive(Debug, Default)]
pub struct StubLibraryLoader;

impl LibraryLoader for StubLibraryLoader {
    fn load_library(&mut self, _name: &[u8]) -> u64 {
        0
    }

    fn get_proc_address(&mut self, _handle: u64, _name: &[u8]) -> u64 {
        0
    }
}

/// An in-process trampoline backed by a name-indexed registry of Rust
/// closures, standing in for the real platform ABI thunk (§4.3, §1). Useful
/// for scripts that call back into host-provided functions in tests without
/// a real foreign-function boundary.
#[derive(Default)]
pub struct RegistryTrampoline {
    functions: HashMap<u64, Box<dyn FnMut(&[ForeignArg]) -> u64>>,
}

impl RegistryTrampoline {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function at `address`, callable from `CALL_EXTERNAL`
    /// once its address has been placed in the foreign-call parameter block.
    pub fn register(&mut self, address: u64, f: impl FnMut(&[ForeignArg]) -> u64 + 'static) {
        self.functions.insert(address, Box::new(f));
    }
}

impl ForeignTrampoline for RegistryTrampoline {
    fn invoke(&mut self, target: u64, args: &[ForeignArg], _returns_float: bool) -> u64 {
        match self.functions.get_mut(&target) {
            Some(f) => f(args),
            // Foreign-call failure is the script's concern (§7): the VM
            // cannot introspect why, so it just returns a zero scalar.
            None => 0,
        }
    }
}

/// A ready-to-use [`HostEnv`] combining an owned heap, a stub library
/// loader and an empty foreign-call registry — the default for `vm-exec`
/// and `vm-dbg` when the embedder doesn't need real foreign calls.
#[derive(Default)]
pub struct DefaultHost {
    pub heap: OwnedHeap,
    pub libs: StubLibraryLoader,
    pub foreign: RegistryTrampoline,
}

impl DefaultHost {
    /// A fresh default host environment.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Allocator for DefaultHost {
    fn alloc(&mut self, size: u64) -> u64 {
        self.heap.alloc(size)
    }
    fn free(&mut self, ptr: u64) {
        self.heap.free(ptr)
    }
    fn realloc(&mut self, ptr: u64, size: u64) -> u64 {
        self.heap.realloc(ptr, size)
    }
}

impl LibraryLoader for DefaultHost {
    fn load_library(&mut self, name: &[u8]) -> u64 {
        self.libs.load_library(name)
    }
    fn get_proc_address(&mut self, handle: u64, name: &[u8]) -> u64 {
        self.libs.get_proc_address(handle, name)
    }
}

impl ForeignTrampoline for DefaultHost {
    fn invoke(&mut self, target: u64, args: &[ForeignArg], returns_float: bool) -> u64 {
        self.foreign.invoke(target, args, returns_float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_heap_alloc_free_realloc_round_trip() {
        let mut heap = OwnedHeap::new();
        let ptr = heap.alloc(128);
        assert_ne!(ptr, 0);
        let grown = heap.realloc(ptr, 256);
        assert_eq!(grown, ptr);
        heap.free(ptr);
        // Freeing twice is harmless; matches "unspecified (zero recommended)".
        heap.free(ptr);
    }

    #[test]
    fn stub_library_loader_always_fails() {
        let mut libs = StubLibraryLoader;
        assert_eq!(libs.load_library(b"m.so\0"), 0);
        assert_eq!(libs.get_proc_address(1, b"f\0"), 0);
    }

    #[test]
    fn registry_trampoline_dispatches_by_address() {
        let mut t = RegistryTrampoline::new();
        t.register(0x1000, |args| match args {
            [ForeignArg::Integer(a), ForeignArg::Integer(b)] => a + b,
            _ => 0,
        });
        let result = t.invoke(0x1000, &[ForeignArg::Integer(2), ForeignArg::Integer(3)], false);
        assert_eq!(result, 5);
        assert_eq!(t.invoke(0xdead, &[], false), 0);
    }
}
