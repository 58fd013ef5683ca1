//! Sector-aligned buffers for `PrjWriteFileData`.

use std::ffi::c_void;

use windows::Win32::Storage::ProjectedFileSystem::{
    PrjAllocateAlignedBuffer, PrjFreeAlignedBuffer, PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT,
};

/// Buffer from `PrjAllocateAlignedBuffer`, freed on drop.
pub struct AlignedBuffer {
    ptr: *mut c_void,
    len: usize,
}

impl AlignedBuffer {
    /// Allocate a buffer and copy `data` into it.
    ///
    /// # Arguments
    /// * `context` - Running virtualization instance
    /// * `data` - Bytes to copy
    ///
    /// # Returns
    /// None if ProjFS could not allocate.
    pub fn copy_from(context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT, data: &[u8]) -> Option<Self> {
        let ptr: *mut c_void = unsafe { PrjAllocateAlignedBuffer(context, data.len()) };
        if ptr.is_null() {
            return None;
        }

        let buffer = Self {
            ptr,
            len: data.len(),
        };
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), buffer.ptr as *mut u8, buffer.len);
        }
        Some(buffer)
    }

    /// Pointer handed to ProjFS.
    pub fn as_ptr(&self) -> *const c_void {
        self.ptr
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { PrjFreeAlignedBuffer(self.ptr) };
    }
}
