//! Windows named file-mapping objects backed by the pagefile.

use std::ffi::c_void;
use std::ptr::NonNull;

use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, ERROR_FILE_NOT_FOUND, GetLastError, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_ALL_ACCESS, MEMORY_BASIC_INFORMATION,
    MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, PAGE_READWRITE, UnmapViewOfFile,
    VirtualQuery,
};
use windows::core::PCWSTR;

use crate::pal::PalError;
use crate::segment::ObjectNamespace;

/// An owned, mapped view of a named section.
#[derive(Debug)]
pub(crate) struct RawMapping {
    base: NonNull<u8>,
    size: usize,
    handle: HANDLE,
}

// SAFETY: the mapping is an exclusively owned OS resource; the bytes it
// exposes are only handed out as raw pointers.
unsafe impl Send for RawMapping {}

// SAFETY: no interior mutability; all fields are read-only after creation.
unsafe impl Sync for RawMapping {}

impl RawMapping {
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

impl Drop for RawMapping {
    fn drop(&mut self) {
        // Destruction is infallible by contract; errors are swallowed.
        let view = MEMORY_MAPPED_VIEW_ADDRESS {
            Value: self.base.as_ptr().cast::<c_void>(),
        };

        // SAFETY: the view was mapped by MapViewOfFile and not yet unmapped.
        unsafe {
            let _ = UnmapViewOfFile(view);
        }
        // SAFETY: the handle is owned and still open.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

/// Creates the named section exclusively, maps it, and zeroes the view.
///
/// Fresh pagefile-backed sections are zero-filled by the OS, but the zeroing
/// contract is applied explicitly so the behavior does not rest on that
/// detail.
pub(crate) fn create_exclusive(
    name: &str,
    size: usize,
    namespace: ObjectNamespace,
) -> Result<RawMapping, PalError> {
    let wide = wide_name(name, namespace);

    let (size_high, size_low) = split_size(size);

    // Passing no security attributes makes the handle non-inheritable,
    // which is what a memory-sharing handle should be: peers attach by
    // name, not by inherited handles.
    // SAFETY: the name buffer is NUL-terminated and outlives the call.
    let handle = unsafe {
        CreateFileMappingW(
            INVALID_HANDLE_VALUE,
            None,
            PAGE_READWRITE,
            size_high,
            size_low,
            PCWSTR(wide.as_ptr()),
        )
    }
    .map_err(|_| PalError::os("CreateFileMappingW"))?;

    // CreateFileMappingW succeeds on an existing section, signalling the
    // conflict only through the last-error slot.
    // SAFETY: querying the thread's last-error slot has no prerequisites.
    if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
        // SAFETY: the handle is owned and still open.
        unsafe {
            let _ = CloseHandle(handle);
        }
        return Err(PalError::AlreadyExists);
    }

    let base = match map_view(handle) {
        Ok(base) => base,
        Err(error) => {
            // SAFETY: the handle is owned and still open.
            unsafe {
                let _ = CloseHandle(handle);
            }
            return Err(error);
        }
    };

    // SAFETY: the view spans at least `size` writable bytes.
    unsafe {
        base.as_ptr().write_bytes(0, size);
    }

    Ok(RawMapping { base, size, handle })
}

/// Opens and maps an existing named section, adopting the size the OS
/// reports for the view.
///
/// Sections carry their size from creation, so there is no zero-size
/// window to poll for on this platform.
pub(crate) fn open_existing(
    name: &str,
    namespace: ObjectNamespace,
) -> Result<RawMapping, PalError> {
    let wide = wide_name(name, namespace);

    // SAFETY: the name buffer is NUL-terminated and outlives the call.
    let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS.0, false, PCWSTR(wide.as_ptr())) }
        .map_err(|error| {
            if error.code() == ERROR_FILE_NOT_FOUND.to_hresult() {
                PalError::NotFound
            } else {
                PalError::os("OpenFileMappingW")
            }
        })?;

    let base = match map_view(handle) {
        Ok(base) => base,
        Err(error) => {
            // SAFETY: the handle is owned and still open.
            unsafe {
                let _ = CloseHandle(handle);
            }
            return Err(error);
        }
    };

    let size = match region_size(base) {
        Ok(size) => size,
        Err(error) => {
            drop(RawMapping { base, size: 0, handle });
            return Err(error);
        }
    };

    Ok(RawMapping { base, size, handle })
}

/// Windows has no unlink for named sections: the name disappears with the
/// last handle. Removal is therefore a successful no-op.
pub(crate) fn remove(_name: &str) -> Result<(), PalError> {
    Ok(())
}

/// Translates the portable `/name` into a namespaced UTF-16 object name.
fn wide_name(name: &str, namespace: ObjectNamespace) -> Vec<u16> {
    let body = name.strip_prefix('/').unwrap_or(name);

    let prefix = match namespace {
        ObjectNamespace::SessionLocal => "Local\\",
        ObjectNamespace::Global => "Global\\",
    };

    prefix
        .encode_utf16()
        .chain(body.encode_utf16())
        .chain(std::iter::once(0))
        .collect()
}

fn split_size(size: usize) -> (u32, u32) {
    let size = size as u64;
    ((size >> 32) as u32, size as u32)
}

fn map_view(handle: HANDLE) -> Result<NonNull<u8>, PalError> {
    // SAFETY: the handle refers to a live section; zero offset and length
    // map the whole section.
    let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };

    NonNull::new(view.Value.cast::<u8>()).ok_or_else(|| PalError::os("MapViewOfFile"))
}

/// The committed size of the mapped view.
///
/// The region size VirtualQuery reports for the view is the documented,
/// supported way to recover what the creator sized the section to, and is
/// what this crate exposes.
fn region_size(base: NonNull<u8>) -> Result<usize, PalError> {
    let mut info = MEMORY_BASIC_INFORMATION::default();

    // SAFETY: the address points into a mapping we own and the buffer is a
    // correctly sized out-parameter.
    let written = unsafe {
        VirtualQuery(
            Some(base.as_ptr().cast::<c_void>()),
            &raw mut info,
            size_of::<MEMORY_BASIC_INFORMATION>(),
        )
    };

    if written == 0 {
        return Err(PalError::os("VirtualQuery"));
    }

    Ok(info.RegionSize)
}
