//! POSIX shared memory: `shm_open`, `ftruncate`, `mmap`.

use std::ffi::CString;
use std::io;
use std::ptr::NonNull;
use std::thread;
use std::time::Duration;

use crate::pal::PalError;
use crate::segment::ObjectNamespace;

/// First delay of the open-side size poll.
const POLL_INITIAL: Duration = Duration::from_micros(100);

/// Ceiling the poll delay doubles up to.
const POLL_MAX: Duration = Duration::from_millis(10);

/// Total polling attempts before giving up.
///
/// The delay doubles from 100 µs to the 10 ms cap, so 100 attempts bound
/// the total wait at roughly one second.
const POLL_ATTEMPTS: u32 = 100;

/// An owned, mapped shared-memory view.
#[derive(Debug)]
pub(crate) struct RawMapping {
    base: NonNull<u8>,
    size: usize,
    fd: libc::c_int,
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
        // Destruction is infallible by contract: failures here leave
        // nothing the caller could do and are swallowed.
        // SAFETY: base/size describe a mapping we own and have not unmapped.
        unsafe {
            let _ = libc::munmap(self.base.as_ptr().cast(), self.size);
        }
        // SAFETY: the descriptor is owned and still open.
        unsafe {
            let _ = libc::close(self.fd);
        }
    }
}

/// Creates the named object exclusively, sizes it, and maps it read-write.
///
/// POSIX zero-fills the object when `ftruncate` grows it, so the mapped
/// range needs no explicit clearing.
pub(crate) fn create_exclusive(
    name: &str,
    size: usize,
    _namespace: ObjectNamespace,
) -> Result<RawMapping, PalError> {
    let c_name = to_c_name(name);

    // SAFETY: the name is a valid NUL-terminated C string; shm_open
    // performs no memory access beyond reading it.
    let fd = unsafe {
        libc::shm_open(
            c_name.as_ptr(),
            libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
            0o600 as libc::c_uint,
        )
    };

    if fd < 0 {
        let error = io::Error::last_os_error();
        return Err(if error.raw_os_error() == Some(libc::EEXIST) {
            PalError::AlreadyExists
        } else {
            PalError::Os {
                operation: "shm_open",
                source: error,
            }
        });
    }

    // SAFETY: the descriptor was just opened read-write.
    if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
        let error = PalError::os("ftruncate");
        cleanup_failed_create(fd, &c_name);
        return Err(error);
    }

    match map_shared(fd, size) {
        Ok(base) => Ok(RawMapping { base, size, fd }),
        Err(error) => {
            cleanup_failed_create(fd, &c_name);
            Err(error)
        }
    }
}

/// Opens and maps an existing named object, adopting its current size.
///
/// A peer may create the name and size it in two separate steps, so an
/// object observed at size zero is polled with bounded exponential backoff
/// (100 µs doubling to a 10 ms cap, [`POLL_ATTEMPTS`] attempts, roughly one
/// second in total) before giving up.
pub(crate) fn open_existing(
    name: &str,
    _namespace: ObjectNamespace,
) -> Result<RawMapping, PalError> {
    let c_name = to_c_name(name);

    // SAFETY: the name is a valid NUL-terminated C string.
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

    if fd < 0 {
        let error = io::Error::last_os_error();
        return Err(if error.raw_os_error() == Some(libc::ENOENT) {
            PalError::NotFound
        } else {
            PalError::Os {
                operation: "shm_open",
                source: error,
            }
        });
    }

    let size = match poll_size(fd) {
        Ok(size) => size,
        Err(error) => {
            // SAFETY: the descriptor is owned and still open.
            unsafe {
                let _ = libc::close(fd);
            }
            return Err(error);
        }
    };

    match map_shared(fd, size) {
        Ok(base) => Ok(RawMapping { base, size, fd }),
        Err(error) => {
            // SAFETY: the descriptor is owned and still open.
            unsafe {
                let _ = libc::close(fd);
            }
            Err(error)
        }
    }
}

/// Unlinks the name; success if it was already absent.
pub(crate) fn remove(name: &str) -> Result<(), PalError> {
    let c_name = to_c_name(name);

    // SAFETY: the name is a valid NUL-terminated C string.
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
        return Ok(());
    }

    let error = io::Error::last_os_error();
    if error.raw_os_error() == Some(libc::ENOENT) {
        Ok(())
    } else {
        Err(PalError::Os {
            operation: "shm_unlink",
            source: error,
        })
    }
}

/// POSIX takes the portable name verbatim; the namespace only matters on
/// Windows. The name was validated upstream, so it contains no NUL bytes.
fn to_c_name(name: &str) -> CString {
    CString::new(name).expect("validated names contain no NUL bytes")
}

fn query_size(fd: libc::c_int) -> Result<usize, PalError> {
    // SAFETY: an all-zero stat buffer is a valid out-parameter.
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };

    // SAFETY: the descriptor is open and the buffer is writable.
    if unsafe { libc::fstat(fd, &raw mut stat) } != 0 {
        return Err(PalError::os("fstat"));
    }

    Ok(stat.st_size as usize)
}

/// Waits for the object to be sized by its creator.
fn poll_size(fd: libc::c_int) -> Result<usize, PalError> {
    let mut delay = POLL_INITIAL;

    for attempt in 0..POLL_ATTEMPTS {
        let size = query_size(fd)?;
        if size > 0 {
            return Ok(size);
        }

        if attempt + 1 < POLL_ATTEMPTS {
            thread::sleep(delay);
            delay = (delay * 2).min(POLL_MAX);
        }
    }

    Err(PalError::SizeUnavailable)
}

fn map_shared(fd: libc::c_int, size: usize) -> Result<NonNull<u8>, PalError> {
    // SAFETY: the descriptor refers to a shared-memory object at least
    // `size` bytes long; a null hint lets the kernel pick the address.
    let base = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(PalError::os("mmap"));
    }

    advise(base, size);

    Ok(NonNull::new(base.cast::<u8>()).expect("mmap success is never null"))
}

/// Best-effort mapping advisories; failures are ignored.
#[cfg(target_os = "linux")]
fn advise(base: *mut libc::c_void, size: usize) {
    // Shared segments can be large and may hold sensitive payloads: keep
    // them out of core dumps and let the kernel back them with huge pages.
    // SAFETY: base/size describe the mapping established just above.
    unsafe {
        let _ = libc::madvise(base, size, libc::MADV_DONTDUMP);
        let _ = libc::madvise(base, size, libc::MADV_HUGEPAGE);
    }
}

#[cfg(not(target_os = "linux"))]
fn advise(_base: *mut libc::c_void, _size: usize) {}

/// Removes a half-created object so a failed create leaves no debris.
fn cleanup_failed_create(fd: libc::c_int, c_name: &std::ffi::CStr) {
    // SAFETY: the descriptor is owned and still open.
    unsafe {
        let _ = libc::close(fd);
    }
    // SAFETY: the name is a valid NUL-terminated C string.
    unsafe {
        let _ = libc::shm_unlink(c_name.as_ptr());
    }
}
