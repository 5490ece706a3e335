//! The segment object.

use std::fmt;
use std::ptr::NonNull;

use offset_ptr::SegmentTag;

use crate::error::Result;
use crate::pal::{self, PalError};
use crate::{Error, name};

/// How a [`Segment`] constructor treats an existing or absent name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Create the segment; fail with [`Error::AlreadyExists`] if the name
    /// is taken.
    CreateOnly,

    /// Open the segment; fail with [`Error::NotFound`] if the name is
    /// absent.
    OpenOnly,

    /// Create exclusively; if the name is already taken, open it instead.
    OpenOrCreate,
}

/// Which object namespace the name lands in.
///
/// Only meaningful on Windows; Unix-likes have a single shared-memory
/// namespace and ignore this setting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ObjectNamespace {
    /// `Local\` — visible within the current session.
    #[default]
    SessionLocal,

    /// `Global\` — visible across sessions; creating here typically
    /// requires elevated privilege.
    Global,
}

/// A named, OS-backed shared-memory region mapped into this process.
///
/// Construction maps the region read-write; see [`builder`][Self::builder]
/// or the [`create`][Self::create] / [`open`][Self::open] /
/// [`open_or_create`][Self::open_or_create] conveniences. An invalid
/// segment is unrepresentable: every constructor returns `Result`, and a
/// value you hold is always a live mapping.
///
/// Dropping unmaps and closes, swallowing errors; the *name* lives on until
/// [`remove`][Self::remove] (POSIX) or the last handle disappears
/// (Windows).
pub struct Segment {
    mapping: pal::RawMapping,
    name: String,
    created_here: bool,
}

/// Builder for [`Segment`], for the less common knobs.
///
/// ```rust,no_run
/// use shm_segment::{ObjectNamespace, OpenMode, Segment};
///
/// # fn main() -> Result<(), shm_segment::Error> {
/// let segment = Segment::builder("/telemetry")
///     .size(16 * 1024 * 1024)
///     .mode(OpenMode::OpenOrCreate)
///     .object_namespace(ObjectNamespace::SessionLocal)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SegmentBuilder {
    name: String,
    size: usize,
    mode: OpenMode,
    namespace: ObjectNamespace,
}

impl SegmentBuilder {
    /// Requested size in bytes.
    ///
    /// Required (non-zero) for the creating modes. For [`OpenMode::OpenOnly`]
    /// it is a minimum: zero adopts whatever exists, a non-zero value fails
    /// with [`Error::SizeConflict`] if the existing segment is smaller.
    /// An existing segment larger than the request is exposed at its full
    /// size.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// How to treat an existing or absent name. Default:
    /// [`OpenMode::OpenOrCreate`].
    #[must_use]
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Which object namespace to use on Windows. Default: session-local.
    #[must_use]
    pub fn object_namespace(mut self, namespace: ObjectNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Validates the request and maps the segment.
    pub fn build(self) -> Result<Segment> {
        name::validate(&self.name)?;

        match self.mode {
            OpenMode::CreateOnly => {
                self.require_size()?;
                let mapping = pal::create_exclusive(&self.name, self.size, self.namespace)
                    .map_err(|error| self.decorate(error))?;
                Ok(self.into_segment(mapping, true))
            }
            OpenMode::OpenOnly => {
                let mapping = pal::open_existing(&self.name, self.namespace)
                    .map_err(|error| self.decorate(error))?;
                self.check_size(mapping.size())?;
                Ok(self.into_segment(mapping, false))
            }
            OpenMode::OpenOrCreate => {
                self.require_size()?;
                match pal::create_exclusive(&self.name, self.size, self.namespace) {
                    Ok(mapping) => Ok(self.into_segment(mapping, true)),
                    Err(PalError::AlreadyExists) => {
                        let mapping = pal::open_existing(&self.name, self.namespace)
                            .map_err(|error| self.decorate(error))?;
                        self.check_size(mapping.size())?;
                        Ok(self.into_segment(mapping, false))
                    }
                    Err(error) => Err(self.decorate(error)),
                }
            }
        }
    }

    fn require_size(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidArgument {
                name: self.name.clone(),
                problem: "creating a segment requires a non-zero size",
            });
        }

        Ok(())
    }

    fn check_size(&self, existing: usize) -> Result<()> {
        if self.size != 0 && existing < self.size {
            return Err(Error::SizeConflict {
                name: self.name.clone(),
                existing,
                requested: self.size,
            });
        }

        Ok(())
    }

    fn into_segment(self, mapping: pal::RawMapping, created_here: bool) -> Segment {
        Segment {
            mapping,
            name: self.name,
            created_here,
        }
    }

    fn decorate(&self, error: PalError) -> Error {
        decorate(&self.name, error)
    }
}

fn decorate(name: &str, error: PalError) -> Error {
    match error {
        PalError::AlreadyExists => Error::AlreadyExists {
            name: name.to_string(),
        },
        PalError::NotFound => Error::NotFound {
            name: name.to_string(),
        },
        PalError::SizeUnavailable => Error::SizeUnavailable {
            name: name.to_string(),
        },
        PalError::Os { operation, source } => Error::OsFailure {
            operation,
            name: name.to_string(),
            source,
        },
    }
}

impl Segment {
    /// Starts building a segment under the given portable name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SegmentBuilder {
        SegmentBuilder {
            name: name.into(),
            size: 0,
            mode: OpenMode::OpenOrCreate,
            namespace: ObjectNamespace::default(),
        }
    }

    /// Creates a new segment of `size` bytes; fails if the name is taken.
    ///
    /// The mapped bytes are zeroed.
    pub fn create(name: impl Into<String>, size: usize) -> Result<Self> {
        Self::builder(name).size(size).mode(OpenMode::CreateOnly).build()
    }

    /// Opens an existing segment, adopting its size.
    ///
    /// If a peer created the name but has not sized it yet, the open polls
    /// briefly (bounded, about one second) for the size to appear.
    pub fn open(name: impl Into<String>) -> Result<Self> {
        Self::builder(name).mode(OpenMode::OpenOnly).build()
    }

    /// Opens the segment if it exists, creating it with `size` bytes
    /// otherwise.
    pub fn open_or_create(name: impl Into<String>, size: usize) -> Result<Self> {
        Self::builder(name).size(size).mode(OpenMode::OpenOrCreate).build()
    }

    /// The base address of this process's mapping.
    #[inline]
    #[must_use]
    pub fn base(&self) -> NonNull<u8> {
        self.mapping.base()
    }

    /// The mapped size in bytes.
    ///
    /// For opened segments this is the size the OS exposes, which may
    /// exceed the size passed to the constructor.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.mapping.size()
    }

    /// The portable name this segment was constructed with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle created the segment (as opposed to opening an
    /// existing one).
    #[must_use]
    pub fn created_here(&self) -> bool {
        self.created_here
    }

    /// Registers this mapping's base as the decode base for `Tag`.
    ///
    /// After binding, segment-anchored offset pointers stored in the region
    /// decode into this mapping. Must happen before any decode through the
    /// tag; rebinding while decodes are in flight on other threads yields
    /// stale-or-new bases per decode.
    pub fn bind<Tag: SegmentTag>(&self) {
        offset_ptr::bind::<Tag>(self.base().as_ptr());
    }

    /// Removes the name, so future opens fail and the underlying object
    /// disappears once the last mapping is gone.
    ///
    /// Idempotent: removing an absent name succeeds. On Windows this is a
    /// no-op, because a named section dies with its last handle.
    pub fn remove(name: impl AsRef<str>) -> Result<()> {
        let name = name.as_ref();
        name::validate(name)?;

        pal::remove(name).map_err(|error| decorate(name, error))
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("base", &self.base())
            .field("size", &self.size())
            .field("created_here", &self.created_here)
            .finish()
    }
}
