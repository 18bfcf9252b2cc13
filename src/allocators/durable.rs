//! Durable tier: a file-backed mapping carved into power-of-two blocks.
//!
//! The backing file is created unlinked inside the configured directory
//! (normally a DAX-mounted persistent-memory filesystem), sized to the
//! requested capacity and mapped shared. Ownership of an address is a range
//! check against the mapping, so no per-pointer bookkeeping is needed to
//! answer `identify`.
//!
//! Each block carries a 16-byte header with its size class; free blocks are
//! threaded onto per-class intrusive lists stored in the blocks themselves,
//! so the heap never allocates to manage itself.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use super::TierBackend;
use crate::api::error::TierError;
use crate::api::tier::Tier;
use crate::sync::mutex::Mutex;
use crate::util::layout::{align_down, ceil_log2};

/// Bytes in front of every block; keeps user pointers 16-byte aligned.
const HEADER_SIZE: usize = 16;

/// Smallest block is 32 bytes (16 header + 16 payload).
const MIN_CLASS: u32 = 5;

const NUM_CLASSES: usize = usize::BITS as usize;

const BLOCK_MAGIC: u32 = 0x7ea1_a10c;

#[repr(C)]
struct BlockHeader {
    class: u32,
    magic: u32,
    _reserved: u64,
}

struct RegionHeap {
    /// Offset of the first never-used byte of the mapping.
    bump: usize,
    /// Per-class free list heads (block start address, 0 = empty).
    free: [usize; NUM_CLASSES],
    blocks_in_use: usize,
    bytes_in_use: usize,
}

impl RegionHeap {
    const fn new() -> Self {
        Self {
            bump: 0,
            free: [0; NUM_CLASSES],
            blocks_in_use: 0,
            bytes_in_use: 0,
        }
    }
}

/// The persistent-memory tier.
pub struct DurableTier {
    base: *mut u8,
    len: usize,
    path: PathBuf,
    heap: Mutex<RegionHeap>,
    _file: File,
}

impl DurableTier {
    /// Map a backing file of `capacity` bytes in directory `dir`.
    ///
    /// A capacity of 0 uses all space the filesystem reports as available.
    /// The capacity is rounded down to whole pages.
    pub fn open(dir: &Path, capacity: usize) -> Result<Self, TierError> {
        let unavailable = |source: io::Error| TierError::DurableUnavailable {
            path: dir.to_path_buf(),
            source,
        };

        let requested = if capacity == 0 {
            let avail = available_bytes(dir).map_err(unavailable)?;
            usize::try_from(avail).unwrap_or(usize::MAX)
        } else {
            capacity
        };
        let len = align_down(requested, page_size());
        if len == 0 {
            return Err(TierError::ZeroCapacity {
                path: dir.to_path_buf(),
            });
        }

        let file = create_backing_file(dir).map_err(unavailable)?;
        file.set_len(len as u64).map_err(unavailable)?;

        // SAFETY: fresh shared mapping of a file we own, length checked above.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_NORESERVE,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(unavailable(io::Error::last_os_error()));
        }

        Ok(Self {
            base: base as *mut u8,
            len,
            path: dir.to_path_buf(),
            heap: Mutex::new(RegionHeap::new()),
            _file: file,
        })
    }

    /// Mapped bytes.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Directory holding the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live blocks.
    pub fn blocks_in_use(&self) -> usize {
        self.heap.lock().blocks_in_use
    }

    /// Bytes held by live blocks, headers and rounding included.
    pub fn bytes_in_use(&self) -> usize {
        self.heap.lock().bytes_in_use
    }

    /// Payload bytes available in the block behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live pointer returned by this tier.
    pub unsafe fn usable_size(&self, ptr: *const u8) -> usize {
        let header = &*(ptr.sub(HEADER_SIZE) as *const BlockHeader);
        debug_assert_eq!(header.magic, BLOCK_MAGIC);
        (1usize << header.class) - HEADER_SIZE
    }

    fn class_for(size: usize) -> Option<u32> {
        let total = size.checked_add(HEADER_SIZE)?;
        let class = ceil_log2(total)?.max(MIN_CLASS);
        (class < NUM_CLASSES as u32).then_some(class)
    }
}

impl TierBackend for DurableTier {
    fn tier(&self) -> Tier {
        Tier::Durable
    }

    fn allocate(&self, size: usize) -> *mut u8 {
        let Some(class) = Self::class_for(size) else {
            return ptr::null_mut();
        };
        let block = 1usize << class;

        let start = {
            let mut heap = self.heap.lock();
            let head = heap.free[class as usize];
            let start = if head != 0 {
                // SAFETY: free blocks store the next link right after their header.
                heap.free[class as usize] =
                    unsafe { ptr::read((head + HEADER_SIZE) as *const usize) };
                head
            } else {
                if block > self.len - heap.bump {
                    return ptr::null_mut();
                }
                let start = self.base as usize + heap.bump;
                heap.bump += block;
                start
            };
            heap.blocks_in_use += 1;
            heap.bytes_in_use += block;
            start
        };

        // SAFETY: `start..start + block` lies inside the mapping and is ours.
        unsafe {
            ptr::write(
                start as *mut BlockHeader,
                BlockHeader {
                    class,
                    magic: BLOCK_MAGIC,
                    _reserved: 0,
                },
            );
        }
        (start + HEADER_SIZE) as *mut u8
    }

    fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(size) else {
            return ptr::null_mut();
        };
        let p = self.allocate(total);
        if !p.is_null() {
            // SAFETY: the block holds at least `total` payload bytes.
            unsafe { p.write_bytes(0, total) };
        }
        p
    }

    unsafe fn resize(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        if size == 0 {
            self.release(ptr);
            return ptr::null_mut();
        }

        let usable = self.usable_size(ptr);
        if size <= usable {
            return ptr;
        }

        let new = self.allocate(size);
        if new.is_null() {
            // Old block stays valid, as with C realloc.
            return new;
        }
        ptr::copy_nonoverlapping(ptr, new, usable);
        self.release(ptr);
        new
    }

    unsafe fn release(&self, ptr: *mut u8) {
        let start = ptr.sub(HEADER_SIZE);
        let header = &*(start as *const BlockHeader);
        debug_assert_eq!(header.magic, BLOCK_MAGIC, "release of a foreign pointer");
        let class = header.class as usize;

        let mut heap = self.heap.lock();
        ptr::write(ptr as *mut usize, heap.free[class]);
        heap.free[class] = start as usize;
        heap.blocks_in_use -= 1;
        heap.bytes_in_use -= 1usize << class;
    }

    #[inline]
    fn owns(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let base = self.base as usize;
        addr >= base && addr < base + self.len
    }
}

impl Drop for DurableTier {
    fn drop(&mut self) {
        // SAFETY: `base`/`len` are exactly what mmap returned.
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
    }
}

impl std::fmt::Debug for DurableTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTier")
            .field("path", &self.path)
            .field("base", &self.base)
            .field("capacity", &self.len)
            .finish()
    }
}

// Safety: the mapping is only mutated through block ownership or under `heap`.
unsafe impl Send for DurableTier {}
unsafe impl Sync for DurableTier {}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page > 0 {
        page as usize
    } else {
        4096
    }
}

fn available_bytes(dir: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: statvfs is plain old data; zeroed is a valid initial value.
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: valid C string and out-pointer.
    if unsafe { libc::statvfs(c_path.as_ptr(), &mut st) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((st.f_bavail as u64).saturating_mul(st.f_frsize as u64))
}

/// Create an anonymous file in `dir`: `O_TMPFILE` where the filesystem
/// supports it, otherwise a uniquely named file that is unlinked right away.
fn create_backing_file(dir: &Path) -> io::Result<File> {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);

    #[cfg(target_os = "linux")]
    match OpenOptions::new()
        .read(true)
        .write(true)
        .mode(0o600)
        .custom_flags(libc::O_TMPFILE)
        .open(dir)
    {
        Ok(file) => return Ok(file),
        Err(e)
            if matches!(
                e.raw_os_error(),
                Some(libc::EOPNOTSUPP | libc::EISDIR | libc::EINVAL)
            ) => {}
        Err(e) => return Err(e),
    }

    let name = format!(
        ".tieralloc-{}-{}",
        std::process::id(),
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    );
    let path = dir.join(name);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&path)?;
    std::fs::remove_file(&path)?;
    Ok(file)
}
