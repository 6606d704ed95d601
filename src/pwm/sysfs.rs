// Copyright (c) 2017-2019 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::ffi::CString;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::mem;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};

/// Raw access to sysfs attribute files.
///
/// Implementations perform a single, complete read or write per call and
/// report failures verbatim. They don't retry, and they don't interpret the
/// contents.
pub trait Sysfs {
    /// Reads the raw contents of the attribute at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `data` to the attribute at `path`.
    ///
    /// The attribute must already exist. Writing never creates files.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Checks whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Gives udev time to hand a freshly exported channel's `paths` over to
    /// the `gpio` group. Returns whether access was granted in time.
    ///
    /// Backends without udev have nothing to wait for.
    fn wait_for_permissions(&self, _paths: &[PathBuf], _timeout: Duration) -> bool {
        true
    }
}

impl<S: Sysfs + ?Sized> Sysfs for &S {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write(path, data)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn wait_for_permissions(&self, paths: &[PathBuf], timeout: Duration) -> bool {
        (**self).wait_for_permissions(paths, timeout)
    }
}

/// `Sysfs` implementation backed by the real filesystem.
#[derive(Debug, Default, Copy, Clone)]
pub struct Filesystem;

impl Sysfs for Filesystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let contents = fs::read(path)?;
        trace!(
            "read {}: {:?}",
            path.display(),
            String::from_utf8_lossy(&contents).trim_end()
        );

        Ok(contents)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        trace!("write {}: {:?}", path.display(), String::from_utf8_lossy(data));

        // sysfs ignores truncation, but regular files used as stand-ins don't.
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)?
            .write_all(data)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Polls every 40ms until all `paths` are group-owned by `gpio` with mode
    /// `770`, or `timeout` has elapsed.
    ///
    /// Recent kernels let udev change the permissions of a freshly exported
    /// PWM channel, which allows members of the `gpio` group to use it
    /// without root access. Running as (effective) root skips the wait.
    fn wait_for_permissions(&self, paths: &[PathBuf], timeout: Duration) -> bool {
        if is_root() {
            return true;
        }

        let gid = gpio_gid().unwrap_or(0);
        let start = Instant::now();

        loop {
            if paths.iter().all(|path| has_group_access(path, gid)) {
                return true;
            }

            if start.elapsed() >= timeout {
                debug!(
                    "udev permissions not applied within {:?}, continuing anyway",
                    timeout
                );
                return false;
            }

            // This should normally be set within the first ~30ms.
            thread::sleep(Duration::from_millis(40));
        }
    }
}

fn is_root() -> bool {
    unsafe { libc::getuid() == 0 || libc::geteuid() == 0 }
}

fn gpio_gid() -> Option<u32> {
    let name = CString::new("gpio").ok()?;
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut res: *mut libc::group = ptr::null_mut();

    unsafe {
        let mut grp: libc::group = mem::zeroed();
        let ret = libc::getgrnam_r(
            name.as_ptr(),
            &mut grp,
            buf.as_mut_ptr(),
            buf.len(),
            &mut res,
        );

        if ret == 0 && !res.is_null() {
            Some(grp.gr_gid)
        } else {
            None
        }
    }
}

// Directories and regular files both need rwxrwx--- and the expected group
fn has_group_access(path: &Path, gid: u32) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => {
            let mode = metadata.permissions().mode();
            (mode == 0o040_770 || mode == 0o100_770) && metadata.gid() == gid
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("period");

        let err = Filesystem.write(&path, b"1000").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn write_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duty_cycle");
        fs::write(&path, "1000000\n").unwrap();

        Filesystem.write(&path, b"500").unwrap();

        assert_eq!(Filesystem.read(&path).unwrap(), b"500");
    }

    #[test]
    fn read_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = Filesystem.read(&dir.path().join("enable")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn permission_wait_gives_up_on_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = vec![dir.path().join("pwm0")];

        // Root always passes, everyone else times out on a missing path.
        assert_eq!(
            Filesystem.wait_for_permissions(&missing, Duration::from_millis(0)),
            is_root()
        );
        assert!(!Filesystem.exists(&missing[0]));
        assert!(Filesystem.exists(dir.path()));
    }
}
