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

//! Interface for a single sysfs PWM channel.
//!
//! A [`Channel`] controls one output of a PWM controller through the
//! `/sys/class/pwm` sysfs interface. Period and duty cycle are specified in
//! nanoseconds, the controller's native unit.
//!
//! ## Period and duty cycle
//!
//! The kernel requires `duty_cycle <= period` at all times, and rejects any
//! write that would break that rule with `EINVAL`. Because period and duty
//! cycle live in two separate attribute files, there's no way to update both
//! at once. [`set_period_and_duty_cycle`] picks the write order that keeps
//! the output valid between the two writes.
//!
//! ## Using PWM without superuser privileges (`sudo`)
//!
//! As of kernel version 4.14.34, it's possible to allow non-root access to
//! PWM. The kernel lets udev change file permissions when a PWM channel is
//! exported, so any user that's a member of the `gpio` group can configure
//! PWM without having to use `sudo`. Append the following snippet to
//! `/etc/udev/rules.d/99-com.rules` if your distribution doesn't ship it.
//!
//! ```text
//! SUBSYSTEM=="pwm*", PROGRAM="/bin/sh -c '\
//!     chown -R root:gpio /sys/class/pwm && chmod -R 770 /sys/class/pwm;\
//!     chown -R root:gpio /sys/devices/platform/soc/*.pwm/pwm/pwmchip* &&\
//!     chmod -R 770 /sys/devices/platform/soc/*.pwm/pwm/pwmchip*\
//! '"
//! ```
//!
//! [`export`] waits for udev to apply these permissions, for as long as the
//! chip's [`permission_wait`] allows.
//!
//! ## Troubleshooting
//!
//! ### Permission denied
//!
//! If an operation returns an [`Error::Io`] with `io::ErrorKind::PermissionDenied`,
//! make sure `/sys/class/pwm` and all of its subdirectories are owned by
//! `root:gpio`, the current user is a member of the `gpio` group and udev is
//! configured as mentioned above.
//!
//! ### Not found
//!
//! An `io::ErrorKind::NotFound` error on anything other than [`export`] means
//! the channel hasn't been exported, or has been unexported since.
//!
//! [`Channel`]: struct.Channel.html
//! [`set_period_and_duty_cycle`]: struct.Channel.html#method.set_period_and_duty_cycle
//! [`export`]: struct.Channel.html#method.export
//! [`permission_wait`]: struct.PwmChip.html#method.with_permission_wait
//! [`Error::Io`]: enum.Error.html#variant.Io

use std::error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::result;

use log::debug;

mod chip;
#[cfg(any(feature = "embedded-hal", feature = "embedded-hal-0"))]
mod hal;
mod sysfs;

pub use self::chip::PwmChip;
pub use self::sysfs::{Filesystem, Sysfs};

/// Errors that can occur when accessing a PWM channel.
#[derive(Debug)]
pub enum Error {
    /// The requested duty cycle is longer than the requested period.
    ///
    /// Detected before any attribute is touched.
    DutyCycleExceedsPeriod { period: u64, duty_cycle: u64 },
    /// Reading or writing a sysfs attribute failed.
    Io { path: PathBuf, source: io::Error },
    /// A sysfs attribute contained an unexpected value.
    Parse { path: PathBuf, value: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::DutyCycleExceedsPeriod { period, duty_cycle } => write!(
                f,
                "Duty cycle can't be longer than the period: {} > {}",
                duty_cycle, period
            ),
            Error::Io {
                ref path,
                ref source,
            } => write!(f, "IO error on {}: {}", path.display(), source),
            Error::Parse {
                ref path,
                ref value,
            } => write!(f, "Invalid value in {}: {:?}", path.display(), value),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io { ref source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type returned from methods that can have `pwm::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Output polarities.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Polarity {
    Normal,
    Inverse,
}

/// Provides access to a single PWM channel.
///
/// `Channel` is a thin handle. It only stores the chip configuration and the
/// channel index, and reads every value straight from sysfs, so the kernel
/// driver stays the single source of truth.
///
/// Constructing a `Channel` doesn't touch the filesystem. Call [`export`]
/// before using any of the other methods, and [`unexport`] when you're done.
/// Dropping a `Channel` leaves the kernel state as it is.
///
/// ## Concurrency
///
/// There's no internal locking. [`set_period_and_duty_cycle`] reads the
/// current duty cycle and then performs two separate writes, which isn't
/// atomic as a whole. Handles for the same channel index must not be used
/// from multiple threads (or processes) at the same time. Either keep a single
/// owner per channel, or guard all access to it with a `Mutex`.
///
/// [`export`]: #method.export
/// [`unexport`]: #method.unexport
/// [`set_period_and_duty_cycle`]: #method.set_period_and_duty_cycle
#[derive(Debug, Clone)]
pub struct Channel<S = Filesystem> {
    chip: PwmChip,
    index: u32,
    sysfs: S,
}

impl Channel<Filesystem> {
    /// Constructs a new `Channel` for channel `index` on `chip`.
    pub fn new(chip: PwmChip, index: u32) -> Channel<Filesystem> {
        Channel::with_sysfs(chip, index, Filesystem)
    }
}

impl<S: Sysfs> Channel<S> {
    /// Constructs a new `Channel` that accesses its attributes through `sysfs`.
    pub fn with_sysfs(chip: PwmChip, index: u32, sysfs: S) -> Channel<S> {
        Channel { chip, index, sysfs }
    }

    /// Returns the channel index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the chip this channel belongs to.
    pub fn chip(&self) -> &PwmChip {
        &self.chip
    }

    /// Exports the channel, which makes the kernel create its attribute files.
    ///
    /// Depending on the driver, exporting a channel that's already exported
    /// fails with `EBUSY`.
    pub fn export(&self) -> Result<()> {
        debug!("exporting pwm{} on {}", self.index, self.chip.root().display());

        self.write_value(self.chip.export_path(), self.index)?;

        if let Some(timeout) = self.chip.permission_wait() {
            let paths = [
                self.chip.channel_dir(self.index),
                self.chip.period_path(self.index),
                self.chip.duty_cycle_path(self.index),
                self.chip.polarity_path(self.index),
                self.chip.enable_path(self.index),
            ];

            self.sysfs.wait_for_permissions(&paths, timeout);
        }

        Ok(())
    }

    /// Unexports the channel, which removes its attribute files.
    pub fn unexport(&self) -> Result<()> {
        debug!("unexporting pwm{} on {}", self.index, self.chip.root().display());

        self.write_value(self.chip.unexport_path(), self.index)
    }

    /// Checks whether the channel is currently exported.
    pub fn is_exported(&self) -> bool {
        self.sysfs.exists(&self.chip.channel_dir(self.index))
    }

    /// Enables or disables the output.
    ///
    /// Most drivers refuse to enable a channel before a period has been set.
    pub fn enable(&self, enabled: bool) -> Result<()> {
        debug!(
            "{} pwm{}",
            if enabled { "enabling" } else { "disabling" },
            self.index
        );

        self.write_value(self.chip.enable_path(self.index), enabled as u8)
    }

    /// Checks whether the output is currently enabled.
    pub fn is_enabled(&self) -> Result<bool> {
        let path = self.chip.enable_path(self.index);
        let contents = self.read_attribute(&path)?;

        match contents.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            value => Err(Error::Parse {
                path,
                value: value.to_owned(),
            }),
        }
    }

    /// Returns the configured period in nanoseconds.
    pub fn current_period(&self) -> Result<u64> {
        self.read_u64(self.chip.period_path(self.index))
    }

    /// Returns the configured duty cycle (the active pulse width) in nanoseconds.
    pub fn current_duty_cycle(&self) -> Result<u64> {
        self.read_u64(self.chip.duty_cycle_path(self.index))
    }

    /// Sets the period and duty cycle, both in nanoseconds.
    ///
    /// The kernel only accepts values where `duty_cycle <= period`, so the
    /// two attributes are written in whichever order keeps that true after
    /// the first write:
    ///
    /// * If the new period is at least as long as the current duty cycle,
    ///   the period is written first. The current duty cycle still fits, and
    ///   the new duty cycle fits the new period.
    /// * Otherwise the duty cycle is written first. The current period was
    ///   at least as long as the current duty cycle, which is longer than the
    ///   new period, which in turn is at least as long as the new duty cycle.
    ///   So the new duty cycle fits the current period.
    ///
    /// Only the current duty cycle is read. This relies on nothing else
    /// changing the channel's period or duty cycle in between.
    ///
    /// Fails with [`Error::DutyCycleExceedsPeriod`] without touching any
    /// attribute if `duty_cycle > period`. If the first write fails, the
    /// second one isn't attempted. If the second write fails, the first one
    /// isn't rolled back.
    ///
    /// [`Error::DutyCycleExceedsPeriod`]: enum.Error.html#variant.DutyCycleExceedsPeriod
    pub fn set_period_and_duty_cycle(&self, period: u64, duty_cycle: u64) -> Result<()> {
        if duty_cycle > period {
            return Err(Error::DutyCycleExceedsPeriod { period, duty_cycle });
        }

        let current_duty_cycle = self.current_duty_cycle()?;

        if period >= current_duty_cycle {
            debug!(
                "pwm{}: period {} before duty cycle {} (current duty cycle {})",
                self.index, period, duty_cycle, current_duty_cycle
            );

            self.write_value(self.chip.period_path(self.index), period)?;
            self.write_value(self.chip.duty_cycle_path(self.index), duty_cycle)
        } else {
            debug!(
                "pwm{}: duty cycle {} before period {} (current duty cycle {})",
                self.index, duty_cycle, period, current_duty_cycle
            );

            self.write_value(self.chip.duty_cycle_path(self.index), duty_cycle)?;
            self.write_value(self.chip.period_path(self.index), period)
        }
    }

    /// Returns the duty cycle as a floating point ratio between `0.0` (0%)
    /// and `1.0` (100%) of the configured period.
    ///
    /// A period of 0 results in a ratio of `0.0`.
    pub fn duty_cycle_ratio(&self) -> Result<f64> {
        let period = self.current_period()?;
        let duty_cycle = self.current_duty_cycle()?;

        if period == 0 {
            return Ok(0.0);
        }

        Ok((duty_cycle as f64 / period as f64).max(0.0).min(1.0))
    }

    /// Sets the duty cycle as a floating point ratio between `0.0` (0%) and
    /// `1.0` (100%) of the configured period.
    ///
    /// Values outside that range are clamped. Only the duty cycle attribute
    /// is written, and the result never exceeds the current period.
    pub fn set_duty_cycle_ratio(&self, ratio: f64) -> Result<()> {
        let period = self.current_period()?;
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.max(0.0).min(1.0)
        };
        let duty_cycle = ((period as f64 * ratio).round() as u64).min(period);

        self.write_value(self.chip.duty_cycle_path(self.index), duty_cycle)
    }

    /// Returns the configured polarity.
    pub fn polarity(&self) -> Result<Polarity> {
        let path = self.chip.polarity_path(self.index);
        let contents = self.read_attribute(&path)?;

        match contents.as_str() {
            "normal" => Ok(Polarity::Normal),
            "inversed" => Ok(Polarity::Inverse),
            value => Err(Error::Parse {
                path,
                value: value.to_owned(),
            }),
        }
    }

    /// Sets the polarity.
    ///
    /// Most drivers only allow changing the polarity while the output is
    /// disabled.
    pub fn set_polarity(&self, polarity: Polarity) -> Result<()> {
        let value = match polarity {
            Polarity::Normal => "normal",
            Polarity::Inverse => "inversed",
        };

        self.write_value(self.chip.polarity_path(self.index), value)
    }

    // Returns the attribute's contents without the trailing newline
    fn read_attribute(&self, path: &Path) -> Result<String> {
        let contents = self.sysfs.read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match String::from_utf8(contents) {
            Ok(mut value) => {
                value.truncate(value.trim_end().len());
                Ok(value)
            }
            Err(err) => Err(Error::Parse {
                path: path.to_path_buf(),
                value: String::from_utf8_lossy(err.as_bytes()).trim_end().to_owned(),
            }),
        }
    }

    fn read_u64(&self, path: PathBuf) -> Result<u64> {
        let value = self.read_attribute(&path)?;

        value.parse().map_err(|_| Error::Parse { path, value })
    }

    fn write_value<T: fmt::Display>(&self, path: PathBuf, value: T) -> Result<()> {
        self.sysfs
            .write(&path, value.to_string().as_bytes())
            .map_err(|source| Error::Io { path, source })
    }
}
