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

use std::path::{Path, PathBuf};
use std::time::Duration;

const SYSFS_PWM_CLASS: &str = "/sys/class/pwm";

// Time udev normally needs to apply its rules to a freshly exported channel
// is ~30ms. Give it some slack.
const DEFAULT_PERMISSION_WAIT: Duration = Duration::from_secs(1);

/// A PWM controller exposed through the sysfs PWM class.
///
/// `PwmChip` is a plain configuration value. It resolves the control and
/// attribute paths for the channels that live under its root directory, and
/// performs no I/O of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmChip {
    root: PathBuf,
    permission_wait: Option<Duration>,
}

impl PwmChip {
    /// Constructs a new `PwmChip` for `/sys/class/pwm/pwmchip<index>`.
    pub fn new(index: u32) -> PwmChip {
        PwmChip {
            root: Path::new(SYSFS_PWM_CLASS).join(format!("pwmchip{}", index)),
            permission_wait: Some(DEFAULT_PERMISSION_WAIT),
        }
    }

    /// Constructs a new `PwmChip` rooted at an arbitrary directory.
    ///
    /// The udev permission wait is disabled for custom roots. Use
    /// [`with_permission_wait`] to turn it back on.
    ///
    /// [`with_permission_wait`]: #method.with_permission_wait
    pub fn with_root<P: Into<PathBuf>>(root: P) -> PwmChip {
        PwmChip {
            root: root.into(),
            permission_wait: None,
        }
    }

    /// Sets how long [`Channel::export`] waits for udev to hand the exported
    /// channel's files over to the `gpio` group.
    ///
    /// `None` skips the wait. The wait is always skipped when running as root.
    ///
    /// [`Channel::export`]: struct.Channel.html#method.export
    pub fn with_permission_wait(mut self, wait: Option<Duration>) -> PwmChip {
        self.permission_wait = wait;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn permission_wait(&self) -> Option<Duration> {
        self.permission_wait
    }

    pub fn export_path(&self) -> PathBuf {
        self.root.join("export")
    }

    pub fn unexport_path(&self) -> PathBuf {
        self.root.join("unexport")
    }

    /// Returns the directory the kernel creates when `channel` is exported.
    pub fn channel_dir(&self, channel: u32) -> PathBuf {
        self.root.join(format!("pwm{}", channel))
    }

    pub fn enable_path(&self, channel: u32) -> PathBuf {
        self.channel_dir(channel).join("enable")
    }

    pub fn period_path(&self, channel: u32) -> PathBuf {
        self.channel_dir(channel).join("period")
    }

    /// The sysfs PWM interface specifies the duty cycle in nanoseconds, so
    /// this attribute actually holds the pulse width.
    pub fn duty_cycle_path(&self, channel: u32) -> PathBuf {
        self.channel_dir(channel).join("duty_cycle")
    }

    pub fn polarity_path(&self, channel: u32) -> PathBuf {
        self.channel_dir(channel).join("polarity")
    }
}

impl Default for PwmChip {
    fn default() -> PwmChip {
        PwmChip::new(0)
    }
}
