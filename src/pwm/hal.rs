// Copyright (c) 2017-2021 Rene van der Meer
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

use super::{Channel, Sysfs};

#[cfg(feature = "embedded-hal-0")]
use log::debug;

#[cfg(feature = "embedded-hal")]
use super::Error;

#[cfg(feature = "embedded-hal")]
impl embedded_hal::pwm::Error for Error {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

/// `ErrorType` trait implementation for `embedded-hal` v1.0.0.
#[cfg(feature = "embedded-hal")]
impl<S: Sysfs> embedded_hal::pwm::ErrorType for Channel<S> {
    type Error = Error;
}

/// `SetDutyCycle` trait implementation for `embedded-hal` v1.0.0.
///
/// The duty cycle is scaled to the channel's currently configured period.
#[cfg(feature = "embedded-hal")]
impl<S: Sysfs> embedded_hal::pwm::SetDutyCycle for Channel<S> {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.set_duty_cycle_ratio(f64::from(duty) / f64::from(u16::MAX))
    }
}

/// `PwmPin` trait implementation for `embedded-hal` v0.2.7.
#[cfg(feature = "embedded-hal-0")]
impl<S: Sysfs> embedded_hal_0::PwmPin for Channel<S> {
    type Duty = f64;

    fn disable(&mut self) {
        if let Err(e) = Channel::enable(self, false) {
            debug!("pwm{}: disable failed: {}", self.index(), e);
        }
    }

    fn enable(&mut self) {
        if let Err(e) = Channel::enable(self, true) {
            debug!("pwm{}: enable failed: {}", self.index(), e);
        }
    }

    fn get_duty(&self) -> Self::Duty {
        self.duty_cycle_ratio().unwrap_or_else(|e| {
            debug!("pwm{}: reading duty cycle failed: {}", self.index(), e);
            0.0
        })
    }

    fn get_max_duty(&self) -> Self::Duty {
        1.0
    }

    fn set_duty(&mut self, duty: Self::Duty) {
        if let Err(e) = self.set_duty_cycle_ratio(duty) {
            debug!("pwm{}: setting duty cycle failed: {}", self.index(), e);
        }
    }
}
