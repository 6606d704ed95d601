//! pwmchip provides access to a single output channel of a Linux PWM
//! controller through the `/sys/class/pwm` sysfs interface.
//!
//! Its main job is updating the period and duty cycle of a channel without
//! ever handing the kernel a duty cycle that's longer than the period, even
//! between the two separate attribute writes an update takes. See
//! [`pwm::Channel::set_period_and_duty_cycle`].
//!
//! The channel can be used in conjunction with a variety of platform-agnostic
//! drivers through its `embedded-hal` trait implementations. Both `embedded-hal`
//! v0.2.7 and v1.0.0 are supported, behind the `embedded-hal-0` and
//! `embedded-hal` feature flags respectively (or `hal` for both).
//!
//! The library logs through the [`log`] facade. Install a logger in your
//! application to see which attributes are written, and in what order.
//!
//! [`pwm::Channel::set_period_and_duty_cycle`]: pwm/struct.Channel.html#method.set_period_and_duty_cycle
//! [`log`]: https://docs.rs/log

pub mod pwm;
