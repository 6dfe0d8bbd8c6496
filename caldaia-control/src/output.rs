//! embedded-hal output adapters
//!
//! Bridges between the core's infallible output traits and embedded-hal
//! pins. Actuator I/O is assumed infallible at this boundary; pin errors
//! are dropped rather than propagated into the control loop.

use caldaia_core::traits::{DutyOutput, HeaterOutput};
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

/// Carrier-frequency PWM output for the continuous strategy
///
/// Maps a duty percentage onto the pin's native duty range.
pub struct CarrierPwm<P> {
    pin: P,
    percent: f32,
}

impl<P: SetDutyCycle> CarrierPwm<P> {
    pub fn new(pin: P) -> Self {
        let mut output = Self { pin, percent: 0.0 };
        output.set_duty(0.0);
        output
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: SetDutyCycle> DutyOutput for CarrierPwm<P> {
    fn set_duty(&mut self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        self.percent = percent;
        let max = self.pin.max_duty_cycle();
        let ticks = (max as f32 * percent / 100.0 + 0.5) as u16;
        let _ = self.pin.set_duty_cycle(ticks.min(max));
    }

    fn duty(&self) -> f32 {
        self.percent
    }
}

/// Solid-state relay output for the slow-proportioning strategy
///
/// The SSR cannot modulate, so anything at or above half duty closes
/// it. The slow cycler only ever commands 0 or 100, which this maps to
/// clean off/on switching.
pub struct SsrOutput<P> {
    pin: P,
    percent: f32,
}

impl<P: OutputPin> SsrOutput<P> {
    pub fn new(pin: P) -> Self {
        let mut output = Self { pin, percent: 0.0 };
        output.set_duty(0.0);
        output
    }

    pub fn is_on(&self) -> bool {
        self.percent >= 50.0
    }
}

impl<P: OutputPin> DutyOutput for SsrOutput<P> {
    fn set_duty(&mut self, percent: f32) {
        self.percent = percent.clamp(0.0, 100.0);
        if self.is_on() {
            let _ = self.pin.set_high();
        } else {
            let _ = self.pin.set_low();
        }
    }

    fn duty(&self) -> f32 {
        self.percent
    }
}

/// Mechanical enable relay, switched only on heater state transitions
pub struct RelaySwitch<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> RelaySwitch<P> {
    pub fn new(pin: P) -> Self {
        let mut relay = Self { pin, on: false };
        relay.set_on(false);
        relay
    }
}

impl<P: OutputPin> HeaterOutput for RelaySwitch<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        if on {
            let _ = self.pin.set_high();
        } else {
            let _ = self.pin.set_low();
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// No-op relay for machines whose element is wired straight to the
/// modulated output
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRelay;

impl HeaterOutput for NoRelay {
    fn set_on(&mut self, _on: bool) {}

    fn is_on(&self) -> bool {
        false
    }
}
