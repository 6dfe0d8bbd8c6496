//! Per-tick control loop orchestrator
//!
//! Owns the sensor, outputs and every control component. One call to
//! [`BoilerController::tick`] per control period (100 ms in the
//! reference wiring) performs: read temperature, record history, run
//! safety supervision, then regulation or the autotune experiment,
//! then actuation. Nothing here blocks; slow PWM and the relay
//! experiment advance tick by tick, so safety checks are never starved.

use caldaia_core::config::{BoilerConfig, PidGains};
use caldaia_core::safety::{
    SafetyStatus, SafetySupervisor, SampleWindow, Stability, TripReason,
};
use caldaia_core::state::HeaterState;
use caldaia_core::traits::{DutyOutput, HeaterOutput, TemperatureSensor};

use crate::autotune::{AutotuneConfig, AutotuneResult, AutotuneState, RelayAutotuner};
use crate::duty::DutyCycler;
use crate::pid::PidController;

/// Read-only status snapshot for the display adapter
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoilerStatus {
    pub state: HeaterState,
    /// Duty commanded on the most recent tick
    pub duty_percent: f32,
    /// Most recent valid primary reading
    pub temperature_c: Option<f32>,
    pub setpoint_c: f32,
    pub stability: Stability,
    /// Why the supervisor last forced the heater off, if it did
    pub trip: Option<TripReason>,
    pub autotune: AutotuneState,
}

/// Closed-loop boiler temperature controller
///
/// Generic over the primary sensor `S`, the modulated output `D` and
/// the enable relay `R` (use [`crate::output::NoRelay`] when the
/// machine has none).
pub struct BoilerController<S, D, R> {
    sensor: S,
    output: D,
    relay: R,
    config: BoilerConfig,
    pid: PidController,
    cycler: DutyCycler,
    window: SampleWindow,
    supervisor: SafetySupervisor,
    tuner: RelayAutotuner,
    state: HeaterState,
    last_trip: Option<TripReason>,
    last_temp_c: Option<f32>,
    aux_temp_c: Option<f32>,
    last_duty: f32,
}

impl<S, D, R> BoilerController<S, D, R>
where
    S: TemperatureSensor,
    D: DutyOutput,
    R: HeaterOutput,
{
    /// Create a controller in the Disabled state
    ///
    /// The boot setpoint is the brew preset; the menu or buttons change
    /// it afterwards.
    pub fn new(sensor: S, output: D, relay: R, config: BoilerConfig) -> Self {
        let mut pid = PidController::new(config.gains);
        pid.set_setpoint(config.clamp_setpoint(config.preset_low_c));
        Self {
            sensor,
            output,
            relay,
            pid,
            cycler: DutyCycler::new(config.actuator),
            window: SampleWindow::new(),
            supervisor: SafetySupervisor::new(config.safety),
            tuner: RelayAutotuner::new(AutotuneConfig::default()),
            state: HeaterState::Disabled,
            last_trip: None,
            last_temp_c: None,
            aux_temp_c: None,
            last_duty: 0.0,
            config,
        }
    }

    /// Run one control tick
    pub fn tick(&mut self, now_ms: u64) {
        let temp = match self.sensor.read_celsius() {
            Ok(t) => {
                self.last_temp_c = Some(t);
                self.window.record(now_ms, t);
                Some(t)
            }
            Err(_) => {
                // An unreadable probe while heating is treated exactly
                // like a bounds breach
                if self.state.is_enabled() {
                    self.trip(TripReason::SensorFault);
                }
                None
            }
        };

        if let (HeaterState::Enabled { since_ms }, Some(t)) = (self.state, temp) {
            let verdict =
                self.supervisor
                    .check(now_ms, t, &self.window, since_ms, self.aux_temp_c);
            if let SafetyStatus::Trip(reason) = verdict {
                self.trip(reason);
            }
        }

        let duty = if self.state.is_enabled() {
            if self.tuner.is_running() {
                match temp.and_then(|t| self.tuner.tick(now_ms, t)) {
                    Some(level) => level,
                    None => {
                        // Experiment closed this tick; regulation resumes
                        // next tick from a clean controller state
                        self.pid.reset();
                        0.0
                    }
                }
            } else {
                match temp.and_then(|t| self.pid.update(now_ms, t)) {
                    Some(duty) => duty,
                    // Stale tick: keep the previous command
                    None => self.last_duty,
                }
            }
        } else {
            0.0
        };

        self.last_duty = duty;
        self.cycler.apply(now_ms, duty, &mut self.output);
    }

    /// Enable the heater; no-op if already enabled
    ///
    /// Closes the relay, clears any recorded trip and explicitly resets
    /// the PID state so nothing accumulated before the disable period
    /// leaks into the new session.
    pub fn request_enable(&mut self, now_ms: u64) {
        if self.state.is_enabled() {
            return;
        }
        self.last_trip = None;
        self.pid.reset();
        self.state = HeaterState::Enabled { since_ms: now_ms };
        self.relay.set_on(true);
    }

    /// Disable the heater and force the output off; idempotent
    pub fn request_disable(&mut self) {
        self.last_trip = None;
        self.force_off();
    }

    /// Supervisor-driven disable; records the reason for the display
    fn trip(&mut self, reason: TripReason) {
        self.last_trip = Some(reason);
        self.force_off();
    }

    fn force_off(&mut self) {
        self.tuner.cancel();
        self.state = HeaterState::Disabled;
        self.relay.set_on(false);
        self.cycler.reset_with(&mut self.output);
        self.last_duty = 0.0;
    }

    /// Change the target temperature, clamped to the configured range
    pub fn set_setpoint(&mut self, target_c: f32) {
        self.pid.set_setpoint(self.config.clamp_setpoint(target_c));
    }

    pub fn setpoint(&self) -> f32 {
        self.pid.setpoint()
    }

    /// Replace the PID gains; rejects non-finite values
    pub fn set_gains(&mut self, gains: PidGains) -> bool {
        if !gains.is_finite() {
            return false;
        }
        self.config.gains = gains;
        self.pid.set_gains(gains);
        true
    }

    /// Replace the whole configuration atomically
    ///
    /// Invalid configs are rejected and the previous one stays active.
    /// A running slow-PWM cycle is abandoned; the setpoint is re-clamped
    /// to the new temperature range.
    pub fn apply_config(&mut self, config: BoilerConfig) -> bool {
        if !config.is_valid() {
            return false;
        }
        self.config = config;
        self.pid.set_gains(config.gains);
        self.supervisor.set_policy(config.safety);
        self.cycler.set_config(config.actuator);
        let setpoint = self.pid.setpoint();
        self.pid.set_setpoint(config.clamp_setpoint(setpoint));
        true
    }

    pub fn config(&self) -> &BoilerConfig {
        &self.config
    }

    /// Latest auxiliary probe reading, reported by the sensor adapter
    pub fn report_aux_temperature(&mut self, temp_c: f32) {
        self.aux_temp_c = Some(temp_c);
    }

    /// Start a relay-feedback autotune run with the default experiment
    ///
    /// Enables the heater first if necessary.
    pub fn start_autotune(&mut self, now_ms: u64) {
        self.start_autotune_with(now_ms, AutotuneConfig::default());
    }

    /// Start an autotune run with an explicit experiment configuration
    pub fn start_autotune_with(&mut self, now_ms: u64, config: AutotuneConfig) {
        if !self.state.is_enabled() {
            self.request_enable(now_ms);
        }
        self.tuner = RelayAutotuner::new(config);
        self.tuner.start(now_ms);
    }

    /// Abort a running experiment; gains stay untouched
    pub fn cancel_autotune(&mut self) {
        self.tuner.cancel();
    }

    pub fn autotune_state(&self) -> AutotuneState {
        self.tuner.state()
    }

    /// Result of the last completed run, awaiting confirmation
    pub fn last_autotune(&self) -> Option<&AutotuneResult> {
        self.tuner.result()
    }

    /// Commit the last autotune result into the live gains
    ///
    /// Returns the committed gains so the caller can hand them to the
    /// persistence collaborator; `None` if no completed result exists.
    pub fn commit_autotune(&mut self) -> Option<PidGains> {
        let gains = self.tuner.result()?.gains;
        self.config.gains = gains;
        self.pid.set_gains(gains);
        Some(gains)
    }

    /// Read-only snapshot for display rendering
    pub fn status(&self) -> BoilerStatus {
        BoilerStatus {
            state: self.state,
            duty_percent: self.last_duty,
            temperature_c: self.last_temp_c,
            setpoint_c: self.pid.setpoint(),
            stability: self.window.stability(),
            trip: self.last_trip,
            autotune: self.tuner.state(),
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn output(&self) -> &D {
        &self.output
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autotune::AutotuneError;
    use caldaia_core::config::{ActuatorConfig, PwmStrategy, SafetyPolicy};
    use caldaia_core::traits::SensorError;

    const TICK_MS: u64 = 100;

    /// Sensor returning a fixed reading forever
    struct FixedSensor(f32);

    impl TemperatureSensor for FixedSensor {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            Ok(self.0)
        }
    }

    /// Sensor playing a script, repeating the last entry
    struct ScriptSensor {
        script: Vec<Result<f32, SensorError>>,
        index: usize,
    }

    impl ScriptSensor {
        fn new(script: Vec<Result<f32, SensorError>>) -> Self {
            Self { script, index: 0 }
        }
    }

    impl TemperatureSensor for ScriptSensor {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            let reading = self.script[self.index.min(self.script.len() - 1)];
            self.index += 1;
            reading
        }
    }

    #[derive(Default)]
    struct MockOutput {
        duty: f32,
    }

    impl DutyOutput for MockOutput {
        fn set_duty(&mut self, percent: f32) {
            self.duty = percent;
        }

        fn duty(&self) -> f32 {
            self.duty
        }
    }

    #[derive(Default)]
    struct MockRelay {
        on: bool,
    }

    impl HeaterOutput for MockRelay {
        fn set_on(&mut self, on: bool) {
            self.on = on;
        }

        fn is_on(&self) -> bool {
            self.on
        }
    }

    fn continuous_config() -> BoilerConfig {
        BoilerConfig {
            actuator: ActuatorConfig {
                strategy: PwmStrategy::Continuous,
                ..ActuatorConfig::default()
            },
            ..BoilerConfig::factory()
        }
    }

    fn p_only_controller(
        kp: f32,
        sensor_c: f32,
    ) -> BoilerController<FixedSensor, MockOutput, MockRelay> {
        let mut config = continuous_config();
        config.gains = PidGains {
            kp,
            ki: 0.0,
            kd: 0.0,
        };
        BoilerController::new(
            FixedSensor(sensor_c),
            MockOutput::default(),
            MockRelay::default(),
            config,
        )
    }

    #[test]
    fn test_first_update_proportional_output() {
        let mut boiler = p_only_controller(2.0, 50.0);
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);
        boiler.tick(0);

        let status = boiler.status();
        assert_eq!(status.duty_percent, 20.0);
        assert_eq!(boiler.output().duty(), 20.0);
        assert!(status.state.is_enabled());
    }

    #[test]
    fn test_disabled_drives_zero_duty() {
        let mut boiler = p_only_controller(2.0, 50.0);
        boiler.set_setpoint(60.0);
        boiler.tick(0);
        boiler.tick(TICK_MS);

        assert_eq!(boiler.output().duty(), 0.0);
        assert!(!boiler.relay().is_on());
        // History still accumulates while disabled
        assert_eq!(boiler.status().temperature_c, Some(50.0));
    }

    #[test]
    fn test_below_minimum_disables_within_one_tick() {
        let mut boiler = p_only_controller(2.0, 15.0);
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);
        assert!(boiler.relay().is_on());

        boiler.tick(0);

        let status = boiler.status();
        assert!(!status.state.is_enabled());
        assert_eq!(status.duty_percent, 0.0);
        assert_eq!(status.trip, Some(TripReason::BelowMinimum));
        assert_eq!(boiler.output().duty(), 0.0);
        assert!(!boiler.relay().is_on());
    }

    #[test]
    fn test_disable_is_idempotent() {
        let mut boiler = p_only_controller(2.0, 15.0);
        boiler.request_enable(0);
        boiler.tick(0);
        assert!(!boiler.status().state.is_enabled());
        boiler.request_disable();
        boiler.request_disable();
        assert!(!boiler.status().state.is_enabled());
        assert_eq!(boiler.output().duty(), 0.0);
    }

    #[test]
    fn test_inactivity_timeout() {
        let mut config = continuous_config();
        config.safety = SafetyPolicy {
            timeout_min: 1,
            ..SafetyPolicy::default()
        };
        let mut boiler = BoilerController::new(
            FixedSensor(60.0),
            MockOutput::default(),
            MockRelay::default(),
            config,
        );
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);

        boiler.tick(59_000);
        assert!(boiler.status().state.is_enabled());

        boiler.tick(61_000);
        let status = boiler.status();
        assert!(!status.state.is_enabled());
        assert_eq!(status.trip, Some(TripReason::InactivityTimeout));
    }

    #[test]
    fn test_reenable_resets_timeout_clock() {
        let mut config = continuous_config();
        config.safety = SafetyPolicy {
            timeout_min: 1,
            ..SafetyPolicy::default()
        };
        let mut boiler = BoilerController::new(
            FixedSensor(60.0),
            MockOutput::default(),
            MockRelay::default(),
            config,
        );
        boiler.request_enable(0);
        boiler.tick(61_000);
        assert!(!boiler.status().state.is_enabled());

        // Fresh activation timestamp on re-enable
        boiler.request_enable(61_000);
        boiler.tick(100_000);
        assert!(boiler.status().state.is_enabled());
    }

    #[test]
    fn test_sensor_fault_trips_while_enabled() {
        let sensor = ScriptSensor::new(vec![Ok(60.0), Err(SensorError::OpenCircuit)]);
        let mut boiler = BoilerController::new(
            sensor,
            MockOutput::default(),
            MockRelay::default(),
            continuous_config(),
        );
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);

        boiler.tick(0);
        assert!(boiler.status().state.is_enabled());

        boiler.tick(TICK_MS);
        let status = boiler.status();
        assert!(!status.state.is_enabled());
        assert_eq!(status.trip, Some(TripReason::SensorFault));
        assert_eq!(boiler.output().duty(), 0.0);
    }

    #[test]
    fn test_stale_tick_keeps_previous_duty() {
        let mut boiler = p_only_controller(2.0, 50.0);
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);
        boiler.tick(100);
        assert_eq!(boiler.status().duty_percent, 20.0);

        // Duplicate timestamp: PID is a no-op, command is held
        boiler.tick(100);
        assert_eq!(boiler.status().duty_percent, 20.0);
        assert!(boiler.status().state.is_enabled());
    }

    #[test]
    fn test_runaway_rate_trips() {
        // 5 °C rise over 30 s (unstable), then a 0.5 °C jump in 100 ms
        let mut script = vec![Ok(20.0)];
        script.push(Ok(25.0));
        script.push(Ok(25.5));
        let mut boiler = BoilerController::new(
            ScriptSensor::new(script),
            MockOutput::default(),
            MockRelay::default(),
            continuous_config(),
        );
        boiler.set_setpoint(80.0);
        boiler.request_enable(0);

        boiler.tick(0);
        boiler.tick(30_000);
        assert!(boiler.status().state.is_enabled());

        boiler.tick(30_100);
        let status = boiler.status();
        assert!(!status.state.is_enabled());
        assert_eq!(status.trip, Some(TripReason::ThermalRunaway));
        assert_eq!(status.stability, Stability::Unstable);
    }

    #[test]
    fn test_probe_divergence_trips() {
        let mut config = continuous_config();
        config.safety.use_second_probe = true;
        config.safety.max_probe_delta_c = 5.0;
        let mut boiler = BoilerController::new(
            FixedSensor(60.0),
            MockOutput::default(),
            MockRelay::default(),
            config,
        );
        boiler.request_enable(0);
        boiler.report_aux_temperature(63.0);
        boiler.tick(0);
        assert!(boiler.status().state.is_enabled());

        boiler.report_aux_temperature(70.0);
        boiler.tick(TICK_MS);
        assert_eq!(boiler.status().trip, Some(TripReason::ProbeDivergence));
    }

    #[test]
    fn test_reenable_resets_pid_state() {
        let mut config = continuous_config();
        config.gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        };
        let mut boiler = BoilerController::new(
            FixedSensor(50.0),
            MockOutput::default(),
            MockRelay::default(),
            config,
        );
        boiler.set_setpoint(60.0);
        boiler.request_enable(0);
        boiler.tick(0);
        boiler.tick(1000);
        // 10 °C error for 1 s at Ki=1 -> duty 10
        assert!((boiler.status().duty_percent - 10.0).abs() < 1e-4);

        boiler.request_disable();
        boiler.request_enable(2000);
        boiler.tick(3000);
        // Fresh controller state: first update has no dt, integral empty
        assert_eq!(boiler.status().duty_percent, 0.0);
    }

    #[test]
    fn test_autotune_completes_and_commits() {
        // Gentle triangle, +/-0.05 °C around 30 °C. The slew stays
        // under the runaway threshold so supervision does not abort
        // the experiment.
        let mut script = Vec::new();
        for tick in 0..=120i64 {
            let phase = tick % 20;
            let k = if phase <= 10 { phase - 5 } else { 15 - phase };
            script.push(Ok(30.0 + k as f32 * 0.01));
        }
        let mut boiler = BoilerController::new(
            ScriptSensor::new(script),
            MockOutput::default(),
            MockRelay::default(),
            continuous_config(),
        );
        let before = boiler.config().gains;

        boiler.start_autotune(0);
        assert!(boiler.status().state.is_enabled());
        assert_eq!(boiler.autotune_state(), AutotuneState::Running);

        let mut now = 0;
        while boiler.autotune_state() == AutotuneState::Running {
            now += TICK_MS;
            boiler.tick(now);
        }

        assert_eq!(boiler.autotune_state(), AutotuneState::Complete);
        // Result awaits confirmation; live gains untouched so far
        assert_eq!(boiler.config().gains, before);
        let result = *boiler.last_autotune().unwrap();
        assert!((result.amplitude_c - 0.05).abs() < 1e-3);
        let ku = result.ultimate_gain;
        let pu = result.ultimate_period_s;
        assert_eq!(result.gains.kp, 0.6 * ku);
        assert_eq!(result.gains.ki, 1.2 * ku / pu);
        assert_eq!(result.gains.kd, 0.075 * ku * pu);

        let committed = boiler.commit_autotune().unwrap();
        assert_eq!(committed, result.gains);
        assert_eq!(boiler.config().gains, committed);
        // Still enabled; regulation resumes with the new gains
        assert!(boiler.status().state.is_enabled());
    }

    #[test]
    fn test_autotune_insufficient_oscillation_keeps_gains() {
        let config = AutotuneConfig {
            duration_s: 2.0,
            ..AutotuneConfig::default()
        };
        let mut boiler = BoilerController::new(
            FixedSensor(30.0),
            MockOutput::default(),
            MockRelay::default(),
            continuous_config(),
        );
        let before = boiler.config().gains;

        boiler.start_autotune_with(0, config);
        let mut now = 0;
        while boiler.autotune_state() == AutotuneState::Running {
            now += TICK_MS;
            boiler.tick(now);
        }

        assert_eq!(
            boiler.autotune_state(),
            AutotuneState::Failed(AutotuneError::InsufficientOscillation)
        );
        assert_eq!(boiler.commit_autotune(), None);
        assert_eq!(boiler.config().gains, before);
    }

    #[test]
    fn test_safety_trip_cancels_autotune() {
        // Reading collapses below the minimum bound mid-experiment
        let script = vec![Ok(30.0), Ok(30.0), Ok(10.0)];
        let mut boiler = BoilerController::new(
            ScriptSensor::new(script),
            MockOutput::default(),
            MockRelay::default(),
            continuous_config(),
        );
        boiler.start_autotune(0);
        boiler.tick(0);
        boiler.tick(TICK_MS);
        assert_eq!(boiler.autotune_state(), AutotuneState::Running);

        boiler.tick(2 * TICK_MS);
        let status = boiler.status();
        assert!(!status.state.is_enabled());
        assert_eq!(status.trip, Some(TripReason::BelowMinimum));
        assert_eq!(
            boiler.autotune_state(),
            AutotuneState::Failed(AutotuneError::Cancelled)
        );
        assert_eq!(boiler.output().duty(), 0.0);
    }

    #[test]
    fn test_setpoint_clamped_to_policy_range() {
        let mut boiler = p_only_controller(2.0, 50.0);
        boiler.set_setpoint(500.0);
        assert_eq!(boiler.setpoint(), 150.0);
        boiler.set_setpoint(1.0);
        assert_eq!(boiler.setpoint(), 20.0);
    }

    #[test]
    fn test_apply_config_rejects_invalid() {
        let mut boiler = p_only_controller(2.0, 50.0);
        let mut bad = *boiler.config();
        bad.gains.kp = f32::NAN;
        assert!(!boiler.apply_config(bad));
        assert!(boiler.config().gains.is_finite());
    }

    #[test]
    fn test_apply_config_reclamps_setpoint() {
        let mut boiler = p_only_controller(2.0, 50.0);
        boiler.set_setpoint(140.0);
        let mut config = *boiler.config();
        config.safety.max_temp_c = 100.0;
        assert!(boiler.apply_config(config));
        assert_eq!(boiler.setpoint(), 100.0);
    }

    #[test]
    fn test_set_gains_rejects_non_finite() {
        let mut boiler = p_only_controller(2.0, 50.0);
        assert!(!boiler.set_gains(PidGains {
            kp: f32::INFINITY,
            ki: 0.0,
            kd: 0.0,
        }));
        assert!(boiler.set_gains(PidGains {
            kp: 3.0,
            ki: 0.2,
            kd: 0.0,
        }));
        assert_eq!(boiler.config().gains.kp, 3.0);
    }
}
