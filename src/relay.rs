use std::sync::Arc;

use log::{error, info};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::api::{RelayState, RelayStatus};
use crate::config::PinMap;
use crate::error::AppError;

pub trait DigitalOutputSink: Send + Sync {
    fn configure(&self, pin: u32) -> Result<(), AppError>;
    fn write(&self, pin: u32, value: bool) -> Result<(), AppError>;
    fn release_all(&self) -> Result<(), AppError>;
}

impl<S: DigitalOutputSink + ?Sized> DigitalOutputSink for Arc<S> {
    fn configure(&self, pin: u32) -> Result<(), AppError> {
        (**self).configure(pin)
    }

    fn write(&self, pin: u32, value: bool) -> Result<(), AppError> {
        (**self).write(pin, value)
    }

    fn release_all(&self) -> Result<(), AppError> {
        (**self).release_all()
    }
}

pub struct RelayController {
    pins: PinMap,
    sink: Box<dyn DigitalOutputSink>,
    // last value written per relay, not read back from hardware
    states: Mutex<FxHashMap<u32, bool>>,
}

impl RelayController {
    pub fn new(pins: PinMap, sink: Box<dyn DigitalOutputSink>) -> Result<Self, AppError> {
        for &pin in pins.values() {
            sink.configure(pin)?;
            sink.write(pin, false)?;
        }
        let states = pins.keys().map(|id| (*id, false)).collect();

        Ok(Self {
            pins,
            sink,
            states: Mutex::new(states),
        })
    }

    pub fn pin_map(&self) -> &PinMap {
        &self.pins
    }

    fn pin(&self, relay_id: u32) -> Result<u32, AppError> {
        self.pins.get(&relay_id).copied().ok_or_else(|| {
            error!("Invalid relay ID: {relay_id}");
            AppError::InvalidRelay(relay_id)
        })
    }

    fn switch(&self, relay_id: u32, on: bool) -> Result<(), AppError> {
        let pin = self.pin(relay_id)?;
        self.sink.write(pin, on)?;
        self.states.lock().insert(relay_id, on);
        info!("Relay {relay_id} {}", RelayState::from(on));

        Ok(())
    }

    pub fn turn_on(&self, relay_id: u32) -> Result<(), AppError> {
        self.switch(relay_id, true)
    }

    pub fn turn_off(&self, relay_id: u32) -> Result<(), AppError> {
        self.switch(relay_id, false)
    }

    // Switches relays one by one in map order. Stops at the first failure without
    // undoing the relays already switched.
    pub fn turn_all_on(&self) -> Result<(), AppError> {
        for &relay_id in self.pins.keys() {
            self.turn_on(relay_id)?;
        }
        info!("All relays ON");

        Ok(())
    }

    pub fn turn_all_off(&self) -> Result<(), AppError> {
        for &relay_id in self.pins.keys() {
            self.turn_off(relay_id)?;
        }
        info!("All relays OFF");

        Ok(())
    }

    pub fn is_on(&self, relay_id: u32) -> Result<bool, AppError> {
        self.pin(relay_id)?;
        Ok(self.states.lock().get(&relay_id).copied().unwrap_or(false))
    }

    pub fn status(&self) -> Vec<RelayStatus> {
        let states = self.states.lock();
        self.pins
            .keys()
            .map(|&id| RelayStatus {
                id,
                state: states.get(&id).copied().unwrap_or(false).into(),
            })
            .collect()
    }

    pub fn cleanup(&self) -> Result<(), AppError> {
        self.sink.release_all()?;
        info!("GPIO cleanup done");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockOutputSink;

    fn pin_map() -> PinMap {
        [(1, 31), (2, 33), (3, 35), (4, 37)].into_iter().collect()
    }

    fn controller() -> (RelayController, Arc<MockOutputSink>) {
        let sink = Arc::new(MockOutputSink::default());
        let ctrl = RelayController::new(pin_map(), Box::new(sink.clone())).unwrap();
        (ctrl, sink)
    }

    fn states(ctrl: &RelayController) -> Vec<RelayState> {
        ctrl.status().into_iter().map(|s| s.state).collect()
    }

    #[test]
    fn starts_with_every_pin_low() {
        let (ctrl, sink) = controller();
        for pin in [31, 33, 35, 37] {
            assert!(sink.is_configured(pin));
            assert_eq!(sink.level(pin), Some(false));
        }
        assert!(states(&ctrl).iter().all(|s| *s == RelayState::Off));
    }

    #[test]
    fn turn_on_off_round_trip() {
        let (ctrl, sink) = controller();
        ctrl.turn_on(1).unwrap();
        assert!(ctrl.is_on(1).unwrap());
        assert_eq!(sink.level(31), Some(true));

        ctrl.turn_off(1).unwrap();
        assert!(!ctrl.is_on(1).unwrap());
        assert_eq!(sink.level(31), Some(false));
    }

    #[test]
    fn status_reports_in_map_order() {
        let (ctrl, _) = controller();
        ctrl.turn_on(2).unwrap();
        let status = ctrl.status();
        let ids: Vec<u32> = status.iter().map(|s| s.id).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(
            states(&ctrl),
            [RelayState::Off, RelayState::On, RelayState::Off, RelayState::Off]
        );
    }

    #[test]
    fn turn_all_on_off() {
        let (ctrl, sink) = controller();
        ctrl.turn_all_on().unwrap();
        assert!(states(&ctrl).iter().all(|s| *s == RelayState::On));
        assert!([31, 33, 35, 37].iter().all(|p| sink.level(*p) == Some(true)));

        ctrl.turn_all_off().unwrap();
        assert!(states(&ctrl).iter().all(|s| *s == RelayState::Off));
    }

    #[test]
    fn unknown_relay_is_rejected() {
        let (ctrl, _) = controller();
        assert!(matches!(ctrl.turn_on(5), Err(AppError::InvalidRelay(5))));
        assert!(matches!(ctrl.turn_off(0), Err(AppError::InvalidRelay(0))));
        assert!(states(&ctrl).iter().all(|s| *s == RelayState::Off));
    }

    #[test]
    fn bulk_failure_keeps_earlier_writes() {
        let sink = Arc::new(MockOutputSink::default());
        let ctrl = RelayController::new(pin_map(), Box::new(sink.clone())).unwrap();
        sink.fail_writes_to(35);

        assert!(matches!(ctrl.turn_all_on(), Err(AppError::Gpio(_))));
        assert_eq!(
            states(&ctrl),
            [RelayState::On, RelayState::On, RelayState::Off, RelayState::Off]
        );
    }

    #[test]
    fn cleanup_releases_pins() {
        let (ctrl, sink) = controller();
        ctrl.cleanup().unwrap();
        assert!(!sink.is_configured(31));
    }
}
