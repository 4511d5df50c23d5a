// pv-core/src/units.rs

use uom::si::f64::{
    ElectricCurrent as UomElectricCurrent, ElectricPotential as UomElectricPotential,
    Power as UomPower, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Current = UomElectricCurrent;
pub type Voltage = UomElectricPotential;
pub type Power = UomPower;
pub type Time = UomTime;

#[inline]
pub fn volt(x: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(x)
}

#[inline]
pub fn amp(x: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(x)
}

#[inline]
pub fn watt(x: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(x)
}

#[inline]
pub fn sec(x: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(x)
}
