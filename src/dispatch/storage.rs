/// A stationary battery tracked by the energy it currently stores.
///
/// `Storage` models usable capacity, one-way efficiency, and a state of charge
/// (SoC) in kWh that persists between charge and discharge calls.
///
/// # Efficiency Convention
/// - The one-way efficiency `eta` is the square root of the round-trip efficiency.
/// - Charging with `e` kWh of input stores `e * eta`.
/// - Delivering `u` kWh to the load removes `u / eta` from the SoC.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Energy that may be cycled: nameplate capacity times usable fraction (kWh).
    usable_capacity_kwh: f64,

    /// Stored energy (kWh), always within `0..=usable_capacity_kwh`.
    soc_kwh: f64,

    /// One-way efficiency (0..=1.0).
    eta: f64,
}

impl Storage {
    /// Creates an empty battery.
    ///
    /// # Arguments
    ///
    /// * `nameplate_kwh` - Rated capacity in kWh (0 for no battery)
    /// * `usable_fraction` - Share of the nameplate that may be cycled (0..=1.0)
    /// * `round_trip_efficiency` - Energy recovered over a full cycle (0 < x <= 1.0)
    ///
    /// # Panics
    ///
    /// Panics if capacity is negative or a fraction is out of range.
    pub fn new(nameplate_kwh: f64, usable_fraction: f64, round_trip_efficiency: f64) -> Self {
        assert!(nameplate_kwh >= 0.0, "nameplate_kwh must be >= 0");
        assert!((0.0..=1.0).contains(&usable_fraction));
        assert!(round_trip_efficiency > 0.0 && round_trip_efficiency <= 1.0);

        Self {
            usable_capacity_kwh: nameplate_kwh * usable_fraction,
            soc_kwh: 0.0,
            eta: round_trip_efficiency.sqrt(),
        }
    }

    pub fn usable_capacity_kwh(&self) -> f64 {
        self.usable_capacity_kwh
    }

    pub fn soc_kwh(&self) -> f64 {
        self.soc_kwh
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Offers surplus energy to the battery.
    ///
    /// Returns the input energy actually absorbed (kWh, before losses). The
    /// stored amount is that times `eta`, limited by the remaining room.
    pub fn charge(&mut self, offered_kwh: f64) -> f64 {
        let room = (self.usable_capacity_kwh - self.soc_kwh).max(0.0);
        if offered_kwh <= 0.0 || room <= 0.0 {
            return 0.0;
        }

        let input = offered_kwh.min(room / self.eta);
        self.soc_kwh = (self.soc_kwh + input * self.eta).min(self.usable_capacity_kwh);
        input
    }

    /// Requests energy for the load.
    ///
    /// Returns the energy delivered (kWh, after losses), at most `soc * eta`.
    pub fn discharge(&mut self, requested_kwh: f64) -> f64 {
        if requested_kwh <= 0.0 || self.soc_kwh <= 0.0 {
            return 0.0;
        }

        let delivered = requested_kwh.min(self.soc_kwh * self.eta);
        self.soc_kwh = (self.soc_kwh - delivered / self.eta).max(0.0);
        delivered
    }
}
