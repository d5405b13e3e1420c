//! Hardware seams. The framer only ever talks to sensors through these traits.

/// Pin-level access to the sampled inputs.
pub trait SensorBus {
    /// Configure `pin` as an input. Cannot fail on supported hardware.
    fn configure_input(&mut self, pin: u8);
    fn read_analog(&mut self, pin: u8) -> u16;
    fn read_digital(&mut self, pin: u8) -> bool;
}

/// A slow or intermittent sensor, polled without blocking.
pub trait LowRateSensor {
    fn is_ready(&mut self) -> bool;
    /// One reading. `None` if the conversion faulted.
    fn read_value(&mut self) -> Option<f32>;
}

/// Analog output such as a DAC pin.
pub trait AnalogSink {
    fn write_analog(&mut self, value: i32);
}
