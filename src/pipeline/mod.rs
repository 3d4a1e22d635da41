pub mod gain;
pub mod relay;

pub use gain::GainControl;
pub use relay::FrameRelay;
