pub mod camera;
pub mod decode;
pub mod frame;
pub mod testing;
pub mod worker;

pub use camera::{ColorCamera, V4l2ColorCamera};
pub use frame::{Frame, PixelFormat};
pub use worker::{CaptureWorker, WorkerEvent};
