mod builder;
mod frame;
mod grabber;
pub mod mock;
mod source;
#[cfg(test)]
mod tests;

pub use builder::ImageSourceBuilder;
pub use frame::{ImageFormat, ImageHandle, StillFrame};
pub use grabber::{snapshot_url, FrameGrabber, HttpSnapshotGrabber};
pub use mock::{MockCapture, MockFrameGrabber};
pub use source::ImageSource;
