pub mod frame;

pub use self::frame::Frame;
