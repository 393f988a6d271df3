mod keyboard;
mod sensor;

pub use keyboard::KeyboardInputHandler;
pub use sensor::MotionSensorHandler;
