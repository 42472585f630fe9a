// TastySnake pairing library
// Radio adapters, the connection controller and a console front end

pub mod config;
pub mod debug;
pub mod pairing;
pub mod radio;
pub mod screen;
