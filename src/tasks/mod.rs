pub mod monitor;
pub mod power;
pub mod sensor;
