pub mod indicator;
pub mod ranger;
