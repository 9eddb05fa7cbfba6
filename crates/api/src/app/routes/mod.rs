pub mod gateway;
pub mod orders;
pub mod products;
pub mod system;
