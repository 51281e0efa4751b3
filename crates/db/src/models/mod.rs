pub mod agent;
pub mod call;
pub mod clinic;
pub mod company;
