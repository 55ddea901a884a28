pub mod access;
pub mod classifier;
pub mod football_data;
pub mod init;
pub mod payment;
pub mod prediction;
pub mod training;
