pub mod prediction;
pub mod subscription;

pub use prediction::PredictionRepository;
pub use subscription::SubscriptionRepository;
