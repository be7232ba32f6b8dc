// Core modules implementing envelope decoding, promotion, partitioning, and error modeling.
pub mod chat;
pub mod discriminator;
pub mod envelope;
pub mod error;
pub mod event;
pub mod fragment;
pub mod partition;
pub mod user;
