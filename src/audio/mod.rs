//! The Audio Player Adapter: a thin contract over the decoder (spec Section
//! 4.3).

pub mod adapter;

pub use adapter::{AudioEvents, AudioPlayerAdapter, RodioAudioPlayer};
