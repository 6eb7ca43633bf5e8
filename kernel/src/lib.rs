// Photolog Kernel
//
// Durable image history: the record model, storage backends, the
// Unsplash adapter and the HTTP surface that serves them.

pub mod adapters;
pub mod config;
pub mod http;
pub mod log;
