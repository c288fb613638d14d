pub mod client;

pub use client::{AnkiConnectClient, AnkiConnectConfig, escape_search};
