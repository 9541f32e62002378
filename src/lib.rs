//! Whitelist-driven phishing detection for SMS messages.
//!
//! The decision core is [`engine::DecisionEngine`]: key words come out of a
//! message through a [`extractor::KeyWordExtractor`], get fuzzy-matched
//! against a [`whitelist::Whitelist`] by a [`matcher::Matcher`], and the
//! message URL's registrable domain decides between legitimate and phishing.

pub mod batch;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod metrics;
pub mod models;
pub mod similarity;
pub mod training;
pub mod whitelist;
