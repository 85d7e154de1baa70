#![doc = "sword-deposit-core: deposit workflow library for sword-deposit."]

//! This crate contains the SWORD v2 deposit workflow and its data model, with
//! no network or terminal code: the protocol transport and the interactive
//! prompts are traits (see [`contract`]) implemented by the CLI crate and by
//! mocks in tests.
//!
//! # Usage
//! Load a [`config::ServerConfig`], build a [`deposit::DepositPlan`] and hand
//! both to [`deposit::run_deposit`] together with a transport and a prompter.

pub mod config;
pub mod contract;
pub mod deposit;
pub mod error;
pub mod report;

pub use error::{Result, SwordError};
