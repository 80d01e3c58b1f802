//! # Engine Module
//!
//! Internal ECS engine implementation.
//!
//! This module contains all core ECS building blocks such as:
//! - Entity identifiers and generators
//! - Component registration and sparse-set storage
//! - Entity stores, holders and combined views
//! - The task pool and dependency-driven system scheduling
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod entity;
pub mod component;
pub mod storage;
pub mod commands;
pub mod query;
pub mod manager;
pub mod holder;
pub mod view;
pub mod delegates;
pub mod async_stack;
pub mod thread_pool;
pub mod dependency;
pub mod systems;
pub mod scheduler;
pub mod config;
