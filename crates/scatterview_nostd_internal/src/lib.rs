#![no_std]
//! The core machinery for scattering contributions into a grid from many
//! concurrent workers, without lost updates or races.
//!
//! This crate is `no_std` (it only needs `alloc`). It deliberately knows
//! nothing about threads: launching work is the job of an [`Executor`], and
//! the executors themselves live in the `scatterview` crate. The idea is that
//! keeping the core free of `std` leaves the door open for backends that
//! don't have it (e.g. GPUs).
//!
//! # Overview
//! - [`AccumulationTarget`] is passive storage for the final values
//! - [`ScatterBuffer`] is the race-free intermediate structure. It implements
//!   one of the strategies described by [`Strategy`]
//! - [`AccessHandle`] is the per-worker proxy used to add contributions
//! - [`select_strategy`] picks a strategy for an element type & backend
//! - [`ScatterBuffer::contribute`] folds a buffer into a target

extern crate alloc;

mod access;
mod buffer;
mod element;
mod error;
mod grid;
mod parallel;
mod slot;
mod strategy;

pub use access::AccessHandle;
pub use buffer::ScatterBuffer;
pub use element::{
    AtomicCell, AtomicComplex32, AtomicF32, AtomicF64, AtomicSupport, Element, NoAtomic,
};
pub use error::ScatterError;
pub use grid::{AccumulationTarget, GridShape};
pub use parallel::{BackendProps, Executor, TeamMemberProp, ThreadMember};
pub use strategy::{Strategy, StrategyHint, select_strategy};
