#![no_std]

// Decision logic for the speed-test rebooter.
//
// Everything here is free of the Rust standard library so the same state
// machine, timers, and parsers drive both the Linux daemon and the host
// emulator. Hardware access, logging, and wall-clock reads stay with the
// callers.

pub mod button;
pub mod config;
pub mod machine;
pub mod quiet;
pub mod report;
pub mod sequence;
pub mod timer;

pub use machine::Mbps;
