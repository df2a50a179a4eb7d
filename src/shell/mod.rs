//! Shell UI Module
//!
//! Desktop chrome drawn by the manager itself. For now that is the status
//! bar on each monitor.

pub mod bar;
