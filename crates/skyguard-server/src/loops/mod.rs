//! Background loops for continuous processing.

pub mod detection_loop;
