//! Test suites for the hostwatch daemon.

pub(crate) mod support;
