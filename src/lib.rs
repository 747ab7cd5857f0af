// check_systemd - Nagios / Icinga monitoring plugin for systemd
// Library root

pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod options;
pub mod report;
pub mod systemd;
pub mod version;
