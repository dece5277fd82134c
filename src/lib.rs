pub mod cli;
pub mod error;
pub mod k8s;
pub mod logging;
pub mod pages;
