//! HTTP front end for the churn prediction service

pub mod api;
pub mod config;
