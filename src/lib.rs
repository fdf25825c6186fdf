//! Yatube: a server-rendered blogging platform with groups, comments and
//! author follows.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
