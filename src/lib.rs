//! ketto library: infers branch genealogy from git history and draws it

pub mod action;
pub mod app;
pub mod augmented;
pub mod config;
pub mod error;
pub mod git;
pub mod graph;
pub mod keybindings;
pub mod print;
pub mod search;
pub mod service;
pub mod tui;
pub mod ui;
pub mod view;
