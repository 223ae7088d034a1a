pub mod catalog;
pub mod commands;
pub mod database;
pub mod desk;
pub mod handler;
pub mod inactivity;
pub mod leaderboard;
pub mod panel;
pub mod tracker;

pub use commands::{
    shiftadmin, shiftconfig,
    users::{clockin, clockout, leaderboard, panel, service, status},
};
