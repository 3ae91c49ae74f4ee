//! Masjid Board - digital announcement board for a mosque
//!
//! Serves today's prayer schedule, resolved from external providers with a
//! manual override and hardcoded fallback, alongside an announcement feed
//! managed by admins over a JSON API.

pub mod announcements;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod providers;
pub mod resolver;
pub mod routes;
pub mod schedule;
