//! Configuration management for the issue tracker storage engine.
//!
//! Provides [`config::EngineConfig`], the flat struct used to construct the
//! storage engine, and [`beads_dir`] for discovering a project's `.beads/`
//! metadata directory on disk.

pub mod beads_dir;
pub mod config;
