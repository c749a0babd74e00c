//! # Hope Log
//!
//! Backend for a mental-wellness journaling app: users write entries, the
//! entries are analyzed for sentiment, and a suggestion pipeline turns
//! recurring aspirations into goal, task, and habit suggestions the user
//! reviews over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │ Journal  │──▶│  Suggestion   │──▶│  SQLite   │
//! │ entries  │   │  pipeline     │   │  store    │
//! └──────────┘   │ LLM + dedup  │   └────┬─────┘
//!                └──────────────┘        │
//!                      ┌─────────────────┤
//!                      ▼                 ▼
//!                 ┌──────────┐     ┌──────────┐
//!                 │   CLI    │     │   HTTP   │
//!                 │(hopelog) │     │  (API)   │
//!                 └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hopelog init                          # create database
//! hopelog user add sam sam@example.com  # register a user
//! hopelog journal add <user-id> "slept badly, want to fix my sleep"
//! hopelog process all                   # run the suggestion batch
//! hopelog serve api                     # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Persistence trait, SQLite and in-memory backends |
//! | [`journal`] | Entry creation with inline sentiment analysis |
//! | [`sentiment`] | Sentiment scoring and goal/task extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`retrieval`] | Tiered similar-entry retrieval |
//! | [`llm`] | Chat-completion provider abstraction |
//! | [`suggest`] | Suggestion generation prompts and parsing |
//! | [`reconcile`] | Dedup, persistence, and the analyzed-flag lifecycle |
//! | [`server`] | HTTP API for the review surface |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embedding;
pub mod journal;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod reconcile;
pub mod retrieval;
pub mod sentiment;
pub mod server;
pub mod store;
pub mod suggest;
