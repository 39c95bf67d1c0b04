//! # codeplan
//!
//! Two independent flows sharing one SQLite file and one config:
//!
//! - **Interview attempts**: a clean-architecture slice ([`interview`]) with an
//!   interactor, a storage trait and a SQLite adapter.
//! - **Code indexing and task planning**: embed every source file of a
//!   project into a vector collection ([`index`]), then answer a free-text
//!   task by retrieving the closest files ([`search`]) and asking a chat model
//!   for an implementation plan ([`plan`]).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌──────────────┐
//! │ Filesystem │──▶│ Embedding │──▶│ Vector store │
//! │   walk     │   │   API     │   │ Weaviate/SQL │
//! └────────────┘   └───────────┘   └──────┬───────┘
//!                                         │ nearVector
//!                  ┌───────────┐   ┌──────▼───────┐
//!                  │ Chat API  │◀──│    Prompt    │
//!                  └─────┬─────┘   └──────────────┘
//!                        ▼
//!                 queries/query_*.md
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`interview`] | Interview-attempt use case and storage |
//! | [`models`] | Code-file data types |
//! | [`http`] | JSON POST with retry for the hosted model endpoints |
//! | [`embedding`] | Embedding client and vector utilities |
//! | [`chat`] | Chat-completion client |
//! | [`vector_store`] | Weaviate and SQLite vector collections |
//! | [`index`] | Code-base indexing pipeline |
//! | [`search`] | Nearest-neighbor code search |
//! | [`plan`] | Task-plan generation and markdown artifacts |

pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod http;
pub mod index;
pub mod interview;
pub mod migrate;
pub mod models;
pub mod plan;
pub mod search;
pub mod vector_store;
