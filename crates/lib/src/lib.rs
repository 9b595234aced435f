//! builder-lib: compile payloads from source inside disposable containers
//!
//! The crate is organised around the build pipeline:
//! - `environment`: per-language build environments loaded from YAML
//! - `provision`: making each environment's image available locally
//! - `context`: per-language staging directories and their locks
//! - `template`: expanding build command templates
//! - `runtime`: the container engine seam and its `docker` CLI driver
//! - `diagnostics`: logging what the toolchain left behind
//! - `publish`: moving artifacts into the payload store
//! - `engine`: `Builder`, which ties the steps together per target

pub mod artifact;
pub mod consts;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod environment;
pub mod platform;
pub mod provision;
pub mod publish;
pub mod runtime;
pub mod target;
pub mod template;
pub mod util;
