//! Configuration loading and resolution.
//!
//! `load` layers the default config files, any `--config` files and `COTS__*`
//! environment variables, applies CLI overrides and returns a validated
//! [`ResolvedConfig`].

mod loader;
mod raw;
mod resolved;
mod sources;
mod util;

pub(crate) use loader::load;
pub(crate) use resolved::ResolvedConfig;
