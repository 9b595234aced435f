//! Fixed names shared across the build pipeline.

pub const APP_NAME: &str = "builder";

/// Base filename the source is staged under, before any extension.
pub const BUILD_FILE: &str = "code";

/// Diagnostics file the toolchain leaves in the staging directory.
pub const DIAGNOSTICS_FILE: &str = "errors.log";

/// Extension marking a raw shellcode artifact.
pub const RAW_SHELLCODE_EXT: &str = ".donut";

/// Extension appended to raw shellcode artifacts when published.
pub const EXEC_WRAPPER_EXT: &str = ".exe";

/// Environment variable overriding the builder root directory.
pub const ROOT_ENV: &str = "BUILDER_ROOT";
