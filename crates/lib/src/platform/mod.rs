pub mod paths;

/// The `uid:gid` of the invoking host user, applied to build containers so
/// files they write into the bind mount are not owned by root.
#[cfg(unix)]
pub fn host_user() -> Option<String> {
  use rustix::process::{getegid, geteuid};

  Some(format!("{}:{}", geteuid().as_raw(), getegid().as_raw()))
}

#[cfg(not(unix))]
pub fn host_user() -> Option<String> {
  None
}
