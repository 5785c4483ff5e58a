//! Mapping lastlog slot indexes (UIDs) to user names.
//!
//! A miss is a normal outcome and is reported as `None`.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

pub trait IdentityResolver {
    fn resolve(&self, index: u64) -> Option<String>;
}

impl<F> IdentityResolver for F
where
    F: Fn(u64) -> Option<String>,
{
    fn resolve(&self, index: u64) -> Option<String> {
        self(index)
    }
}

/// Resolves against the user database of the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl IdentityResolver for SystemResolver {
    #[cfg(unix)]
    fn resolve(&self, index: u64) -> Option<String> {
        use nix::unistd::{Uid, User};

        let uid = u32::try_from(index).ok()?;
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                log::debug!("user lookup for uid {} failed: {}", uid, e);
                None
            }
        }
    }

    #[cfg(not(unix))]
    fn resolve(&self, _index: u64) -> Option<String> {
        None
    }
}

/// Resolves against a passwd-format file, typically copied from the host the
/// lastlog came from.
#[derive(Debug, Default, Clone)]
pub struct PasswdResolver {
    names: HashMap<u64, String>,
}

impl PasswdResolver {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Ok(Self::from_contents(&contents))
    }

    pub fn from_contents(contents: &str) -> Self {
        let mut names = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_passwd_line(line) {
                Some((uid, name)) => {
                    names.entry(uid).or_insert(name);
                }
                None => log::debug!("skipping malformed passwd line: {}", line),
            }
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl IdentityResolver for PasswdResolver {
    fn resolve(&self, index: u64) -> Option<String> {
        self.names.get(&index).cloned()
    }
}

/// `name:password:uid:...`; only the first three fields matter.
fn parse_passwd_line(line: &str) -> Option<(u64, String)> {
    let mut parts = line.split(':');
    let name = parts.next()?.trim();
    let _password = parts.next()?;
    let uid = parts.next()?.trim().parse::<u64>().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((uid, name.to_string()))
}
