// src/condition.rs

//! Skip-condition predicates.
//!
//! A [`Condition`] is a pure yes/no question about an [`ExecutionContext`].
//! Stages list conditions with `unless(...)` and are skipped when any of
//! them holds. Conditions are cheap to clone and compose with [`not`],
//! [`and`] and [`or`] (or `!condition`).

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::context::ExecutionContext;

type Predicate = dyn Fn(&ExecutionContext) -> bool + Send + Sync;

#[derive(Clone)]
pub struct Condition {
    description: Arc<str>,
    predicate: Arc<Predicate>,
}

impl Condition {
    /// Wrap an arbitrary predicate. `description` is only used in logs.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
    {
        Self {
            description: Arc::from(description.into()),
            predicate: Arc::new(predicate),
        }
    }

    pub fn evaluate(&self, ctx: &ExecutionContext) -> bool {
        (self.predicate)(ctx)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.description).finish()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl std::ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        not(self)
    }
}

/// True if the file or directory at `path` exists.
///
/// `path` goes through [`expand_path`] against the context's work dir. A
/// missing entry is simply `false`.
pub fn file_exists(path: impl Into<String>) -> Condition {
    let path = path.into();
    Condition::new(format!("file_exists({path})"), move |ctx| {
        ctx.expand_path(&path).exists()
    })
}

/// True if `name` resolves on the search path through the context's runner.
pub fn command_exists(name: impl Into<String>) -> Condition {
    let name = name.into();
    Condition::new(format!("command_exists({name})"), move |ctx| {
        ctx.runner.lookup(&name).is_ok()
    })
}

/// True if the environment variable `key` is set, even to an empty value.
pub fn env_set(key: impl Into<String>) -> Condition {
    let key = key.into();
    Condition::new(format!("env_set({key})"), move |_ctx| {
        std::env::var_os(&key).is_some()
    })
}

/// True if the context's OS is `platform`.
pub fn is_platform(platform: impl Into<String>) -> Condition {
    let platform = platform.into();
    Condition::new(format!("is_platform({platform})"), move |ctx| {
        ctx.env.os == platform
    })
}

pub fn is_mac() -> Condition {
    is_platform("darwin")
}

pub fn is_linux() -> Condition {
    is_platform("linux")
}

pub fn not(condition: Condition) -> Condition {
    Condition::new(format!("not({condition})"), move |ctx| {
        !condition.evaluate(ctx)
    })
}

/// True if every condition holds; stops at the first false one. Empty is true.
pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    let conditions: Vec<Condition> = conditions.into_iter().collect();
    Condition::new(format!("and({})", join(&conditions)), move |ctx| {
        conditions.iter().all(|c| c.evaluate(ctx))
    })
}

/// True if any condition holds; stops at the first true one. Empty is false.
pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    let conditions: Vec<Condition> = conditions.into_iter().collect();
    Condition::new(format!("or({})", join(&conditions)), move |ctx| {
        conditions.iter().any(|c| c.evaluate(ctx))
    })
}

fn join(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| c.description())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expand a user-supplied path.
///
/// - a leading `~` and the `$HOME` / `${HOME}` placeholder become `work_dir`
/// - other `$VAR` / `${VAR}` references come from the process environment;
///   unknown ones are left as written
/// - `.` and `..` components are resolved lexically
pub fn expand_path(path: &str, work_dir: &Path) -> PathBuf {
    let home = work_dir.to_string_lossy().into_owned();
    let tilde = shellexpand::tilde_with_context(path, || Some(home.as_str()));
    let expanded = shellexpand::env_with_context_no_errors(&*tilde, |var| match var {
        "HOME" => Some(home.clone()),
        other => std::env::var(other).ok(),
    });
    normalize(Path::new(&*expanded))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
